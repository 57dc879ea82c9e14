//! Test support utilities
//!
//! Mock transports and deployment collaborators for exercising the messaging
//! core and the deployment manager without a broker or external runtimes.

pub mod mocks;
