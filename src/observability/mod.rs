//! Observability: structured logging for the edge coordinator

pub mod logging;

pub use logging::{init_default_logging, init_logging, LogFormat};
