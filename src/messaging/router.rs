//! Topic-based dispatch of inbound messages
//!
//! Maps exact topic strings to registered handlers. Unmatched messages on the
//! well-known edge topics fall through to built-in logged handlers; anything
//! else only produces a log entry. Handler panics are contained at the
//! dispatch boundary so the connection loop never dies from a handler.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// Handler invoked with the UTF-8 decoded payload of an inbound message
pub type MessageHandler = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct RouterInner {
    handlers: HashMap<String, MessageHandler>,
    dispatch_counts: HashMap<String, u64>,
}

/// Thread-safe registry of per-topic message handlers
///
/// Registration and dispatch may happen concurrently: caller threads add and
/// remove handlers while the background loop dispatches. The registry lock is
/// released before a handler runs.
#[derive(Default)]
pub struct TopicRouter {
    inner: Mutex<RouterInner>,
}

impl TopicRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under the exact topic string. Replaces any prior
    /// handler for the topic (last-write-wins).
    pub fn register<F>(&self, topic: &str, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        if let Ok(mut inner) = self.inner.lock() {
            if inner
                .handlers
                .insert(topic.to_string(), Arc::new(handler))
                .is_some()
            {
                info!("Replaced existing handler for topic: {}", topic);
            } else {
                info!("Registered handler for topic: {}", topic);
            }
        }
    }

    /// Remove the handler for a topic. No-op if none is registered.
    pub fn unregister(&self, topic: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            if inner.handlers.remove(topic).is_some() {
                info!("Unregistered handler for topic: {}", topic);
            }
        }
    }

    /// True iff a handler is registered for the exact topic
    pub fn has_handler(&self, topic: &str) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.handlers.contains_key(topic))
            .unwrap_or(false)
    }

    /// Number of messages dispatched for a topic so far
    pub fn dispatch_count(&self, topic: &str) -> u64 {
        self.inner
            .lock()
            .map(|inner| inner.dispatch_counts.get(topic).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Dispatch an inbound message to the handler registered for its topic,
    /// or to the built-in default behavior when none matches.
    pub fn dispatch(&self, topic: &str, payload: &[u8]) {
        let decoded = match std::str::from_utf8(payload) {
            Ok(s) => s,
            Err(e) => {
                error!("Dropping message on {}: payload is not UTF-8: {}", topic, e);
                return;
            }
        };

        let handler = match self.inner.lock() {
            Ok(mut inner) => {
                *inner.dispatch_counts.entry(topic.to_string()).or_insert(0) += 1;
                inner.handlers.get(topic).cloned()
            }
            Err(e) => {
                error!("Router state unavailable, dropping message on {}: {}", topic, e);
                return;
            }
        };

        match handler {
            Some(handler) => {
                debug!("Dispatching message on {} to registered handler", topic);
                if catch_unwind(AssertUnwindSafe(|| handler(decoded))).is_err() {
                    error!("Handler for topic {} panicked; message dropped", topic);
                }
            }
            None => Self::dispatch_default(topic, decoded),
        }
    }

    /// Built-in behavior for the well-known edge topics
    fn dispatch_default(topic: &str, payload: &str) {
        match topic {
            "edge/commands" => {
                info!("Received command (no handler registered): {}", payload);
            }
            "edge/deployments" => {
                info!("Received deployment event (no handler registered): {}", payload);
            }
            "edge/status" => {
                info!("Received status update (no handler registered): {}", payload);
            }
            _ => {
                warn!("No handler registered for topic: {}", topic);
            }
        }
    }
}
