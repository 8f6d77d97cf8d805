// Fri Jan 17 2026 - Alex

use super::message::{new_id, Message, MessageKind};
use super::ProtocolError;
use crate::config::Config;
use ahash::AHashMap;
use parking_lot::{Condvar, Mutex, RwLock};
use serde_json::Value;
use std::time::{Duration, Instant};

pub type Handler = Box<dyn Fn(&Message) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub action: String,
    pub data: Value,
}

/// What `dispatch` did with an incoming message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dispatch {
    pub resolved: bool,
    pub handlers: usize,
}

struct Pending {
    expected: usize,
    deadline: Instant,
    responses: Vec<Response>,
}

impl Pending {
    fn is_complete(&self) -> bool {
        self.responses.len() >= self.expected
    }
}

/// Matches client replies to outstanding host requests by id and fans
/// unsolicited client messages out to per-action handlers. Owns no transport:
/// the caller sends what `request` returns and feeds received messages to
/// `dispatch`.
pub struct Correlator {
    timeout: Duration,
    pending: Mutex<AHashMap<String, Pending>>,
    arrived: Condvar,
    handlers: RwLock<AHashMap<String, Vec<Handler>>>,
}

impl Correlator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            pending: Mutex::new(AHashMap::new()),
            arrived: Condvar::new(),
            handlers: RwLock::new(AHashMap::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.request_timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn on<F>(&self, action: impl Into<String>, handler: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.handlers.write().entry(action.into()).or_default().push(Box::new(handler));
    }

    /// Builds a server message and waits for `expected` replies to it, one
    /// per connected client.
    pub fn request(&self, action: impl Into<String>, data: Value, expected: usize) -> Message {
        let message = Message::with_id(MessageKind::Server, new_id(), action, data);
        self.register(&message.id, expected);
        message
    }

    pub fn register(&self, id: &str, expected: usize) {
        let pending = Pending {
            expected: expected.max(1),
            deadline: Instant::now() + self.timeout,
            responses: Vec::new(),
        };
        if self.pending.lock().insert(id.to_string(), pending).is_some() {
            log::warn!("request id {} registered twice", id);
        }
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.lock().contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Routes a received message. Server-side echoes are ignored.
    pub fn dispatch(&self, message: &Message) -> Dispatch {
        let mut outcome = Dispatch::default();
        if message.kind != MessageKind::Client {
            log::trace!("ignoring {} message {}", message.action, message.id);
            return outcome;
        }

        {
            let mut pending = self.pending.lock();
            if let Some(entry) = pending.get_mut(&message.id) {
                entry.responses.push(Response {
                    action: message.action.clone(),
                    data: message.data.clone(),
                });
                outcome.resolved = true;
            }
        }
        if outcome.resolved {
            self.arrived.notify_all();
        }

        if let Some(handlers) = self.handlers.read().get(&message.action) {
            for handler in handlers {
                handler(message);
            }
            outcome.handlers = handlers.len();
        }

        if !outcome.resolved && outcome.handlers == 0 {
            log::debug!("unhandled client action {}", message.action);
        }
        outcome
    }

    /// Blocks until every expected reply arrived or the request deadline
    /// passes. The request is forgotten either way.
    pub fn wait(&self, id: &str) -> Result<Vec<Response>, ProtocolError> {
        let mut pending = self.pending.lock();
        loop {
            let entry = pending
                .get(id)
                .ok_or_else(|| ProtocolError::UnknownRequest(id.to_string()))?;
            if entry.is_complete() {
                break;
            }
            let deadline = entry.deadline;
            if Instant::now() >= deadline || self.arrived.wait_until(&mut pending, deadline).timed_out() {
                let still_waiting = pending.get(id).map(|entry| !entry.is_complete()).unwrap_or(false);
                if still_waiting {
                    let (received, expected) = pending
                        .remove(id)
                        .map(|entry| (entry.responses.len(), entry.expected))
                        .unwrap_or((0, 0));
                    return Err(ProtocolError::Timeout {
                        id: id.to_string(),
                        received,
                        expected,
                    });
                }
            }
        }
        pending
            .remove(id)
            .map(|entry| entry.responses)
            .ok_or_else(|| ProtocolError::UnknownRequest(id.to_string()))
    }

    /// Non-blocking: the replies if complete, `None` while still waiting.
    pub fn take(&self, id: &str) -> Option<Vec<Response>> {
        let mut pending = self.pending.lock();
        if pending.get(id)?.is_complete() {
            pending.remove(id).map(|entry| entry.responses)
        } else {
            None
        }
    }

    /// Drops requests whose deadline has passed and returns their ids.
    pub fn expire(&self, now: Instant) -> Vec<String> {
        let mut pending = self.pending.lock();
        let expired: Vec<String> = pending
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            pending.remove(id);
        }
        if !expired.is_empty() {
            log::debug!("expired {} outstanding requests", expired.len());
        }
        expired
    }

    pub fn clear(&self) {
        self.pending.lock().clear();
        self.arrived.notify_all();
    }
}
