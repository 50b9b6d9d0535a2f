//! The outbound publish seam.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::BrokerError;

/// Publishes work items to worker queues.
///
/// Implementations declare `queue` durable before publishing (declaring an
/// existing queue is a no-op) and return only once the broker has taken
/// responsibility for the message.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError>;
}

/// A message captured by [`RecordingPublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub queue: String,
    pub body: Vec<u8>,
}

impl PublishedMessage {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Default)]
struct Recorded {
    messages: Vec<PublishedMessage>,
    fail_next: bool,
}

/// Publisher that keeps messages in memory. Clones share state.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next publish fail.
    pub fn fail_next(&self) {
        self.lock().fail_next = true;
    }

    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.lock().messages.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError> {
        let mut inner = self.lock();
        if std::mem::take(&mut inner.fail_next) {
            return Err(BrokerError::Unavailable("channel closed".to_string()));
        }
        inner.messages.push(PublishedMessage {
            queue: queue.to_string(),
            body: payload.to_vec(),
        });
        Ok(())
    }
}
