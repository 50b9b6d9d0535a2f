//! Control-queue consume loop.
//!
//! ```text
//! loop:
//!   connect ── err ──────────────────────────────┐
//!     │                                          │
//!     ▼                                          ▼
//!   next delivery ──► Dispatcher::process     backoff sleep
//!     │                 │                        ▲
//!     │                 ▼                        │
//!     │              ack | sleep + nack(requeue) │
//!     │                                          │
//!     ├── consumer error / cancelled ─► close ───┘
//!     └── shutdown ─► close ─► return
//! ```
//!
//! The broker client sits behind [`Connector`], [`Session`] and [`Acker`];
//! `amqp` provides the RabbitMQ implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use solver_core::ControllerConfig;

use crate::backoff::Backoff;
use crate::dispatcher::{Disposition, Dispatcher};
use crate::error::BrokerError;
use crate::publisher::Publisher;
use crate::stats::DispatchStats;

/// Settles one inbound delivery with the broker.
#[async_trait]
pub trait Acker: Send + Sync {
    async fn ack(&self) -> Result<(), BrokerError>;

    /// Hand the message back to the queue for redelivery.
    async fn requeue(&self) -> Result<(), BrokerError>;
}

/// A message taken off the control queue.
pub struct Inbound {
    pub body: Vec<u8>,
    pub acker: Box<dyn Acker>,
}

/// An open broker session: a consumer on the control queue and a
/// publisher for worker queues.
#[async_trait]
pub trait Session: Send {
    /// The next delivery; `None` once the broker cancelled the consumer.
    async fn next(&mut self) -> Option<Result<Inbound, BrokerError>>;

    fn publisher(&self) -> Arc<dyn Publisher>;

    /// Best-effort close; errors are logged, not returned.
    async fn close(&mut self);
}

/// Opens sessions against the broker.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Session>, BrokerError>;
}

/// How a session ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    ConsumerCancelled,
}

/// Feeds control messages to a [`Dispatcher`] one at a time, reconnecting
/// with backoff whenever the session is lost.
pub struct ControlConsumer {
    connector: Arc<dyn Connector>,
    requeue_delay: Duration,
    backoff: Backoff,
    stats: Arc<DispatchStats>,
}

impl ControlConsumer {
    pub fn new(
        connector: Arc<dyn Connector>,
        config: &ControllerConfig,
        stats: Arc<DispatchStats>,
    ) -> Self {
        Self {
            connector,
            requeue_delay: config.requeue_delay,
            backoff: Backoff::default(),
            stats,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run until `shutdown` flips to `true`.
    ///
    /// Shutdown is only observed between messages, so an in-flight message
    /// always gets its ack or nack before the session is closed.
    pub async fn run(&self, dispatcher: &Dispatcher, mut shutdown: watch::Receiver<bool>) {
        let mut backoff = self.backoff.clone();

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.session(dispatcher, &mut shutdown, &mut backoff).await {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::ConsumerCancelled) => {
                    warn!("consumer cancelled by broker");
                }
                Err(e) => {
                    error!(error = %e, "broker session failed");
                }
            }

            self.stats.set_connected(false);
            self.stats.record_reconnect();

            let delay = backoff.next_delay();
            info!(delay_ms = delay.as_millis() as u64, "reconnecting to broker");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        self.stats.set_connected(false);
        info!("consume loop stopped");
    }

    async fn session(
        &self,
        dispatcher: &Dispatcher,
        shutdown: &mut watch::Receiver<bool>,
        backoff: &mut Backoff,
    ) -> Result<SessionEnd, BrokerError> {
        let mut session = self.connector.connect().await?;

        self.stats.set_connected(true);
        backoff.reset();

        let end = self.consume(dispatcher, session.as_mut(), shutdown).await;
        debug!(?end, "closing broker session");
        session.close().await;
        end
    }

    async fn consume(
        &self,
        dispatcher: &Dispatcher,
        session: &mut dyn Session,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<SessionEnd, BrokerError> {
        let publisher = session.publisher();

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.changed() => return Ok(SessionEnd::Shutdown),
                next = session.next() => next,
            };

            match next {
                Some(Ok(inbound)) => self.handle(dispatcher, publisher.as_ref(), inbound).await?,
                Some(Err(e)) => return Err(e),
                None => return Ok(SessionEnd::ConsumerCancelled),
            }
        }
    }

    async fn handle(
        &self,
        dispatcher: &Dispatcher,
        publisher: &dyn Publisher,
        inbound: Inbound,
    ) -> Result<(), BrokerError> {
        let outcome = dispatcher.process(&inbound.body, publisher).await;

        match outcome.disposition() {
            Disposition::Ack => inbound.acker.ack().await,
            Disposition::Requeue => {
                tokio::time::sleep(self.requeue_delay).await;
                inbound.acker.requeue().await
            }
        }
    }
}
