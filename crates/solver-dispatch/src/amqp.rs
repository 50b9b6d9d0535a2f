//! RabbitMQ transport over `lapin`.
//!
//! One connection per session, two channels: a consumer channel with
//! prefetch 1 on the control queue, and a confirm-mode channel for
//! publishing work items. Losing the connection ends the session; the
//! consume loop reconnects with backoff until shutdown.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::acker::Acker as DeliveryAcker;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions,
    ConfirmSelectOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer};
use tracing::{debug, info};

use solver_core::{ConfigError, ControllerConfig};

use crate::consumer::{Acker, Connector, Inbound, Session};
use crate::error::BrokerError;
use crate::publisher::Publisher;

const CONSUMER_TAG: &str = "solver-controller";
const PERSISTENT: u8 = 2;
const REPLY_SUCCESS: u16 = 200;

/// Opens RabbitMQ sessions consuming the control queue.
pub struct AmqpConnector {
    uri: String,
    control_queue: String,
}

impl AmqpConnector {
    pub fn new(config: &ControllerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            uri: config.broker.amqp_uri()?,
            control_queue: config.control_queue.clone(),
        })
    }
}

#[async_trait]
impl Connector for AmqpConnector {
    async fn connect(&self) -> Result<Box<dyn Session>, BrokerError> {
        let connection = Connection::connect(&self.uri, ConnectionProperties::default()).await?;

        let consume_channel = connection.create_channel().await?;
        consume_channel
            .basic_qos(1, BasicQosOptions::default())
            .await?;
        declare_durable(&consume_channel, &self.control_queue).await?;
        let consumer = consume_channel
            .basic_consume(
                &self.control_queue,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        let publish_channel = connection.create_channel().await?;
        publish_channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;

        info!(queue = %self.control_queue, "consuming control queue");
        Ok(Box::new(AmqpSession {
            publisher: Arc::new(AmqpPublisher::new(publish_channel.clone())),
            connection,
            consume_channel,
            publish_channel,
            consumer,
        }))
    }
}

struct AmqpSession {
    connection: Connection,
    consume_channel: Channel,
    publish_channel: Channel,
    consumer: Consumer,
    publisher: Arc<AmqpPublisher>,
}

#[async_trait]
impl Session for AmqpSession {
    async fn next(&mut self) -> Option<Result<Inbound, BrokerError>> {
        let delivery = self.consumer.next().await?;
        Some(
            delivery
                .map(|delivery| Inbound {
                    body: delivery.data,
                    acker: Box::new(AmqpAcker(delivery.acker)),
                })
                .map_err(BrokerError::from),
        )
    }

    fn publisher(&self) -> Arc<dyn Publisher> {
        self.publisher.clone()
    }

    async fn close(&mut self) {
        // Any of these fail once the connection is already gone.
        if let Err(e) = self.consume_channel.close(REPLY_SUCCESS, "bye").await {
            debug!(error = %e, "consume channel close");
        }
        if let Err(e) = self.publish_channel.close(REPLY_SUCCESS, "bye").await {
            debug!(error = %e, "publish channel close");
        }
        if let Err(e) = self.connection.close(REPLY_SUCCESS, "bye").await {
            debug!(error = %e, "connection close");
        }
    }
}

struct AmqpAcker(DeliveryAcker);

#[async_trait]
impl Acker for AmqpAcker {
    async fn ack(&self) -> Result<(), BrokerError> {
        self.0.ack(BasicAckOptions::default()).await?;
        Ok(())
    }

    async fn requeue(&self) -> Result<(), BrokerError> {
        self.0
            .nack(BasicNackOptions {
                multiple: false,
                requeue: true,
            })
            .await?;
        Ok(())
    }
}

/// Publishes persistent JSON work items on a confirm-mode channel.
#[derive(Clone)]
pub struct AmqpPublisher {
    channel: Channel,
}

impl AmqpPublisher {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl Publisher for AmqpPublisher {
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError> {
        declare_durable(&self.channel, queue).await?;

        let properties = BasicProperties::default()
            .with_delivery_mode(PERSISTENT)
            .with_content_type("application/json".into());
        let confirmation = self
            .channel
            .basic_publish("", queue, BasicPublishOptions::default(), payload, properties)
            .await?
            .await?;

        if confirmation.is_nack() {
            return Err(BrokerError::NotConfirmed {
                queue: queue.to_string(),
            });
        }
        debug!(%queue, bytes = payload.len(), "work item published");
        Ok(())
    }
}

async fn declare_durable(channel: &Channel, queue: &str) -> Result<(), BrokerError> {
    channel
        .queue_declare(
            queue,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    Ok(())
}
