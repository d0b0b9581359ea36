//! Real AMQP transport via `lapin`: a durable topic exchange, a durable
//! queue bound to `{robot_id}.cmd` with a configured prefetch, and
//! persistent-delivery-mode publishers for `result`, `log`, `hb`.

use super::{CommandSource, Delivery, ExchangeClient};
use crate::config::BrokerConfig;
use crate::error::AmqpError;
use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, BasicQosOptions, ExchangeDeclareOptions, QueueBindOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use std::time::Duration;

pub struct LapinExchangeClient {
    channel: Channel,
    exchange: String,
}

impl LapinExchangeClient {
    pub fn new(channel: Channel, exchange: String) -> Self {
        Self { channel, exchange }
    }
}

#[async_trait]
impl ExchangeClient for LapinExchangeClient {
    async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<(), AmqpError> {
        self.channel
            .basic_publish(
                &self.exchange,
                routing_key,
                BasicPublishOptions::default(),
                body,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await
            .map_err(|e| AmqpError::Publish { routing_key: routing_key.to_string(), source: Box::new(e) })?
            .await
            .map_err(|e| AmqpError::Publish { routing_key: routing_key.to_string(), source: Box::new(e) })?;
        Ok(())
    }
}

pub struct LapinCommandSource {
    consumer: lapin::Consumer,
}

#[async_trait]
impl CommandSource for LapinCommandSource {
    async fn next(&mut self) -> Option<Delivery> {
        loop {
            match self.consumer.next().await {
                Some(Ok(delivery)) => return Some(Delivery::from_lapin(delivery)),
                Some(Err(e)) => {
                    tracing::error!(error = %e, "consumer stream error");
                    return None;
                }
                None => return None,
            }
        }
    }
}

/// Connect to the broker, declare the topic exchange, and declare/bind a
/// durable queue for `{robot_id}.cmd` with the configured prefetch.
pub async fn connect(
    broker: &BrokerConfig,
    robot_id: &str,
) -> Result<(LapinExchangeClient, LapinCommandSource), AmqpError> {
    let uri = broker.amqp_uri();
    let options = ConnectionProperties::default()
        .with_executor(tokio_executor_trait::Tokio::current())
        .with_reactor(tokio_reactor_trait::Tokio);

    let connection = tokio::time::timeout(Duration::from_secs(broker.connection_timeout_secs), Connection::connect(&uri, options))
        .await
        .map_err(|_| AmqpError::Connect("connection attempt timed out".to_string()))?
        .map_err(|e| AmqpError::Connect(e.to_string()))?;

    let publish_channel = connection.create_channel().await.map_err(|e| AmqpError::Connect(e.to_string()))?;
    let consume_channel = connection.create_channel().await.map_err(|e| AmqpError::Connect(e.to_string()))?;

    publish_channel
        .exchange_declare(
            &broker.exchange,
            ExchangeKind::Topic,
            ExchangeDeclareOptions { durable: true, ..Default::default() },
            FieldTable::default(),
        )
        .await
        .map_err(|e| AmqpError::Topology(e.to_string()))?;

    let queue_name = format!("{robot_id}.cmd.queue");
    let routing_key = format!("{robot_id}.cmd");

    consume_channel
        .queue_declare(
            &queue_name,
            QueueDeclareOptions { durable: true, ..Default::default() },
            FieldTable::default(),
        )
        .await
        .map_err(|e| AmqpError::Topology(e.to_string()))?;

    consume_channel
        .queue_bind(&queue_name, &broker.exchange, &routing_key, QueueBindOptions::default(), FieldTable::default())
        .await
        .map_err(|e| AmqpError::Topology(e.to_string()))?;

    consume_channel
        .basic_qos(broker.prefetch, BasicQosOptions::default())
        .await
        .map_err(|e| AmqpError::Topology(e.to_string()))?;

    let consumer = consume_channel
        .basic_consume(&queue_name, "robot-mock-worker", BasicConsumeOptions::default(), FieldTable::default())
        .await
        .map_err(|e| AmqpError::Consume(e.to_string()))?;

    Ok((
        LapinExchangeClient::new(publish_channel, broker.exchange.clone()),
        LapinCommandSource { consumer },
    ))
}
