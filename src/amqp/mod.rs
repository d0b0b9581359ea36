//! Wire adapters: thin publishers for `result`, `log`, `hb` and a consumer
//! for `cmd`. `ExchangeClient` and `CommandSource` are the only
//! two traits the dispatch pipeline and heartbeat emitter depend on, so
//! both can run against `fake` (tests) or `lapin_client` (production)
//! without caring which.

#[cfg(any(test, feature = "test-util"))]
pub mod fake;
pub mod lapin_client;

use crate::error::AmqpError;
use async_trait::async_trait;

/// `publish(routing_key, body) -> ()`. All publishers use
/// persistent delivery mode against a configurable topic exchange.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<(), AmqpError>;
}

/// One inbound command delivery, plus the means to acknowledge it. Acking
/// happens on pipeline return, not on simulator completion — long-running
/// tasks must not hold the ack open.
pub struct Delivery {
    pub body: Vec<u8>,
    handle: DeliveryHandle,
}

enum DeliveryHandle {
    Lapin(lapin::message::Delivery),
    #[cfg(any(test, feature = "test-util"))]
    Fake { exchange: std::sync::Arc<fake::FakeExchange>, id: u64 },
}

impl Delivery {
    pub(crate) fn from_lapin(delivery: lapin::message::Delivery) -> Self {
        Self { body: delivery.data.clone(), handle: DeliveryHandle::Lapin(delivery) }
    }

    #[cfg(any(test, feature = "test-util"))]
    pub(crate) fn from_fake(body: Vec<u8>, exchange: std::sync::Arc<fake::FakeExchange>, id: u64) -> Self {
        Self { body, handle: DeliveryHandle::Fake { exchange, id } }
    }

    pub async fn ack(self) -> Result<(), AmqpError> {
        match self.handle {
            DeliveryHandle::Lapin(delivery) => delivery
                .ack(lapin::options::BasicAckOptions::default())
                .await
                .map_err(|e| AmqpError::Consume(e.to_string())),
            #[cfg(any(test, feature = "test-util"))]
            DeliveryHandle::Fake { exchange, id } => {
                exchange.ack(id);
                Ok(())
            }
        }
    }
}

/// `consume(queue) -> Message stream`, narrowed to the one
/// operation the pipeline actually calls: pull the next delivery.
#[async_trait]
pub trait CommandSource: Send {
    async fn next(&mut self) -> Option<Delivery>;
}
