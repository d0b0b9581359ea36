//! In-memory exchange used by tests (and nothing else — the production
//! binary always uses `amqp::lapin_client`). Captures every publish so
//! integration tests can assert on what was sent to `result`/`log`/`hb`
//! without a live broker or network dependency.

use super::{CommandSource, Delivery, ExchangeClient};
use crate::error::AmqpError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// One captured publish.
#[derive(Debug, Clone)]
pub struct Published {
    pub routing_key: String,
    pub body: Vec<u8>,
}

pub struct FakeExchange {
    published: Mutex<Vec<Published>>,
    acked: Mutex<std::collections::HashSet<u64>>,
}

impl FakeExchange {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self { published: Mutex::new(Vec::new()), acked: Mutex::new(std::collections::HashSet::new()) })
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn published_on(&self, routing_key: &str) -> Vec<Published> {
        self.published().into_iter().filter(|p| p.routing_key == routing_key).collect()
    }

    pub fn clear(&self) {
        self.published.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub(crate) fn ack(&self, id: u64) {
        self.acked.lock().unwrap_or_else(|e| e.into_inner()).insert(id);
    }

    pub fn is_acked(&self, id: u64) -> bool {
        self.acked.lock().unwrap_or_else(|e| e.into_inner()).contains(&id)
    }
}

#[async_trait]
impl ExchangeClient for FakeExchange {
    async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<(), AmqpError> {
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Published { routing_key: routing_key.to_string(), body: body.to_vec() });
        Ok(())
    }
}

/// A `CommandSource` backed by an `mpsc` channel — tests push raw JSON
/// bodies with `FakeCommandSender::send`.
pub struct FakeCommandSource {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    exchange: std::sync::Arc<FakeExchange>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

#[derive(Clone)]
pub struct FakeCommandSender {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl FakeCommandSender {
    pub fn send(&self, body: Vec<u8>) {
        let _ = self.tx.send(body);
    }

    pub fn send_json(&self, value: serde_json::Value) {
        if let Ok(body) = serde_json::to_vec(&value) {
            self.send(body);
        }
    }
}

pub fn channel(exchange: std::sync::Arc<FakeExchange>) -> (FakeCommandSender, FakeCommandSource) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        FakeCommandSender { tx },
        FakeCommandSource { rx, exchange, next_id: AtomicU64::new(0), closed: AtomicBool::new(false) },
    )
}

#[async_trait]
impl CommandSource for FakeCommandSource {
    async fn next(&mut self) -> Option<Delivery> {
        if self.closed.load(Ordering::Relaxed) {
            return None;
        }
        match self.rx.recv().await {
            Some(body) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                Some(Delivery::from_fake(body, self.exchange.clone(), id))
            }
            None => {
                self.closed.store(true, Ordering::Relaxed);
                None
            }
        }
    }
}
