//! `SimContext`: the small API surface every simulator gets —
//! `publish_log`, `apply_updates`, `sleep`, `find_entity_at` — plus the
//! random source and timing knobs the generators need. Simulators never
//! see the world model, the exchange client, or the scenario selector
//! directly; everything goes through this struct.

use crate::generators;
use crate::types::{CapturedImage, EntityKind, EntityUpdate, ResultEnvelope, StoredEntity};
use crate::world::WorldModel;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

use crate::amqp::ExchangeClient;

pub struct SimContext {
    pub(crate) world: Arc<WorldModel>,
    pub(crate) exchange: Arc<dyn ExchangeClient>,
    pub(crate) log_routing_key: String,
    pub(crate) multiplier: f64,
    pub(crate) min_floor: f64,
    pub(crate) image_base_url: String,
    pub(crate) cancel: CancellationToken,
    rng: AsyncMutex<StdRng>,
}

impl SimContext {
    pub fn new(
        world: Arc<WorldModel>,
        exchange: Arc<dyn ExchangeClient>,
        log_routing_key: String,
        multiplier: f64,
        min_floor: f64,
        image_base_url: String,
        cancel: CancellationToken,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { world, exchange, log_routing_key, multiplier, min_floor, image_base_url, cancel, rng: AsyncMutex::new(rng) }
    }

    pub async fn publish_log(&self, task_id: &str, update: EntityUpdate) {
        let envelope = ResultEnvelope::log_entry(task_id.to_string(), update);
        match serde_json::to_vec(&envelope) {
            Ok(body) => {
                // Broker errors on the log channel are non-fatal: the
                // simulator continues and the final result still carries
                // the terminal state.
                if let Err(e) = self.exchange.publish(&self.log_routing_key, &body).await {
                    tracing::warn!(task_id, error = %e, "log publish failed, continuing");
                }
            }
            Err(e) => tracing::error!(task_id, error = %e, "failed to serialize log envelope"),
        }
    }

    pub async fn apply_updates(&self, updates: &[EntityUpdate]) {
        self.world.apply_updates(updates.to_vec()).await;
    }

    pub async fn sleep(&self, seconds: f64) {
        tokio::time::sleep(std::time::Duration::from_secs_f64(seconds.max(0.0))).await;
    }

    pub async fn find_entity_at(&self, kind: EntityKind, workstation: &str) -> Option<StoredEntity> {
        self.world.find_by_location(kind, workstation).await
    }

    pub async fn delay(&self, min: f64, max: f64) -> f64 {
        let mut rng = self.rng.lock().await;
        generators::timed_delay(&mut *rng, min, max, self.multiplier, self.min_floor)
    }

    pub async fn interval(&self, configured: f64) -> f64 {
        generators::intermediate_interval(configured, self.multiplier, self.min_floor)
    }

    pub async fn image(&self, work_station: &str, device_id: &str, device_type: &str, component: &str) -> CapturedImage {
        generators::image_descriptor(&self.image_base_url, work_station, device_id, device_type, component, chrono::Utc::now())
    }

    pub async fn uniform(&self, lo: f64, hi: f64) -> f64 {
        let mut rng = self.rng.lock().await;
        rng.gen_range(lo..hi)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
