//! Periodic heartbeat emitter: publishes `{robot_id, timestamp, state}` on
//! `{robot_id}.hb` at `behavior.heartbeat_interval_seconds`, reading the
//! robot's current state off the world model on every tick so it reflects
//! whatever the most recent command left behind.

use crate::amqp::ExchangeClient;
use crate::types::Heartbeat;
use crate::world::WorldModel;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn run(world: Arc<WorldModel>, exchange: Arc<dyn ExchangeClient>, robot_id: String, interval_seconds: f64, cancel: CancellationToken) {
    let interval = std::time::Duration::from_secs_f64(interval_seconds.max(0.1));
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("heartbeat loop stopping");
                return;
            }
            _ = tokio::time::sleep(interval) => {
                publish_once(&world, exchange.as_ref(), &robot_id).await;
            }
        }
    }
}

async fn publish_once(world: &WorldModel, exchange: &dyn ExchangeClient, robot_id: &str) {
    let state = world.snapshot_robot_state(robot_id).await;
    let heartbeat = Heartbeat { robot_id: robot_id.to_string(), timestamp: chrono::Utc::now().to_rfc3339(), state };
    let routing_key = format!("{robot_id}.hb");
    match serde_json::to_vec(&heartbeat) {
        Ok(body) => {
            if let Err(e) = exchange.publish(&routing_key, &body).await {
                tracing::warn!(error = %e, "heartbeat publish failed");
            }
        }
        Err(e) => tracing::error!(error = %e, "failed to serialize heartbeat"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amqp::fake::FakeExchange;
    use crate::types::{EntityKind, EntityProperties, RobotProperties, RobotState};

    #[tokio::test]
    async fn publish_once_reflects_current_world_state() {
        let world = Arc::new(WorldModel::new());
        world
            .upsert(
                EntityKind::Robot,
                "robot_1".to_string(),
                EntityProperties::Robot(RobotProperties { state: Some(RobotState::Working), location: None, description: None }),
            )
            .await;
        let exchange = FakeExchange::new();
        publish_once(&world, exchange.as_ref(), "robot_1").await;
        let published = exchange.published_on("robot_1.hb");
        assert_eq!(published.len(), 1);
        let heartbeat: Heartbeat = serde_json::from_slice(&published[0].body).expect("valid heartbeat json");
        assert_eq!(heartbeat.state, RobotState::Working);
    }

    #[tokio::test]
    async fn publish_once_defaults_to_idle_for_unseen_robot() {
        let world = Arc::new(WorldModel::new());
        let exchange = FakeExchange::new();
        publish_once(&world, exchange.as_ref(), "robot_unseen").await;
        let published = exchange.published_on("robot_unseen.hb");
        let heartbeat: Heartbeat = serde_json::from_slice(&published[0].body).expect("valid heartbeat json");
        assert_eq!(heartbeat.state, RobotState::Idle);
    }
}
