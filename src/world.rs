//! The world model: a concurrent, keyed store of entity records with merge
//! semantics and typed lookups. Outer-keyed by `EntityKind` so
//! `find_by_location` scans only that kind's slice; inner-keyed by entity
//! id. Every access — read or write — takes the single `RwLock`; there are
//! no per-entity locks and no read without a guard.

use crate::types::{EntityKind, EntityProperties, EntityUpdate, RobotState, StoredEntity};
use std::collections::HashMap;
use tokio::sync::RwLock;

type KindSlice = HashMap<String, EntityProperties>;

/// Owns its lock and never hands out a reference into the map — every
/// lookup returns an owned clone, which rules out the cross-task mutation
/// races an ambient-mutex-on-a-dict design would be prone to.
pub struct WorldModel {
    inner: RwLock<HashMap<EntityKind, KindSlice>>,
}

impl WorldModel {
    pub fn new() -> Self {
        Self { inner: RwLock::new(HashMap::new()) }
    }

    /// Merge `properties` into the record at `(kind, id)`, creating it if
    /// this is the first update for that identity — creation is implicit,
    /// there is no separate "register this entity" step.
    pub async fn upsert(&self, kind: EntityKind, id: String, properties: EntityProperties) {
        let mut guard = self.inner.write().await;
        let slice = guard.entry(kind).or_default();
        match slice.get_mut(&id) {
            Some(existing) => existing.merge(properties),
            None => {
                slice.insert(id, properties);
            }
        }
    }

    /// Apply a batch of updates atomically: the whole list is merged under
    /// one write-guard acquisition, so a reader never observes a partially
    /// applied batch.
    pub async fn apply_updates(&self, updates: Vec<EntityUpdate>) {
        let mut guard = self.inner.write().await;
        for update in updates {
            let (kind, id, properties) = update.into_parts();
            let slice = guard.entry(kind).or_default();
            match slice.get_mut(&id) {
                Some(existing) => existing.merge(properties),
                None => {
                    slice.insert(id, properties);
                }
            }
        }
    }

    pub async fn get(&self, kind: EntityKind, id: &str) -> Option<StoredEntity> {
        let guard = self.inner.read().await;
        guard
            .get(&kind)
            .and_then(|slice| slice.get(id))
            .map(|properties| StoredEntity { kind, id: id.to_string(), properties: properties.clone() })
    }

    /// Scan only `kind`'s slice for the first record whose `location`
    /// matches `workstation`. Used to resolve material ids that commands
    /// don't carry directly.
    pub async fn find_by_location(&self, kind: EntityKind, workstation: &str) -> Option<StoredEntity> {
        let guard = self.inner.read().await;
        guard.get(&kind).and_then(|slice| {
            slice.iter().find(|(_, properties)| {
                let stored = StoredEntity { kind, id: String::new(), properties: (*properties).clone() };
                stored.location() == Some(workstation)
            })
        }).map(|(id, properties)| StoredEntity { kind, id: id.clone(), properties: properties.clone() })
    }

    /// A live snapshot of the robot entity's `state`, for the heartbeat
    /// loop. Defaults to `Idle` if the robot has never been
    /// updated — a fresh world model has no robot record yet, and an
    /// unseen robot is, observably, idle.
    pub async fn snapshot_robot_state(&self, robot_id: &str) -> RobotState {
        let guard = self.inner.read().await;
        guard
            .get(&EntityKind::Robot)
            .and_then(|slice| slice.get(robot_id))
            .and_then(|properties| match properties {
                EntityProperties::Robot(p) => p.state,
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Empty the whole map in one step, for the `reset_state` command.
    pub async fn reset(&self) {
        let mut guard = self.inner.write().await;
        guard.clear();
    }
}

impl Default for WorldModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CartridgeProperties, CartridgeState, RobotProperties};

    #[tokio::test]
    async fn upsert_creates_then_merges_without_clearing_fields() {
        let world = WorldModel::new();
        world
            .upsert(
                EntityKind::Robot,
                "robot_001".to_string(),
                EntityProperties::Robot(RobotProperties {
                    state: Some(RobotState::Working),
                    location: Some("ws_1".to_string()),
                    description: Some("wait_for_screen_manipulation".to_string()),
                }),
            )
            .await;
        world
            .upsert(
                EntityKind::Robot,
                "robot_001".to_string(),
                EntityProperties::Robot(RobotProperties { state: Some(RobotState::Idle), location: None, description: None }),
            )
            .await;
        let stored = world.get(EntityKind::Robot, "robot_001").await.expect("present");
        match stored.properties {
            EntityProperties::Robot(p) => {
                assert_eq!(p.state, Some(RobotState::Idle));
                assert_eq!(p.location.as_deref(), Some("ws_1"));
                assert_eq!(p.description.as_deref(), Some("wait_for_screen_manipulation"));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[tokio::test]
    async fn find_by_location_scans_only_requested_kind() {
        let world = WorldModel::new();
        world
            .upsert(
                EntityKind::SilicaCartridge,
                "silica_001".to_string(),
                EntityProperties::SilicaCartridge(CartridgeProperties {
                    state: Some(CartridgeState::Inuse),
                    location: Some("ws_bic_09_fh_001".to_string()),
                    description: None,
                }),
            )
            .await;
        let found = world.find_by_location(EntityKind::SilicaCartridge, "ws_bic_09_fh_001").await;
        assert!(found.is_some());
        let missing = world.find_by_location(EntityKind::SampleCartridge, "ws_bic_09_fh_001").await;
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn reset_empties_the_map() {
        let world = WorldModel::new();
        world
            .upsert(EntityKind::Robot, "robot_001".to_string(), EntityProperties::Robot(RobotProperties::default()))
            .await;
        world.reset().await;
        assert!(world.get(EntityKind::Robot, "robot_001").await.is_none());
    }

    #[tokio::test]
    async fn snapshot_robot_state_defaults_to_idle_when_unseen() {
        let world = WorldModel::new();
        assert_eq!(world.snapshot_robot_state("robot_001").await, RobotState::Idle);
    }
}
