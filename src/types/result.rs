//! Outgoing wire envelopes: the final `result` (and intermediate `log`,
//! which shares the same shape), captured images, and heartbeats.

use super::update::EntityUpdate;
use serde::{Deserialize, Serialize};

/// Success result code.
pub const CODE_SUCCESS: u32 = 200;

/// General/protocol failure band.
pub const CODE_VALIDATION: u32 = 1001;
pub const CODE_UNKNOWN_TASK: u32 = 1000;
pub const CODE_SIMULATOR_ERROR: u32 = 1002;

/// `{ code, msg, task_id, updates, images? }`. Published on both
/// `result` (terminal) and `log` (intermediate) routing keys — the two
/// differ only in when and how often they're sent, not in shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub code: u32,
    pub msg: String,
    pub task_id: String,
    #[serde(default)]
    pub updates: Vec<EntityUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<CapturedImage>>,
}

impl ResultEnvelope {
    pub fn success(task_id: impl Into<String>, updates: Vec<EntityUpdate>) -> Self {
        Self { code: CODE_SUCCESS, msg: "ok".to_string(), task_id: task_id.into(), updates, images: None }
    }

    pub fn success_with_images(
        task_id: impl Into<String>,
        updates: Vec<EntityUpdate>,
        images: Vec<CapturedImage>,
    ) -> Self {
        Self { code: CODE_SUCCESS, msg: "ok".to_string(), task_id: task_id.into(), updates, images: Some(images) }
    }

    /// A failure result never carries updates.
    pub fn failure(task_id: impl Into<String>, code: u32, msg: impl Into<String>) -> Self {
        Self { code, msg: msg.into(), task_id: task_id.into(), updates: Vec::new(), images: None }
    }

    /// One intermediate log message carrying a single entity update, sent
    /// on the `log` routing key.
    pub fn log_entry(task_id: impl Into<String>, update: EntityUpdate) -> Self {
        Self { code: CODE_SUCCESS, msg: "progress".to_string(), task_id: task_id.into(), updates: vec![update], images: None }
    }
}

/// `{ work_station, device_id, device_type, component, url, create_time }`.
/// `create_time` uses the fixed `YYYY-MM-DD_HH-MM-SS.mmm` format, also
/// embedded in `url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedImage {
    pub work_station: String,
    pub device_id: String,
    pub device_type: String,
    pub component: String,
    pub url: String,
    pub create_time: String,
}

/// `{ robot_id, timestamp, state }` published on `{robot_id}.hb`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heartbeat {
    pub robot_id: String,
    pub timestamp: String,
    pub state: super::entity::RobotState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_carries_no_updates() {
        let result = ResultEnvelope::failure("t1", 2001, "already using");
        assert!(result.updates.is_empty());
        assert!(result.images.is_none());
    }

    #[test]
    fn success_serializes_without_images_field_when_absent() {
        let result = ResultEnvelope::success("t1", vec![]);
        let json = serde_json::to_value(&result).expect("serialize");
        assert!(json.get("images").is_none());
    }
}
