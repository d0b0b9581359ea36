//! The incoming command envelope and its per-`task_type` parameter variants.
//! `task_type` is parsed permissively as a string first so an unrecognized
//! value can be routed to the `1000` "no simulator registered" outcome
//! instead of a structural `1001` failure — see DESIGN.md Open Questions
//! for the ordering this implies.

use serde::{Deserialize, Serialize};

/// Raw command envelope as it arrives on `{robot_id}.cmd`. `params` is left
/// as an untyped JSON value until `TaskType::parse_params` reparses it
/// against the variant the resolved `task_type` expects.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandEnvelope {
    pub task_id: String,
    pub task_type: String,
    #[serde(default = "serde_json::Value::default")]
    pub params: serde_json::Value,
}

/// The closed set of task kinds the dispatcher knows how to run: a tagged
/// variant rather than a string-keyed registry, so a `task_type` with no
/// matching variant is a `1000` failure, never an open dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    SetupTubesToColumnMachine,
    SetupTubeRack,
    TakePhoto,
    StartColumnChromatography,
    TerminateColumnChromatography,
    CollectFractions,
    StartEvaporation,
}

impl TaskType {
    /// The reserved `task_type` that bypasses the whole pipeline rather
    /// than resolving to a `TaskType` variant.
    pub const RESET_STATE: &'static str = "reset_state";

    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "setup_tubes_to_column_machine" => Some(Self::SetupTubesToColumnMachine),
            "setup_tube_rack" => Some(Self::SetupTubeRack),
            "take_photo" => Some(Self::TakePhoto),
            "start_column_chromatography" => Some(Self::StartColumnChromatography),
            "terminate_column_chromatography" => Some(Self::TerminateColumnChromatography),
            "collect_fractions" => Some(Self::CollectFractions),
            "start_evaporation" => Some(Self::StartEvaporation),
            _ => None,
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::SetupTubesToColumnMachine => "setup_tubes_to_column_machine",
            Self::SetupTubeRack => "setup_tube_rack",
            Self::TakePhoto => "take_photo",
            Self::StartColumnChromatography => "start_column_chromatography",
            Self::TerminateColumnChromatography => "terminate_column_chromatography",
            Self::CollectFractions => "collect_fractions",
            Self::StartEvaporation => "start_evaporation",
        }
    }

    /// Whether the dispatch pipeline must schedule this task's simulator on
    /// an independent unit of work instead of running it inline.
    pub fn is_long_running(&self) -> bool {
        matches!(self, Self::StartColumnChromatography | Self::StartEvaporation)
    }

    /// The lower bound of this task's 10-wide failure-code band. Used by
    /// the scenario selector's failure table and by precondition refusal
    /// codes sharing the same band family.
    pub fn failure_band_start(&self) -> u32 {
        match self {
            Self::SetupTubesToColumnMachine => 1010,
            Self::SetupTubeRack => 1020,
            Self::TakePhoto => 1030,
            Self::StartColumnChromatography => 1040,
            Self::TerminateColumnChromatography => 1050,
            Self::CollectFractions => 1060,
            Self::StartEvaporation => 1070,
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetupCartridgesParams {
    pub work_station: String,
    pub silica_cartridge_type: String,
    pub sample_cartridge_id: String,
    pub sample_cartridge_type: String,
    #[serde(default)]
    pub sample_cartridge_location: Option<String>,
    #[serde(default)]
    pub silica_cartridge_id: Option<String>,
    /// Free-text posture the robot should settle into after this task.
    /// Posture descriptions are always free text, never a new `state` enum
    /// value.
    #[serde(default)]
    pub final_description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetupTubeRackParams {
    pub work_station: String,
    #[serde(default)]
    pub tube_rack_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TakePhotoParams {
    pub work_station: String,
    pub device_id: String,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub components: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartCcParams {
    pub work_station: String,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub run_minutes: f64,
    #[serde(default)]
    pub air_purge_minutes: f64,
    #[serde(default = "serde_json::Value::default")]
    pub experiment_params: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TerminateCcParams {
    pub work_station: String,
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectFractionsParams {
    pub work_station: String,
    #[serde(default)]
    pub collect_config: Vec<bool>,
}

/// One trigger in an evaporation profile's schedule. Only `time_from_start`
/// is load-bearing for duration math; any other fields the
/// controller sends ride along in `extra` and are echoed back unexamined.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaporationProfileUpdate {
    pub time_from_start: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EvaporationProfiles {
    #[serde(default)]
    pub updates: Vec<EvaporationProfileUpdate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartEvaporationParams {
    pub work_station: String,
    #[serde(default)]
    pub device_id: Option<String>,
    pub target_temperature: f64,
    pub target_pressure: f64,
    #[serde(default)]
    pub profiles: EvaporationProfiles,
    #[serde(default)]
    pub substance: Option<String>,
}

/// The parsed, task-appropriate parameter payload. One variant per
/// `TaskType`; `TaskType::parse_params` is the only place that builds one.
#[derive(Debug, Clone)]
pub enum TaskParams {
    SetupTubesToColumnMachine(SetupCartridgesParams),
    SetupTubeRack(SetupTubeRackParams),
    TakePhoto(TakePhotoParams),
    StartColumnChromatography(StartCcParams),
    TerminateColumnChromatography(TerminateCcParams),
    CollectFractions(CollectFractionsParams),
    StartEvaporation(StartEvaporationParams),
}

impl TaskType {
    /// Parse `raw_params` against this task's expected shape. A
    /// `serde_json` mismatch is always a `1001` validation failure, never
    /// an opportunity to fall back to an open dict.
    pub fn parse_params(&self, raw_params: serde_json::Value) -> Result<TaskParams, serde_json::Error> {
        Ok(match self {
            Self::SetupTubesToColumnMachine => {
                TaskParams::SetupTubesToColumnMachine(serde_json::from_value(raw_params)?)
            }
            Self::SetupTubeRack => TaskParams::SetupTubeRack(serde_json::from_value(raw_params)?),
            Self::TakePhoto => TaskParams::TakePhoto(serde_json::from_value(raw_params)?),
            Self::StartColumnChromatography => {
                TaskParams::StartColumnChromatography(serde_json::from_value(raw_params)?)
            }
            Self::TerminateColumnChromatography => {
                TaskParams::TerminateColumnChromatography(serde_json::from_value(raw_params)?)
            }
            Self::CollectFractions => TaskParams::CollectFractions(serde_json::from_value(raw_params)?),
            Self::StartEvaporation => TaskParams::StartEvaporation(serde_json::from_value(raw_params)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_task_type_has_no_variant() {
        assert!(TaskType::from_wire("levitate_robot").is_none());
    }

    #[test]
    fn reset_state_is_not_a_task_type_variant() {
        assert!(TaskType::from_wire(TaskType::RESET_STATE).is_none());
    }

    #[test]
    fn param_mismatch_is_a_deserialize_error() {
        let bad = serde_json::json!({"not_work_station": 1});
        assert!(TaskType::SetupTubeRack.parse_params(bad).is_err());
    }
}
