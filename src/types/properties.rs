//! Per-kind property bags.
//!
//! Every field is `Option<T>`: on the wire, `None` means "this update does
//! not touch this field"; in the world model, the same struct accumulates
//! merged state, and a `None` field means "no update has ever set this
//! field". Either way a `None` never overwrites a previously-`Some` value —
//! that is the whole of the world model's merge invariant.

use super::entity::{CartridgeState, DeviceState, FlaskContentState, LidState, RobotState, TubeRackState};
use serde::{Deserialize, Serialize};

/// Fields common to every entity kind: always a `state`, plus optional
/// `location` and `description`.
macro_rules! common_fields {
    () => {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        pub location: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        pub description: Option<String>,
    };
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotProperties {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub state: Option<RobotState>,
    common_fields!();
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartridgeProperties {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub state: Option<CartridgeState>,
    common_fields!();
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TubeRackProperties {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub state: Option<TubeRackState>,
    common_fields!();
}

/// The round-bottom flask's structured "state" record, folded
/// into the same common `location`/`description` shape as every other kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlaskProperties {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content_state: Option<FlaskContentState>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub has_lid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lid_state: Option<LidState>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub substance: Option<String>,
    common_fields!();
}

/// Generic device properties, used for the CCS ext module (the only device
/// kind with no extra fields of its own).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceProperties {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub state: Option<DeviceState>,
    common_fields!();
}

/// Chromatography machine properties: device state plus the experiment
/// parameters and start timestamp carried by `start_column_chromatography`.
/// Experiment parameters are echoed back from the command params verbatim
/// rather than re-typed field-by-field, since the wire schema for them is
/// open-ended (see DESIGN.md).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CcMachineProperties {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub state: Option<DeviceState>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub experiment_params: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub start_timestamp: Option<String>,
    common_fields!();
}

/// Evaporator properties: device state plus the ambient/target sensor
/// readings that the evaporation simulator interpolates between.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaporatorProperties {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub state: Option<DeviceState>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current_pressure: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_pressure: Option<f64>,
    common_fields!();
}

/// PCC chute properties: device state plus the numeric positioning fields
/// `collect_fractions` writes. The exact field names are left open by the
/// wire protocol; `position_x`/`position_y` is this implementation's choice
/// (DESIGN.md Open Questions).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChuteProperties {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub state: Option<DeviceState>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub position_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub position_y: Option<f64>,
    common_fields!();
}

/// Merge `other` into `self`, overwriting only the fields `other` carries.
/// Implemented once per properties struct rather than via a generic trait,
/// since each struct's field set differs.
pub trait MergeProperties {
    fn merge(&mut self, other: Self);
}

macro_rules! impl_merge {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl MergeProperties for $ty {
            fn merge(&mut self, other: Self) {
                $(
                    if other.$field.is_some() {
                        self.$field = other.$field;
                    }
                )+
            }
        }
    };
}

impl_merge!(RobotProperties { state, location, description });
impl_merge!(CartridgeProperties { state, location, description });
impl_merge!(TubeRackProperties { state, location, description });
impl_merge!(FlaskProperties { content_state, has_lid, lid_state, substance, location, description });
impl_merge!(DeviceProperties { state, location, description });
impl_merge!(CcMachineProperties { state, experiment_params, start_timestamp, location, description });
impl_merge!(EvaporatorProperties {
    state,
    current_temperature,
    current_pressure,
    target_temperature,
    target_pressure,
    location,
    description
});
impl_merge!(ChuteProperties { state, position_x, position_y, location, description });
