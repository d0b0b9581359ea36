//! Entity identity and the per-kind state enumerations.

use serde::{Deserialize, Serialize};

/// The composite identity of an entity is `(kind, id)`. `EntityKind` is the
/// `kind` half, and doubles as the outer key of the world model so that
/// `find_by_location` can scan a single kind's slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Robot,
    SilicaCartridge,
    SampleCartridge,
    TubeRack,
    RoundBottomFlask,
    CcsExtModule,
    ColumnChromatographyMachine,
    Evaporator,
    PccLeftChute,
    PccRightChute,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Robot => "robot",
            EntityKind::SilicaCartridge => "silica_cartridge",
            EntityKind::SampleCartridge => "sample_cartridge",
            EntityKind::TubeRack => "tube_rack",
            EntityKind::RoundBottomFlask => "round_bottom_flask",
            EntityKind::CcsExtModule => "ccs_ext_module",
            EntityKind::ColumnChromatographyMachine => "column_chromatography_machine",
            EntityKind::Evaporator => "evaporator",
            EntityKind::PccLeftChute => "pcc_left_chute",
            EntityKind::PccRightChute => "pcc_right_chute",
        }
    }

    /// All kinds, used to size/iterate the world model's outer map.
    pub const ALL: [EntityKind; 10] = [
        EntityKind::Robot,
        EntityKind::SilicaCartridge,
        EntityKind::SampleCartridge,
        EntityKind::TubeRack,
        EntityKind::RoundBottomFlask,
        EntityKind::CcsExtModule,
        EntityKind::ColumnChromatographyMachine,
        EntityKind::Evaporator,
        EntityKind::PccLeftChute,
        EntityKind::PccRightChute,
    ];
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Robot state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotState {
    #[default]
    Idle,
    Working,
    Charging,
    Disconnected,
}

/// Shared state enumeration for the device-like entity kinds: the CC
/// machine, the evaporator, the CCS ext module, and both PCC chutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    #[default]
    Idle,
    Using,
    Unavailable,
}

/// State enumeration shared by the silica and sample cartridge kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartridgeState {
    #[default]
    Unused,
    Inuse,
    Used,
}

/// Tube rack state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TubeRackState {
    #[default]
    Available,
    Inuse,
    Contaminated,
}

/// Round-bottom flask content state. The flask's "state" is not a
/// flat enum but the structured record below; `FlaskContentState` is one
/// field of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlaskContentState {
    Empty,
    Fill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LidState {
    Open,
    Closed,
}
