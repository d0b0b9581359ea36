//! The tagged `EntityUpdate` wire type and its in-memory counterpart
//! (`EntityProperties`/`StoredEntity`) held by the world model. Both are
//! built from the same per-kind properties structs in
//! `properties`; `EntityUpdate` additionally carries the `id` the wire
//! format puts alongside `type`, while `EntityProperties` is keyed
//! implicitly by the world model's outer `(kind, id)` map.

use super::entity::EntityKind;
use super::properties::{
    CartridgeProperties, CcMachineProperties, ChuteProperties, DeviceProperties, EvaporatorProperties,
    FlaskProperties, MergeProperties, RobotProperties, TubeRackProperties,
};
use serde::{Deserialize, Serialize};

/// One entity-update record, discriminated by `type`. Produced by
/// simulators, carried on `result.updates[]` and `log` messages, and
/// applied to the world model via `WorldModel::apply_updates`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityUpdate {
    Robot { id: String, properties: RobotProperties },
    SilicaCartridge { id: String, properties: CartridgeProperties },
    SampleCartridge { id: String, properties: CartridgeProperties },
    TubeRack { id: String, properties: TubeRackProperties },
    RoundBottomFlask { id: String, properties: FlaskProperties },
    CcsExtModule { id: String, properties: DeviceProperties },
    ColumnChromatographyMachine { id: String, properties: CcMachineProperties },
    Evaporator { id: String, properties: EvaporatorProperties },
    PccLeftChute { id: String, properties: ChuteProperties },
    PccRightChute { id: String, properties: ChuteProperties },
}

impl EntityUpdate {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Robot { .. } => EntityKind::Robot,
            Self::SilicaCartridge { .. } => EntityKind::SilicaCartridge,
            Self::SampleCartridge { .. } => EntityKind::SampleCartridge,
            Self::TubeRack { .. } => EntityKind::TubeRack,
            Self::RoundBottomFlask { .. } => EntityKind::RoundBottomFlask,
            Self::CcsExtModule { .. } => EntityKind::CcsExtModule,
            Self::ColumnChromatographyMachine { .. } => EntityKind::ColumnChromatographyMachine,
            Self::Evaporator { .. } => EntityKind::Evaporator,
            Self::PccLeftChute { .. } => EntityKind::PccLeftChute,
            Self::PccRightChute { .. } => EntityKind::PccRightChute,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Robot { id, .. }
            | Self::SilicaCartridge { id, .. }
            | Self::SampleCartridge { id, .. }
            | Self::TubeRack { id, .. }
            | Self::RoundBottomFlask { id, .. }
            | Self::CcsExtModule { id, .. }
            | Self::ColumnChromatographyMachine { id, .. }
            | Self::Evaporator { id, .. }
            | Self::PccLeftChute { id, .. }
            | Self::PccRightChute { id, .. } => id,
        }
    }

    /// Split into the world model's storage shape: outer key, inner key,
    /// and the properties payload to merge.
    pub fn into_parts(self) -> (EntityKind, String, EntityProperties) {
        match self {
            Self::Robot { id, properties } => (EntityKind::Robot, id, EntityProperties::Robot(properties)),
            Self::SilicaCartridge { id, properties } => {
                (EntityKind::SilicaCartridge, id, EntityProperties::SilicaCartridge(properties))
            }
            Self::SampleCartridge { id, properties } => {
                (EntityKind::SampleCartridge, id, EntityProperties::SampleCartridge(properties))
            }
            Self::TubeRack { id, properties } => (EntityKind::TubeRack, id, EntityProperties::TubeRack(properties)),
            Self::RoundBottomFlask { id, properties } => {
                (EntityKind::RoundBottomFlask, id, EntityProperties::RoundBottomFlask(properties))
            }
            Self::CcsExtModule { id, properties } => {
                (EntityKind::CcsExtModule, id, EntityProperties::CcsExtModule(properties))
            }
            Self::ColumnChromatographyMachine { id, properties } => (
                EntityKind::ColumnChromatographyMachine,
                id,
                EntityProperties::ColumnChromatographyMachine(properties),
            ),
            Self::Evaporator { id, properties } => {
                (EntityKind::Evaporator, id, EntityProperties::Evaporator(properties))
            }
            Self::PccLeftChute { id, properties } => {
                (EntityKind::PccLeftChute, id, EntityProperties::PccLeftChute(properties))
            }
            Self::PccRightChute { id, properties } => {
                (EntityKind::PccRightChute, id, EntityProperties::PccRightChute(properties))
            }
        }
    }

    pub fn from_parts(kind: EntityKind, id: String, properties: EntityProperties) -> Self {
        match properties {
            EntityProperties::Robot(p) => Self::Robot { id, properties: p },
            EntityProperties::SilicaCartridge(p) => Self::SilicaCartridge { id, properties: p },
            EntityProperties::SampleCartridge(p) => Self::SampleCartridge { id, properties: p },
            EntityProperties::TubeRack(p) => Self::TubeRack { id, properties: p },
            EntityProperties::RoundBottomFlask(p) => Self::RoundBottomFlask { id, properties: p },
            EntityProperties::CcsExtModule(p) => Self::CcsExtModule { id, properties: p },
            EntityProperties::ColumnChromatographyMachine(p) => {
                Self::ColumnChromatographyMachine { id, properties: p }
            }
            EntityProperties::Evaporator(p) => Self::Evaporator { id, properties: p },
            EntityProperties::PccLeftChute(p) => Self::PccLeftChute { id, properties: p },
            EntityProperties::PccRightChute(p) => Self::PccRightChute { id, properties: p },
        }
        .tag_with(kind)
    }
}

// `from_parts` never needs to correct the kind (each `EntityProperties`
// variant already implies exactly one `EntityKind`); `tag_with` exists only
// to make that invariant explicit at the call site below in debug builds.
trait TagWith {
    fn tag_with(self, kind: EntityKind) -> Self;
}

impl TagWith for EntityUpdate {
    fn tag_with(self, kind: EntityKind) -> Self {
        debug_assert_eq!(self.kind(), kind, "EntityProperties variant did not match requested EntityKind");
        self
    }
}

/// The per-kind properties payload, without the wire `id`/`type` — this is
/// what the world model actually stores, keyed by `(kind, id)` in its outer
/// maps.
#[derive(Debug, Clone)]
pub enum EntityProperties {
    Robot(RobotProperties),
    SilicaCartridge(CartridgeProperties),
    SampleCartridge(CartridgeProperties),
    TubeRack(TubeRackProperties),
    RoundBottomFlask(FlaskProperties),
    CcsExtModule(DeviceProperties),
    ColumnChromatographyMachine(CcMachineProperties),
    Evaporator(EvaporatorProperties),
    PccLeftChute(ChuteProperties),
    PccRightChute(ChuteProperties),
}

impl EntityProperties {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Robot(_) => EntityKind::Robot,
            Self::SilicaCartridge(_) => EntityKind::SilicaCartridge,
            Self::SampleCartridge(_) => EntityKind::SampleCartridge,
            Self::TubeRack(_) => EntityKind::TubeRack,
            Self::RoundBottomFlask(_) => EntityKind::RoundBottomFlask,
            Self::CcsExtModule(_) => EntityKind::CcsExtModule,
            Self::ColumnChromatographyMachine(_) => EntityKind::ColumnChromatographyMachine,
            Self::Evaporator(_) => EntityKind::Evaporator,
            Self::PccLeftChute(_) => EntityKind::PccLeftChute,
            Self::PccRightChute(_) => EntityKind::PccRightChute,
        }
    }

    /// Merge `incoming` into `self`. Both must be the same variant — the
    /// world model only ever merges updates into the slice matching their
    /// own kind, so a mismatch is a bug in the caller, not recoverable
    /// input; it is therefore simply ignored defensively rather than
    /// panicking a live task.
    pub fn merge(&mut self, incoming: EntityProperties) {
        match (self, incoming) {
            (Self::Robot(a), Self::Robot(b)) => a.merge(b),
            (Self::SilicaCartridge(a), Self::SilicaCartridge(b)) => a.merge(b),
            (Self::SampleCartridge(a), Self::SampleCartridge(b)) => a.merge(b),
            (Self::TubeRack(a), Self::TubeRack(b)) => a.merge(b),
            (Self::RoundBottomFlask(a), Self::RoundBottomFlask(b)) => a.merge(b),
            (Self::CcsExtModule(a), Self::CcsExtModule(b)) => a.merge(b),
            (Self::ColumnChromatographyMachine(a), Self::ColumnChromatographyMachine(b)) => a.merge(b),
            (Self::Evaporator(a), Self::Evaporator(b)) => a.merge(b),
            (Self::PccLeftChute(a), Self::PccLeftChute(b)) => a.merge(b),
            (Self::PccRightChute(a), Self::PccRightChute(b)) => a.merge(b),
            (_, _) => {}
        }
    }
}

/// A world-model lookup result: identity plus the merged properties on
/// file for that entity.
#[derive(Debug, Clone)]
pub struct StoredEntity {
    pub kind: EntityKind,
    pub id: String,
    pub properties: EntityProperties,
}

impl StoredEntity {
    pub fn location(&self) -> Option<&str> {
        match &self.properties {
            EntityProperties::Robot(p) => p.location.as_deref(),
            EntityProperties::SilicaCartridge(p) => p.location.as_deref(),
            EntityProperties::SampleCartridge(p) => p.location.as_deref(),
            EntityProperties::TubeRack(p) => p.location.as_deref(),
            EntityProperties::RoundBottomFlask(p) => p.location.as_deref(),
            EntityProperties::CcsExtModule(p) => p.location.as_deref(),
            EntityProperties::ColumnChromatographyMachine(p) => p.location.as_deref(),
            EntityProperties::Evaporator(p) => p.location.as_deref(),
            EntityProperties::PccLeftChute(p) => p.location.as_deref(),
            EntityProperties::PccRightChute(p) => p.location.as_deref(),
        }
    }
}
