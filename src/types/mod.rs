//! Wire and in-memory data types shared across the dispatch pipeline:
//! entity identity/state (`entity`), per-kind property bags (`properties`),
//! the command envelope and per-task parameter variants (`command`), the
//! tagged entity-update wire type (`update`), and the outgoing result,
//! image, and heartbeat envelopes (`result`).

pub mod command;
pub mod entity;
pub mod properties;
pub mod result;
pub mod update;

pub use command::{CommandEnvelope, TaskParams, TaskType};
pub use entity::{
    CartridgeState, DeviceState, EntityKind, FlaskContentState, LidState, RobotState, TubeRackState,
};
pub use properties::{
    CartridgeProperties, CcMachineProperties, ChuteProperties, DeviceProperties, EvaporatorProperties,
    FlaskProperties, MergeProperties, RobotProperties, TubeRackProperties,
};
pub use result::{CapturedImage, Heartbeat, ResultEnvelope};
pub use update::{EntityProperties, EntityUpdate, StoredEntity};
