//! `take_photo`: delay scales with component count. One image
//! descriptor per listed component; the named device is touched `using`
//! then `idle` if its `device_type` resolves to a known entity kind. Zero
//! components still returns `200` with no images.

use crate::simulators::context::SimContext;
use crate::types::command::TakePhotoParams;
use crate::types::{
    CcMachineProperties, ChuteProperties, DeviceProperties, DeviceState, EntityKind, EntityUpdate, EvaporatorProperties,
    ResultEnvelope, RobotProperties, RobotState,
};

pub async fn simulate(task_id: &str, params: TakePhotoParams, ctx: &SimContext) -> ResultEnvelope {
    let kind = resolve_kind(params.device_type.as_deref());
    let device_type = params.device_type.clone().unwrap_or_else(|| "camera".to_string());

    if let Some(kind) = kind {
        let using = device_update(kind, &params.device_id, &params.work_station, DeviceState::Using);
        ctx.publish_log(task_id, using).await;
    }

    let delay = ctx.delay(0.5, 1.0).await * (params.components.len().max(1) as f64);
    ctx.sleep(delay).await;

    let mut images = Vec::with_capacity(params.components.len());
    for component in &params.components {
        images.push(ctx.image(&params.work_station, &params.device_id, &device_type, component).await);
    }

    let updates = match kind {
        Some(kind) => vec![device_update(kind, &params.device_id, &params.work_station, DeviceState::Idle)],
        None => Vec::new(),
    };

    if images.is_empty() {
        ResultEnvelope::success(task_id, updates)
    } else {
        ResultEnvelope::success_with_images(task_id, updates, images)
    }
}

/// `device_type` is free text on the wire; map the values the controller
/// actually sends to a world-model kind. Anything else leaves the device
/// untouched in the world model — the photo itself still succeeds.
fn resolve_kind(device_type: Option<&str>) -> Option<EntityKind> {
    match device_type {
        Some("robot") => Some(EntityKind::Robot),
        Some("ccs_ext_module") => Some(EntityKind::CcsExtModule),
        Some("column_chromatography_machine") => Some(EntityKind::ColumnChromatographyMachine),
        Some("evaporator") => Some(EntityKind::Evaporator),
        Some("pcc_left_chute") => Some(EntityKind::PccLeftChute),
        Some("pcc_right_chute") => Some(EntityKind::PccRightChute),
        _ => None,
    }
}

fn device_update(kind: EntityKind, device_id: &str, work_station: &str, state: DeviceState) -> EntityUpdate {
    let location = Some(work_station.to_string());
    match kind {
        EntityKind::Robot => EntityUpdate::Robot {
            id: device_id.to_string(),
            properties: RobotProperties {
                state: Some(match state {
                    DeviceState::Using => RobotState::Working,
                    _ => RobotState::Idle,
                }),
                location,
                description: None,
            },
        },
        EntityKind::CcsExtModule => {
            EntityUpdate::CcsExtModule { id: device_id.to_string(), properties: DeviceProperties { state: Some(state), location, description: None } }
        }
        EntityKind::ColumnChromatographyMachine => EntityUpdate::ColumnChromatographyMachine {
            id: device_id.to_string(),
            properties: CcMachineProperties { state: Some(state), location, ..Default::default() },
        },
        EntityKind::Evaporator => EntityUpdate::Evaporator {
            id: device_id.to_string(),
            properties: EvaporatorProperties { state: Some(state), location, ..Default::default() },
        },
        EntityKind::PccLeftChute => EntityUpdate::PccLeftChute {
            id: device_id.to_string(),
            properties: ChuteProperties { state: Some(state), location, ..Default::default() },
        },
        EntityKind::PccRightChute => EntityUpdate::PccRightChute {
            id: device_id.to_string(),
            properties: ChuteProperties { state: Some(state), location, ..Default::default() },
        },
        _ => unreachable!("resolve_kind only returns photographable kinds"),
    }
}
