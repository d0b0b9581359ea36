//! `start_column_chromatography`: long-running. Phase 1 emits
//! the initial log updates; phase 2 republishes the machine update at
//! `cc_intermediate_interval` boundaries until the total duration elapses;
//! phase 3 emits the final result. `run_minutes = 0` skips phase 2 but
//! still runs phases 1 and 3.

use crate::generators;
use crate::simulators::context::SimContext;
use crate::types::command::StartCcParams;
use crate::types::{
    CartridgeProperties, CartridgeState, CcMachineProperties, DeviceState, EntityUpdate, ResultEnvelope, RobotProperties, RobotState,
    TubeRackProperties, TubeRackState,
};

pub async fn simulate(
    task_id: &str,
    params: StartCcParams,
    ctx: &SimContext,
    robot_id: &str,
    cc_interval_configured: f64,
) -> ResultEnvelope {
    let machine_id = params.device_id.clone().unwrap_or_else(|| format!("cc_machine_{}", params.work_station));
    let start_timestamp = chrono::Utc::now().to_rfc3339();

    let robot_watching = EntityUpdate::Robot {
        id: robot_id.to_string(),
        properties: RobotProperties {
            state: Some(RobotState::Working),
            location: Some(params.work_station.clone()),
            description: Some("watch_column_machine_screen".to_string()),
        },
    };
    ctx.publish_log(task_id, robot_watching.clone()).await;

    let machine_started = EntityUpdate::ColumnChromatographyMachine {
        id: machine_id.clone(),
        properties: CcMachineProperties {
            state: Some(DeviceState::Using),
            experiment_params: Some(params.experiment_params.clone()),
            start_timestamp: Some(start_timestamp.clone()),
            location: Some(params.work_station.clone()),
            description: None,
        },
    };
    ctx.publish_log(task_id, machine_started.clone()).await;

    let materials = materials_inuse(ctx, &params.work_station).await;
    for material in &materials {
        ctx.publish_log(task_id, material.clone()).await;
    }
    ctx.apply_updates(&materials).await;

    let duration_minutes = generators::cc_duration_minutes(params.run_minutes, params.air_purge_minutes);
    let total_seconds = generators::scaled_duration_seconds(duration_minutes, ctx.multiplier);
    let interval_seconds = ctx.interval(cc_interval_configured).await;

    if total_seconds > 0.0 && interval_seconds > 0.0 {
        let mut elapsed = 0.0;
        while elapsed < total_seconds {
            if ctx.is_cancelled() {
                break;
            }
            let tick = interval_seconds.min(total_seconds - elapsed);
            ctx.sleep(tick).await;
            elapsed += tick;
            ctx.publish_log(task_id, machine_started.clone()).await;
        }
    }

    let robot_final = EntityUpdate::Robot {
        id: robot_id.to_string(),
        properties: RobotProperties {
            state: Some(RobotState::Working),
            location: Some(params.work_station.clone()),
            description: Some("watch_column_machine_screen".to_string()),
        },
    };

    let mut updates = vec![machine_started, robot_final];
    updates.extend(materials);
    ResultEnvelope::success(task_id, updates)
}

/// Reuse whichever silica/sample/tube-rack ids are already at the
/// workstation (placed there by an earlier `setup_*` command and confirmed
/// present by the precondition check); fall back to a synthesized id only
/// if none is on record, so a world model with no prior setup still gets
/// consistent entries.
async fn materials_inuse(ctx: &SimContext, work_station: &str) -> Vec<EntityUpdate> {
    use crate::types::EntityKind;

    let silica_id = ctx
        .find_entity_at(EntityKind::SilicaCartridge, work_station)
        .await
        .map(|e| e.id)
        .unwrap_or_else(|| format!("{work_station}_silica"));
    let sample_id = ctx
        .find_entity_at(EntityKind::SampleCartridge, work_station)
        .await
        .map(|e| e.id)
        .unwrap_or_else(|| format!("{work_station}_sample"));
    let tube_rack_id =
        ctx.find_entity_at(EntityKind::TubeRack, work_station).await.map(|e| e.id).unwrap_or_else(|| "tube_rack_001".to_string());

    vec![
        EntityUpdate::SilicaCartridge {
            id: silica_id,
            properties: CartridgeProperties { state: Some(CartridgeState::Inuse), location: Some(work_station.to_string()), description: None },
        },
        EntityUpdate::SampleCartridge {
            id: sample_id,
            properties: CartridgeProperties { state: Some(CartridgeState::Inuse), location: Some(work_station.to_string()), description: None },
        },
        EntityUpdate::TubeRack {
            id: tube_rack_id,
            properties: TubeRackProperties { state: Some(TubeRackState::Inuse), location: Some(work_station.to_string()), description: None },
        },
    ]
}
