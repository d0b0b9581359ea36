//! `setup_tubes_to_column_machine`: single-phase. Robot goes
//! `working` with a posture description, then after a delay the silica and
//! sample cartridges land `inuse` at the workstation and the ext module
//! goes `using`. `sample_cartridge_location`, when given, names where the
//! robot picks the sample cartridge up from — it is not where the
//! cartridge ends up; both cartridges land `inuse` at `work_station`,
//! matching every other material this task touches.

use crate::simulators::context::SimContext;
use crate::types::command::SetupCartridgesParams;
use crate::types::{CartridgeProperties, CartridgeState, DeviceProperties, DeviceState, EntityUpdate, ResultEnvelope, RobotProperties, RobotState};

pub async fn simulate(task_id: &str, params: SetupCartridgesParams, ctx: &SimContext, robot_id: &str) -> ResultEnvelope {
    let working = EntityUpdate::Robot {
        id: robot_id.to_string(),
        properties: RobotProperties {
            state: Some(RobotState::Working),
            location: Some(params.work_station.clone()),
            description: Some("wait_for_screen_manipulation".to_string()),
        },
    };
    ctx.publish_log(task_id, working.clone()).await;

    let delay = ctx.delay(1.0, 3.0).await;
    ctx.sleep(delay).await;

    let silica_id = params.silica_cartridge_id.clone().unwrap_or_else(|| format!("{}_silica", params.work_station));
    let silica = EntityUpdate::SilicaCartridge {
        id: silica_id,
        properties: CartridgeProperties {
            state: Some(CartridgeState::Inuse),
            location: Some(params.work_station.clone()),
            description: Some(params.silica_cartridge_type.clone()),
        },
    };

    let sample = EntityUpdate::SampleCartridge {
        id: params.sample_cartridge_id.clone(),
        properties: CartridgeProperties {
            state: Some(CartridgeState::Inuse),
            location: Some(params.work_station.clone()),
            description: Some(params.sample_cartridge_type.clone()),
        },
    };

    let ext_module = EntityUpdate::CcsExtModule {
        id: format!("ccs_ext_module_{}", params.work_station),
        properties: DeviceProperties {
            state: Some(DeviceState::Using),
            location: Some(params.work_station.clone()),
            description: None,
        },
    };

    let final_state = match &params.final_description {
        Some(description) => {
            RobotProperties { state: Some(RobotState::Working), location: Some(params.work_station.clone()), description: Some(description.clone()) }
        }
        None => RobotProperties { state: Some(RobotState::Idle), location: Some(params.work_station.clone()), description: None },
    };
    let robot_final = EntityUpdate::Robot { id: robot_id.to_string(), properties: final_state };

    let updates = vec![ext_module, silica, sample, robot_final];
    ResultEnvelope::success(task_id, updates)
}
