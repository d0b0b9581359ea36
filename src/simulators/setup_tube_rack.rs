//! `setup_tube_rack`: resolve the target tube rack by id or
//! fall back to `tube_rack_001`; robot goes `working` with a posture
//! description, then the tube rack lands `inuse, description="mounted"`.

use crate::simulators::context::SimContext;
use crate::types::command::SetupTubeRackParams;
use crate::types::{EntityUpdate, ResultEnvelope, RobotProperties, RobotState, TubeRackProperties, TubeRackState};

pub async fn simulate(task_id: &str, params: SetupTubeRackParams, ctx: &SimContext, robot_id: &str) -> ResultEnvelope {
    let working = EntityUpdate::Robot {
        id: robot_id.to_string(),
        properties: RobotProperties {
            state: Some(RobotState::Working),
            location: Some(params.work_station.clone()),
            description: Some("wait_for_screen_manipulation".to_string()),
        },
    };
    ctx.publish_log(task_id, working).await;

    let delay = ctx.delay(1.0, 2.0).await;
    ctx.sleep(delay).await;

    let tube_rack_id = params.tube_rack_id.clone().unwrap_or_else(|| "tube_rack_001".to_string());
    let tube_rack = EntityUpdate::TubeRack {
        id: tube_rack_id,
        properties: TubeRackProperties {
            state: Some(TubeRackState::Inuse),
            location: Some(params.work_station.clone()),
            description: Some("mounted".to_string()),
        },
    };

    let robot_final = EntityUpdate::Robot {
        id: robot_id.to_string(),
        properties: RobotProperties { state: Some(RobotState::Idle), location: Some(params.work_station.clone()), description: None },
    };

    ResultEnvelope::success(task_id, vec![tube_rack, robot_final])
}
