//! `collect_fractions`: duration is `count_true(collect_config)
//! * 3s + 10s` before the multiplier/floor. Emits tube rack (`pulled_out,
//! ready_for_recovery`), the round-bottom flask (filled with a substance),
//! and both PCC chutes with positioning fields. Robot ends `working,
//! moving_with_round_bottom_flask`. All-zero `collect_config` still runs
//! the `10s` floor path and still emits chute/flask updates.

use crate::simulators::context::SimContext;
use crate::types::command::CollectFractionsParams;
use crate::types::{
    ChuteProperties, DeviceState, EntityKind, EntityUpdate, FlaskContentState, FlaskProperties, LidState, ResultEnvelope, RobotProperties,
    RobotState, TubeRackProperties, TubeRackState,
};

pub async fn simulate(task_id: &str, params: CollectFractionsParams, ctx: &SimContext, robot_id: &str) -> ResultEnvelope {
    let collected = params.collect_config.iter().filter(|v| **v).count();
    let base_seconds = (collected as f64) * 3.0 + 10.0;
    let delay = ctx.delay(base_seconds, base_seconds).await;
    ctx.sleep(delay).await;

    let tube_rack_id =
        ctx.find_entity_at(EntityKind::TubeRack, &params.work_station).await.map(|e| e.id).unwrap_or_else(|| "tube_rack_001".to_string());
    let tube_rack = EntityUpdate::TubeRack {
        id: tube_rack_id,
        properties: TubeRackProperties { state: Some(TubeRackState::Available), location: Some(params.work_station.clone()), description: Some("pulled_out, ready_for_recovery".to_string()) },
    };

    let flask = EntityUpdate::RoundBottomFlask {
        id: format!("flask_{}", params.work_station),
        properties: FlaskProperties {
            content_state: Some(FlaskContentState::Fill),
            has_lid: Some(true),
            lid_state: Some(LidState::Closed),
            substance: Some("collected_fraction".to_string()),
            location: Some(params.work_station.clone()),
            description: None,
        },
    };

    let left_chute = EntityUpdate::PccLeftChute {
        id: format!("pcc_left_chute_{}", params.work_station),
        properties: ChuteProperties { state: Some(DeviceState::Using), position_x: Some(0.0), position_y: Some(0.0), location: Some(params.work_station.clone()), description: None },
    };
    let right_chute = EntityUpdate::PccRightChute {
        id: format!("pcc_right_chute_{}", params.work_station),
        properties: ChuteProperties { state: Some(DeviceState::Using), position_x: Some(1.0), position_y: Some(0.0), location: Some(params.work_station.clone()), description: None },
    };

    let robot_final = EntityUpdate::Robot {
        id: robot_id.to_string(),
        properties: RobotProperties { state: Some(RobotState::Working), location: Some(params.work_station.clone()), description: Some("moving_with_round_bottom_flask".to_string()) },
    };

    ResultEnvelope::success(task_id, vec![tube_rack, flask, left_chute, right_chute, robot_final])
}
