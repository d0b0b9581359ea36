//! `start_evaporation`: long-running. Phase 1 sets robot
//! `working, observe_evaporation`, evaporator `using` at ambient readings
//! (25°C, 1013 hPa), flask `description="evaporating"`. Phase 2 linearly
//! interpolates temperature/pressure from ambient to target over the
//! computed duration at each intermediate tick. Phase 3's final result
//! leaves the evaporator at the target readings.

use crate::generators;
use crate::simulators::context::SimContext;
use crate::types::command::StartEvaporationParams;
use crate::types::{EntityKind, EntityUpdate, EvaporatorProperties, FlaskProperties, ResultEnvelope, RobotProperties, RobotState};
use crate::config::defaults::EVAPORATION_FALLBACK_MINUTES;

const AMBIENT_TEMPERATURE: f64 = 25.0;
const AMBIENT_PRESSURE: f64 = 1013.0;

pub async fn simulate(
    task_id: &str,
    params: StartEvaporationParams,
    ctx: &SimContext,
    robot_id: &str,
    re_interval_configured: f64,
) -> ResultEnvelope {
    let evaporator_id = params.device_id.clone().unwrap_or_else(|| format!("evaporator_{}", params.work_station));

    let robot_observing = EntityUpdate::Robot {
        id: robot_id.to_string(),
        properties: RobotProperties { state: Some(RobotState::Working), location: Some(params.work_station.clone()), description: Some("observe_evaporation".to_string()) },
    };
    ctx.publish_log(task_id, robot_observing).await;

    let evaporator_ambient = evaporator_update(&evaporator_id, &params.work_station, AMBIENT_TEMPERATURE, AMBIENT_PRESSURE, params.target_temperature, params.target_pressure);
    ctx.publish_log(task_id, evaporator_ambient).await;

    let flask_id = ctx.find_entity_at(EntityKind::RoundBottomFlask, &params.work_station).await.map(|e| e.id).unwrap_or_else(|| format!("flask_{}", params.work_station));
    let flask_evaporating = EntityUpdate::RoundBottomFlask {
        id: flask_id,
        properties: FlaskProperties { description: Some("evaporating".to_string()), location: Some(params.work_station.clone()), ..Default::default() },
    };
    ctx.publish_log(task_id, flask_evaporating.clone()).await;
    ctx.apply_updates(std::slice::from_ref(&flask_evaporating)).await;

    let duration_minutes = generators::evaporation_duration_minutes(&params.profiles, EVAPORATION_FALLBACK_MINUTES);
    let total_seconds = generators::scaled_duration_seconds(duration_minutes, ctx.multiplier);
    let interval_seconds = ctx.interval(re_interval_configured).await;

    if total_seconds > 0.0 && interval_seconds > 0.0 {
        let mut elapsed = 0.0;
        while elapsed < total_seconds {
            if ctx.is_cancelled() {
                break;
            }
            let tick = interval_seconds.min(total_seconds - elapsed);
            ctx.sleep(tick).await;
            elapsed += tick;
            let fraction = (elapsed / total_seconds).min(1.0);
            let temperature = lerp(AMBIENT_TEMPERATURE, params.target_temperature, fraction);
            let pressure = lerp(AMBIENT_PRESSURE, params.target_pressure, fraction);
            let tick_update = evaporator_update(&evaporator_id, &params.work_station, temperature, pressure, params.target_temperature, params.target_pressure);
            ctx.publish_log(task_id, tick_update).await;
        }
    }

    let evaporator_final = evaporator_update(&evaporator_id, &params.work_station, params.target_temperature, params.target_pressure, params.target_temperature, params.target_pressure);

    let robot_final = EntityUpdate::Robot {
        id: robot_id.to_string(),
        properties: RobotProperties { state: Some(RobotState::Working), location: Some(params.work_station.clone()), description: Some("observe_evaporation".to_string()) },
    };

    ResultEnvelope::success(task_id, vec![evaporator_final, flask_evaporating, robot_final])
}

fn lerp(start: f64, end: f64, fraction: f64) -> f64 {
    start + (end - start) * fraction
}

fn evaporator_update(
    id: &str,
    work_station: &str,
    current_temperature: f64,
    current_pressure: f64,
    target_temperature: f64,
    target_pressure: f64,
) -> EntityUpdate {
    EntityUpdate::Evaporator {
        id: id.to_string(),
        properties: EvaporatorProperties {
            state: Some(crate::types::DeviceState::Using),
            current_temperature: Some(current_temperature),
            current_pressure: Some(current_pressure),
            target_temperature: Some(target_temperature),
            target_pressure: Some(target_pressure),
            location: Some(work_station.to_string()),
            description: None,
        },
    }
}
