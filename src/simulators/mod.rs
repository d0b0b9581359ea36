//! One simulator per task kind. Each
//! encapsulates its own sequence of intermediate updates, delay schedule,
//! and final result; the dispatch pipeline is the only caller, and only
//! ever calls through `simulate` below.

pub mod collect_fractions;
pub mod context;
pub mod setup_cartridges;
pub mod setup_tube_rack;
pub mod start_cc;
pub mod start_evaporation;
pub mod take_photo;
pub mod terminate_cc;

pub use context::SimContext;

use crate::types::command::TaskParams;
use crate::types::result::CODE_SIMULATOR_ERROR;
use crate::types::{ResultEnvelope, TaskType};

/// Run the simulator matching `(task_type, params)`. The pair is always
/// produced together by `TaskType::parse_params`, so a mismatch here would
/// be a dispatcher bug rather than bad input; it is still handled as a
/// `1002` rather than panicking a live task.
#[allow(clippy::too_many_arguments)]
pub async fn simulate(
    task_type: TaskType,
    task_id: &str,
    params: TaskParams,
    ctx: &SimContext,
    robot_id: &str,
    cc_interval_configured: f64,
    re_interval_configured: f64,
) -> ResultEnvelope {
    match (task_type, params) {
        (TaskType::SetupTubesToColumnMachine, TaskParams::SetupTubesToColumnMachine(p)) => {
            setup_cartridges::simulate(task_id, p, ctx, robot_id).await
        }
        (TaskType::SetupTubeRack, TaskParams::SetupTubeRack(p)) => setup_tube_rack::simulate(task_id, p, ctx, robot_id).await,
        (TaskType::TakePhoto, TaskParams::TakePhoto(p)) => take_photo::simulate(task_id, p, ctx).await,
        (TaskType::StartColumnChromatography, TaskParams::StartColumnChromatography(p)) => {
            start_cc::simulate(task_id, p, ctx, robot_id, cc_interval_configured).await
        }
        (TaskType::TerminateColumnChromatography, TaskParams::TerminateColumnChromatography(p)) => {
            terminate_cc::simulate(task_id, p, ctx).await
        }
        (TaskType::CollectFractions, TaskParams::CollectFractions(p)) => collect_fractions::simulate(task_id, p, ctx, robot_id).await,
        (TaskType::StartEvaporation, TaskParams::StartEvaporation(p)) => {
            start_evaporation::simulate(task_id, p, ctx, robot_id, re_interval_configured).await
        }
        (task_type, _) => {
            tracing::error!(task_type = %task_type, "params variant did not match task_type — dispatcher bug");
            ResultEnvelope::failure(task_id, CODE_SIMULATOR_ERROR, format!("internal error dispatching {task_type}"))
        }
    }
}
