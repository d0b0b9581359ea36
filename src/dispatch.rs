//! The dispatch pipeline: the only place in the crate that
//! parses commands, gates them through scenario selection and
//! preconditions, runs the matching simulator — inline for short tasks,
//! concurrently for long-running ones — and merges final updates back into
//! the world model before publishing a result. One deliberate reordering
//! from a naive reading of the stages: `TaskType` resolution happens right
//! after the reserved `reset_state` check rather than after scenario
//! selection, so an unrecognized `task_type` short-circuits straight to
//! `1000` without first drawing from the scenario selector's RNG (see
//! DESIGN.md).

use crate::amqp::ExchangeClient;
use crate::config::AppConfig;
use crate::error::{AmqpError, DispatchError};
use crate::precondition;
use crate::scenario::{Scenario, ScenarioSelector};
use crate::simulators::{self, SimContext};
use crate::types::command::{CommandEnvelope, TaskParams, TaskType};
use crate::types::ResultEnvelope;
use crate::world::WorldModel;
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub struct Dispatcher {
    world: Arc<WorldModel>,
    exchange: Arc<dyn ExchangeClient>,
    robot_id: String,
    scenario: Mutex<ScenarioSelector>,
    base_delay_multiplier: f64,
    min_delay_seconds: f64,
    image_base_url: String,
    cc_interval: f64,
    re_interval: f64,
    long_tasks: tokio::sync::Mutex<JoinSet<()>>,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(world: Arc<WorldModel>, exchange: Arc<dyn ExchangeClient>, config: &AppConfig, cancel: CancellationToken) -> Self {
        let behavior = &config.behavior;
        let scenario = ScenarioSelector::new(config.rng_seed, behavior.failure_rate, behavior.timeout_rate, behavior.default_scenario);
        Self {
            world,
            exchange,
            robot_id: config.robot_id.clone(),
            scenario: Mutex::new(scenario),
            base_delay_multiplier: behavior.base_delay_multiplier,
            min_delay_seconds: behavior.min_delay_seconds,
            image_base_url: behavior.image_base_url.clone(),
            cc_interval: behavior.cc_intermediate_interval_seconds,
            re_interval: behavior.re_intermediate_interval_seconds,
            long_tasks: tokio::sync::Mutex::new(JoinSet::new()),
            cancel,
        }
    }

    fn result_routing_key(&self) -> String {
        format!("{}.result", self.robot_id)
    }

    fn log_routing_key(&self) -> String {
        format!("{}.log", self.robot_id)
    }

    /// Handle one command delivery body. Returns once the
    /// pipeline's own work is done — for long-running tasks that means the
    /// simulator has been scheduled, not that it has finished, so the
    /// caller can ack the delivery and keep consuming immediately.
    pub async fn handle(&self, body: &[u8]) {
        let envelope: CommandEnvelope = match serde_json::from_slice(body) {
            Ok(e) => e,
            Err(e) => {
                let err = DispatchError::Validation(format!("malformed envelope: {e}"));
                tracing::warn!(error = %err, "malformed command envelope");
                self.publish_result(ResultEnvelope::failure(String::new(), err.code(), err.to_string())).await;
                return;
            }
        };

        let task_id = envelope.task_id.clone();
        tracing::info!(task_id, task_type = %envelope.task_type, "command received");

        if envelope.task_type == TaskType::RESET_STATE {
            self.world.reset().await;
            self.publish_result(ResultEnvelope::success(task_id, Vec::new())).await;
            return;
        }

        let task_type = match TaskType::from_wire(&envelope.task_type) {
            Some(task_type) => task_type,
            None => {
                let err = DispatchError::UnknownTask(envelope.task_type.clone());
                self.publish_result(ResultEnvelope::failure(task_id, err.code(), err.to_string())).await;
                return;
            }
        };

        let scenario = self.scenario.lock().expect("scenario selector mutex poisoned").decide();
        match scenario {
            Scenario::Timeout => {
                tracing::debug!(task_id, task_type = %task_type, "scenario: vanish — acking with no output");
            }
            Scenario::Failure => {
                let (code, msg) = self.scenario.lock().expect("scenario selector mutex poisoned").pick_failure(task_type);
                tracing::info!(task_id, task_type = %task_type, code, "scenario: injected failure");
                self.publish_result(ResultEnvelope::failure(task_id, code, msg)).await;
            }
            Scenario::Success => {
                self.handle_success_path(task_id, task_type, envelope.params).await;
            }
        }
    }

    async fn handle_success_path(&self, task_id: String, task_type: TaskType, raw_params: serde_json::Value) {
        let params = match task_type.parse_params(raw_params) {
            Ok(params) => params,
            Err(e) => {
                let err = DispatchError::Validation(format!("invalid params for {task_type}: {e}"));
                self.publish_result(ResultEnvelope::failure(task_id, err.code(), err.to_string())).await;
                return;
            }
        };

        if let Err((code, msg)) = self.check_preconditions(task_type, &params).await {
            tracing::info!(task_id, task_type = %task_type, code, "precondition refused");
            self.publish_result(ResultEnvelope::failure(task_id, code, msg)).await;
            return;
        }

        let ctx = self.build_context();
        if task_type.is_long_running() {
            self.spawn_long_running(task_id, task_type, params, ctx).await;
        } else {
            let result = run_simulator_guarded(
                task_type,
                task_id,
                params,
                ctx,
                self.robot_id.clone(),
                self.cc_interval,
                self.re_interval,
            )
            .await;
            self.finish(result).await;
        }
    }

    async fn check_preconditions(&self, task_type: TaskType, params: &TaskParams) -> precondition::PreconditionResult {
        match (task_type, params) {
            (TaskType::SetupTubesToColumnMachine, TaskParams::SetupTubesToColumnMachine(p)) => {
                precondition::check_setup_cartridges(p, &self.world).await
            }
            (TaskType::SetupTubeRack, TaskParams::SetupTubeRack(p)) => precondition::check_setup_tube_rack(p, &self.world).await,
            (TaskType::TakePhoto, TaskParams::TakePhoto(p)) => precondition::check_take_photo(p, &self.world).await,
            (TaskType::StartColumnChromatography, TaskParams::StartColumnChromatography(p)) => {
                precondition::check_start_cc(p, &self.world).await
            }
            (TaskType::TerminateColumnChromatography, TaskParams::TerminateColumnChromatography(p)) => {
                precondition::check_terminate_cc(p, &self.world).await
            }
            (TaskType::CollectFractions, TaskParams::CollectFractions(p)) => precondition::check_collect_fractions(p, &self.world).await,
            (TaskType::StartEvaporation, TaskParams::StartEvaporation(p)) => precondition::check_start_evaporation(p, &self.world).await,
            _ => Ok(()),
        }
    }

    /// Schedule a long-running simulator on the independent-task `JoinSet`.
    /// The task itself runs the simulator through [`run_simulator_guarded`]
    /// so a panic inside `start_cc`/`start_evaporation` still ends in a
    /// single published `1002` result rather than a silently dropped task.
    async fn spawn_long_running(&self, task_id: String, task_type: TaskType, params: TaskParams, ctx: SimContext) {
        let exchange = self.exchange.clone();
        let world = self.world.clone();
        let robot_id = self.robot_id.clone();
        let result_key = self.result_routing_key();
        let cc_interval = self.cc_interval;
        let re_interval = self.re_interval;

        let mut long_tasks = self.long_tasks.lock().await;
        long_tasks.spawn(async move {
            let result = run_simulator_guarded(task_type, task_id, params, ctx, robot_id, cc_interval, re_interval).await;
            world.apply_updates(result.updates.clone()).await;
            publish_with_retry(exchange.as_ref(), &result_key, &result).await;
        });
    }

    /// Apply final updates to the world model before publishing the result,
    /// so a controller reading the result channel immediately sees
    /// consistent world state.
    async fn finish(&self, result: ResultEnvelope) {
        self.world.apply_updates(result.updates.clone()).await;
        self.publish_result(result).await;
    }

    async fn publish_result(&self, result: ResultEnvelope) {
        publish_with_retry(self.exchange.as_ref(), &self.result_routing_key(), &result).await;
    }

    fn build_context(&self) -> SimContext {
        SimContext::new(
            self.world.clone(),
            self.exchange.clone(),
            self.log_routing_key(),
            self.base_delay_multiplier,
            self.min_delay_seconds,
            self.image_base_url.clone(),
            self.cancel.clone(),
            None,
        )
    }

    /// Cancel every live long-running simulator and wait for in-flight
    /// tasks to finish, bounded by `deadline`.
    pub async fn shutdown(&self, deadline: std::time::Duration) {
        self.cancel.cancel();
        let mut long_tasks = self.long_tasks.lock().await;
        let _ = tokio::time::timeout(deadline, async {
            while long_tasks.join_next().await.is_some() {}
        })
        .await;
        long_tasks.abort_all();
    }
}

/// Run a simulator on its own `tokio` task and join it, translating a
/// panic into a `1002` result instead of letting it vanish with the task
/// (the `JoinSet` in `Dispatcher::shutdown` discards the `JoinError` of
/// anything it aborts or drains, so this is the only place that ever
/// observes one). Used for both the inline short-task path and the
/// long-running path, so both get the same panic-to-result translation.
async fn run_simulator_guarded(
    task_type: TaskType,
    task_id: String,
    params: TaskParams,
    ctx: SimContext,
    robot_id: String,
    cc_interval: f64,
    re_interval: f64,
) -> ResultEnvelope {
    let task_id_for_panic = task_id.clone();
    let join = tokio::spawn(async move {
        simulators::simulate(task_type, &task_id, params, &ctx, &robot_id, cc_interval, re_interval).await
    });
    match join.await {
        Ok(result) => result,
        Err(join_err) => {
            let err = DispatchError::SimulatorPanic(join_err.to_string());
            tracing::error!(task_id = %task_id_for_panic, task_type = %task_type, error = %err, "simulator task panicked");
            ResultEnvelope::failure(task_id_for_panic, err.code(), err.to_string())
        }
    }
}

/// Result-channel publishes are retried once before being logged as a
/// failure; log-channel publishes (via `SimContext::publish_log`)
/// are not retried at all, by the same policy.
async fn publish_with_retry(exchange: &(dyn ExchangeClient), routing_key: &str, result: &ResultEnvelope) {
    let body = match serde_json::to_vec(result) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(task_id = %result.task_id, error = %e, "failed to serialize result envelope");
            return;
        }
    };

    if let Err(first_err) = exchange.publish(routing_key, &body).await {
        tracing::warn!(task_id = %result.task_id, error = %first_err, "result publish failed, retrying once");
        if let Err(second_err) = exchange.publish(routing_key, &body).await {
            log_publish_failure(&result.task_id, &second_err);
        }
    }
}

fn log_publish_failure(task_id: &str, error: &AmqpError) {
    tracing::error!(task_id, error = %error, "result publish failed after retry, giving up");
}
