//! Integration tests driving `Dispatcher::handle` directly against the
//! in-memory `fake` exchange — no broker, no network. Covers the eight
//! concrete scenarios and the invariants of spec section 8 (testable
//! properties): exactly-one-result per command, vanish is truly silent,
//! precondition refusals carry no updates, long-running commands don't
//! block further intake, and the world model reflects a successful
//! simulator's final updates.

use bic_robot_mock::amqp::fake::FakeExchange;
use bic_robot_mock::amqp::ExchangeClient;
use bic_robot_mock::config::AppConfig;
use bic_robot_mock::dispatch::Dispatcher;
use bic_robot_mock::types::{DeviceState, EntityKind, EntityProperties, ResultEnvelope, RobotState};
use bic_robot_mock::world::WorldModel;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Fast timing knobs so long-running simulators finish in well under a
/// second instead of real minutes, deterministic via a fixed seed.
fn fast_config(robot_id: &str) -> AppConfig {
    let mut config = AppConfig { robot_id: robot_id.to_string(), ..Default::default() };
    config.behavior.base_delay_multiplier = 0.001;
    config.behavior.min_delay_seconds = 0.0;
    config.behavior.cc_intermediate_interval_seconds = 2.0;
    config.behavior.re_intermediate_interval_seconds = 2.0;
    config.rng_seed = Some(42);
    config
}

fn harness(robot_id: &str, tweak: impl FnOnce(&mut AppConfig)) -> (Arc<WorldModel>, Arc<FakeExchange>, Dispatcher) {
    let mut config = fast_config(robot_id);
    tweak(&mut config);
    let world = Arc::new(WorldModel::new());
    let exchange = FakeExchange::new();
    let exchange_dyn: Arc<dyn ExchangeClient> = exchange.clone();
    let dispatcher = Dispatcher::new(world.clone(), exchange_dyn, &config, CancellationToken::new());
    (world, exchange, dispatcher)
}

async fn send(dispatcher: &Dispatcher, body: serde_json::Value) {
    dispatcher.handle(&serde_json::to_vec(&body).expect("serialize command")).await;
}

fn only_result(exchange: &FakeExchange, robot_id: &str) -> ResultEnvelope {
    let key = format!("{robot_id}.result");
    let published = exchange.published_on(&key);
    assert_eq!(published.len(), 1, "expected exactly one result on {key}, got {published:?}");
    serde_json::from_slice(&published[0].body).expect("valid result envelope")
}

/// Poll `{robot_id}.result` until a message shows up or `timeout` elapses —
/// long-running commands publish their result from a spawned task, not
/// from the `handle()` call itself.
async fn wait_for_result(exchange: &FakeExchange, robot_id: &str, timeout: Duration) -> ResultEnvelope {
    let key = format!("{robot_id}.result");
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let published = exchange.published_on(&key);
        if !published.is_empty() {
            return serde_json::from_slice(&published[0].body).expect("valid result envelope");
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("no result published on {key} within {timeout:?}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// Scenario 1: reset_state clears the world and returns 200.
#[tokio::test]
async fn scenario_1_reset_state() {
    let (world, exchange, dispatcher) = harness("robot_1", |_| {});
    world
        .upsert(
            EntityKind::Robot,
            "robot_1".to_string(),
            EntityProperties::Robot(Default::default()),
        )
        .await;

    send(&dispatcher, serde_json::json!({"task_id": "r-1", "task_type": "reset_state", "params": {}})).await;

    let result = only_result(&exchange, "robot_1");
    assert_eq!(result.code, 200);
    assert_eq!(result.task_id, "r-1");
    assert!(world.get(EntityKind::Robot, "robot_1").await.is_none());
}

// Scenarios 2 & 3: setup cartridges succeeds once, then the ext-module
// precondition refuses a second attempt at the same workstation.
#[tokio::test]
async fn scenario_2_and_3_setup_cartridges_then_precondition_refusal() {
    let (world, exchange, dispatcher) = harness("robot_2", |_| {});
    let command = serde_json::json!({
        "task_id": "t1",
        "task_type": "setup_tubes_to_column_machine",
        "params": {
            "work_station": "ws_bic_09_fh_001",
            "silica_cartridge_type": "silica_40g",
            "sample_cartridge_id": "sample_40g_001",
            "sample_cartridge_type": "sample_40g",
            "sample_cartridge_location": "bic_09B_l3_002",
        }
    });

    send(&dispatcher, command.clone()).await;
    let result = only_result(&exchange, "robot_2");
    assert_eq!(result.code, 200);
    assert_eq!(result.task_id, "t1");

    let ext_module = world
        .find_by_location(EntityKind::CcsExtModule, "ws_bic_09_fh_001")
        .await
        .expect("ext module present after setup");
    match ext_module.properties {
        EntityProperties::CcsExtModule(p) => assert_eq!(p.state, Some(DeviceState::Using)),
        _ => panic!("wrong variant"),
    }
    let sample = world.get(EntityKind::SampleCartridge, "sample_40g_001").await.expect("sample present");
    match sample.properties {
        EntityProperties::SampleCartridge(p) => {
            assert_eq!(p.location.as_deref(), Some("ws_bic_09_fh_001"));
        }
        _ => panic!("wrong variant"),
    }

    exchange.clear();
    send(&dispatcher, command).await;
    let refusal = only_result(&exchange, "robot_2");
    assert_eq!(refusal.code, 2001);
    assert!(refusal.updates.is_empty());
}

// Scenario 4: setup_tube_rack mounts a tube rack at the workstation.
#[tokio::test]
async fn scenario_4_setup_tube_rack() {
    let (_world, exchange, dispatcher) = harness("robot_4", |_| {});
    send(
        &dispatcher,
        serde_json::json!({
            "task_id": "t4",
            "task_type": "setup_tube_rack",
            "params": {"work_station": "ws_bic_09_fh_001"}
        }),
    )
    .await;

    let result = only_result(&exchange, "robot_4");
    assert_eq!(result.code, 200);
    let tube_rack = result
        .updates
        .iter()
        .find(|u| matches!(u, bic_robot_mock::types::EntityUpdate::TubeRack { .. }))
        .expect("tube rack update present");
    if let bic_robot_mock::types::EntityUpdate::TubeRack { properties, .. } = tube_rack {
        assert_eq!(properties.state, Some(bic_robot_mock::types::TubeRackState::Inuse));
        assert_eq!(properties.description.as_deref(), Some("mounted"));
    }
}

// Scenario 6: take_photo with one component returns one image whose URL
// contains the device id and the component name.
#[tokio::test]
async fn scenario_6_take_photo_one_component() {
    let (_world, exchange, dispatcher) = harness("robot_6", |_| {});
    send(
        &dispatcher,
        serde_json::json!({
            "task_id": "t6",
            "task_type": "take_photo",
            "params": {
                "work_station": "ws_re",
                "device_id": "re-buchi-r180_001",
                "device_type": "evaporator",
                "components": ["screen"],
            }
        }),
    )
    .await;

    let result = only_result(&exchange, "robot_6");
    assert_eq!(result.code, 200);
    let images = result.images.expect("images present");
    assert_eq!(images.len(), 1);
    assert!(images[0].url.contains("re-buchi-r180_001"));
    assert!(images[0].url.contains("screen"));
}

// Boundary: take_photo with no components still succeeds with zero images.
#[tokio::test]
async fn take_photo_with_empty_components_returns_200_with_no_images() {
    let (_world, exchange, dispatcher) = harness("robot_6b", |_| {});
    send(
        &dispatcher,
        serde_json::json!({
            "task_id": "t6b",
            "task_type": "take_photo",
            "params": {"work_station": "ws_re", "device_id": "re-buchi-r180_001", "components": []}
        }),
    )
    .await;

    let result = only_result(&exchange, "robot_6b");
    assert_eq!(result.code, 200);
    assert!(result.images.is_none());
}

// Scenario 5 + invariant: start_column_chromatography is long-running —
// at least two log messages precede the final result, which still shows
// up, and another command can be accepted and completed while it runs.
#[tokio::test]
async fn scenario_5_start_cc_streams_logs_then_completes() {
    let (world, exchange, dispatcher) = harness("robot_5", |_| {});

    // Preconditions for start_cc: machine idle, both cartridges + tube
    // rack inuse at the workstation.
    seed_cc_ready(&world, "ws_cc").await;

    send(
        &dispatcher,
        serde_json::json!({
            "task_id": "t5",
            "task_type": "start_column_chromatography",
            "params": {"work_station": "ws_cc", "run_minutes": 30.0, "air_purge_minutes": 0.0}
        }),
    )
    .await;

    // Long-running: another command is accepted and completed while t5 is
    // still in flight.
    send(
        &dispatcher,
        serde_json::json!({
            "task_id": "t5-other",
            "task_type": "setup_tube_rack",
            "params": {"work_station": "ws_other"}
        }),
    )
    .await;
    let other_result = only_result(&exchange, "robot_5");
    assert_eq!(other_result.task_id, "t5-other");

    let result = wait_for_result(&exchange, "robot_5", Duration::from_secs(5)).await;
    assert_eq!(result.task_id, "t5");
    assert_eq!(result.code, 200);

    let logs = exchange.published_on("robot_5.log");
    let machine_logs = logs
        .iter()
        .filter(|p| {
            serde_json::from_slice::<ResultEnvelope>(&p.body)
                .ok()
                .map(|e| e.updates.iter().any(|u| matches!(u, bic_robot_mock::types::EntityUpdate::ColumnChromatographyMachine { .. })))
                .unwrap_or(false)
        })
        .count();
    assert!(machine_logs >= 2, "expected at least two machine log updates, got {machine_logs}");

    let machine = world.find_by_location(EntityKind::ColumnChromatographyMachine, "ws_cc").await.expect("machine present");
    match machine.properties {
        EntityProperties::ColumnChromatographyMachine(p) => assert_eq!(p.state, Some(DeviceState::Using)),
        _ => panic!("wrong variant"),
    }
}

// Boundary: run_minutes = 0 skips the intermediate-tick phase but still
// runs the initial and final phases.
#[tokio::test]
async fn start_cc_with_zero_run_minutes_skips_intermediate_phase() {
    let (world, exchange, dispatcher) = harness("robot_5b", |_| {});
    seed_cc_ready(&world, "ws_cc").await;

    send(
        &dispatcher,
        serde_json::json!({
            "task_id": "t5b",
            "task_type": "start_column_chromatography",
            "params": {"work_station": "ws_cc", "run_minutes": 0.0, "air_purge_minutes": 0.0}
        }),
    )
    .await;

    let result = wait_for_result(&exchange, "robot_5b", Duration::from_secs(2)).await;
    assert_eq!(result.code, 200);

    let logs = exchange.published_on("robot_5b.log");
    // Phase 1 publishes exactly 5 log entries (robot + machine + 3
    // materials); with run_minutes = 0 there is no phase-2 tick to add to
    // that count.
    assert_eq!(logs.len(), 5, "zero-duration run should not publish any intermediate ticks");
}

// Scenario 7: failure_rate = 1.0 — every command fails within its band and
// carries no updates.
#[tokio::test]
async fn scenario_7_forced_failure_carries_no_updates() {
    let (_world, exchange, dispatcher) = harness("robot_7", |c| {
        c.behavior.failure_rate = 1.0;
    });

    send(
        &dispatcher,
        serde_json::json!({
            "task_id": "t7",
            "task_type": "setup_tube_rack",
            "params": {"work_station": "ws_1"}
        }),
    )
    .await;

    let result = only_result(&exchange, "robot_7");
    assert!((1020..1030).contains(&result.code), "code {} not in setup_tube_rack's band", result.code);
    assert!(result.updates.is_empty());
}

// Scenario 8: timeout_rate = 1.0 — no output on any routing key, and the
// world model is left untouched.
#[tokio::test]
async fn scenario_8_forced_timeout_is_silent() {
    let (world, exchange, dispatcher) = harness("robot_8", |c| {
        c.behavior.timeout_rate = 1.0;
    });

    send(
        &dispatcher,
        serde_json::json!({
            "task_id": "t8",
            "task_type": "setup_tube_rack",
            "params": {"work_station": "ws_1"}
        }),
    )
    .await;

    assert!(exchange.published_on("robot_8.result").is_empty());
    assert!(exchange.published_on("robot_8.log").is_empty());
    assert!(world.find_by_location(EntityKind::TubeRack, "ws_1").await.is_none());
}

// Precondition invariant: failing a precondition never mutates the world
// and never advances to the simulator.
#[tokio::test]
async fn precondition_refusal_never_mutates_world() {
    let (world, exchange, dispatcher) = harness("robot_9", |_| {});

    send(
        &dispatcher,
        serde_json::json!({
            "task_id": "t9",
            "task_type": "start_column_chromatography",
            "params": {"work_station": "ws_missing", "run_minutes": 5.0, "air_purge_minutes": 0.0}
        }),
    )
    .await;

    let result = only_result(&exchange, "robot_9");
    assert!((2000..2100).contains(&result.code));
    assert!(result.updates.is_empty());
    assert!(world.find_by_location(EntityKind::ColumnChromatographyMachine, "ws_missing").await.is_none());
}

// Unknown task_type short-circuits to 1000 before the scenario selector
// would otherwise run.
#[tokio::test]
async fn unknown_task_type_yields_1000() {
    let (_world, exchange, dispatcher) = harness("robot_10", |_| {});
    send(
        &dispatcher,
        serde_json::json!({"task_id": "t10", "task_type": "levitate_robot", "params": {}}),
    )
    .await;
    let result = only_result(&exchange, "robot_10");
    assert_eq!(result.code, 1000);
}

// Malformed envelope (missing required fields) yields 1001.
#[tokio::test]
async fn malformed_envelope_yields_1001() {
    let (_world, exchange, dispatcher) = harness("robot_11", |_| {});
    dispatcher.handle(br#"{"not_a_task_id": true}"#).await;
    let published = exchange.published_on("robot_11.result");
    assert_eq!(published.len(), 1);
    let result: ResultEnvelope = serde_json::from_slice(&published[0].body).expect("valid result envelope");
    assert_eq!(result.code, 1001);
}

// A simulator task that panics (here, forced by a delay multiplier extreme
// enough to overflow the sampled delay into a `Duration::from_secs_f64`
// panic) still yields exactly one result, coded 1002, instead of the
// command being silently dropped.
#[tokio::test]
async fn simulator_panic_yields_1002() {
    let (_world, exchange, dispatcher) = harness("robot_13", |c| {
        c.behavior.base_delay_multiplier = f64::MAX;
    });
    send(
        &dispatcher,
        serde_json::json!({
            "task_id": "t13",
            "task_type": "setup_tube_rack",
            "params": {"work_station": "ws_1"}
        }),
    )
    .await;
    let result = only_result(&exchange, "robot_13");
    assert_eq!(result.code, 1002);
    assert!(result.updates.is_empty());
}

// Boundary: collect_fractions with an all-false collect_config still runs
// the 10s floor and still emits chute/flask updates.
#[tokio::test]
async fn collect_fractions_all_zero_config_still_emits_updates() {
    let (world, exchange, dispatcher) = harness("robot_12", |c| {
        c.behavior.base_delay_multiplier = 0.01;
    });
    seed_cc_terminated(&world, "ws_cc").await;

    send(
        &dispatcher,
        serde_json::json!({
            "task_id": "t12",
            "task_type": "collect_fractions",
            "params": {"work_station": "ws_cc", "collect_config": [false, false, false]}
        }),
    )
    .await;

    let result = only_result(&exchange, "robot_12");
    assert_eq!(result.code, 200);
    let has_flask = result.updates.iter().any(|u| matches!(u, bic_robot_mock::types::EntityUpdate::RoundBottomFlask { .. }));
    let has_left_chute = result.updates.iter().any(|u| matches!(u, bic_robot_mock::types::EntityUpdate::PccLeftChute { .. }));
    let has_right_chute = result.updates.iter().any(|u| matches!(u, bic_robot_mock::types::EntityUpdate::PccRightChute { .. }));
    assert!(has_flask && has_left_chute && has_right_chute);
}

// Heartbeat: publishes at the configured interval and reflects current
// robot state (unit-style check via the public heartbeat::run API, run for
// a couple of ticks then cancelled).
#[tokio::test]
async fn heartbeat_reflects_world_state_and_stops_on_cancel() {
    let world = Arc::new(WorldModel::new());
    world
        .upsert(
            EntityKind::Robot,
            "robot_hb".to_string(),
            EntityProperties::Robot(bic_robot_mock::types::RobotProperties {
                state: Some(RobotState::Charging),
                location: None,
                description: None,
            }),
        )
        .await;
    let exchange = FakeExchange::new();
    let exchange_dyn: Arc<dyn ExchangeClient> = exchange.clone();
    let cancel = CancellationToken::new();

    let cancel_clone = cancel.clone();
    let world_clone = world.clone();
    let handle = tokio::spawn(async move {
        bic_robot_mock::heartbeat::run(world_clone, exchange_dyn, "robot_hb".to_string(), 0.02, cancel_clone).await;
    });

    tokio::time::sleep(Duration::from_millis(90)).await;
    cancel.cancel();
    handle.await.expect("heartbeat task join");

    let published = exchange.published_on("robot_hb.hb");
    assert!(published.len() >= 2, "expected multiple heartbeat ticks, got {}", published.len());
    let last: bic_robot_mock::types::Heartbeat = serde_json::from_slice(&published.last().unwrap().body).expect("valid heartbeat");
    assert_eq!(last.state, RobotState::Charging);
}

async fn seed_cc_ready(world: &WorldModel, work_station: &str) {
    use bic_robot_mock::types::{CartridgeProperties, CartridgeState, CcMachineProperties, TubeRackProperties, TubeRackState};
    world
        .upsert(
            EntityKind::ColumnChromatographyMachine,
            format!("cc_machine_{work_station}"),
            EntityProperties::ColumnChromatographyMachine(CcMachineProperties {
                state: Some(DeviceState::Idle),
                location: Some(work_station.to_string()),
                ..Default::default()
            }),
        )
        .await;
    world
        .upsert(
            EntityKind::SilicaCartridge,
            format!("{work_station}_silica"),
            EntityProperties::SilicaCartridge(CartridgeProperties {
                state: Some(CartridgeState::Inuse),
                location: Some(work_station.to_string()),
                description: None,
            }),
        )
        .await;
    world
        .upsert(
            EntityKind::SampleCartridge,
            format!("{work_station}_sample"),
            EntityProperties::SampleCartridge(CartridgeProperties {
                state: Some(CartridgeState::Inuse),
                location: Some(work_station.to_string()),
                description: None,
            }),
        )
        .await;
    world
        .upsert(
            EntityKind::TubeRack,
            "tube_rack_001".to_string(),
            EntityProperties::TubeRack(TubeRackProperties {
                state: Some(TubeRackState::Inuse),
                location: Some(work_station.to_string()),
                description: None,
            }),
        )
        .await;
}

async fn seed_cc_terminated(world: &WorldModel, work_station: &str) {
    use bic_robot_mock::types::{CcMachineProperties, TubeRackProperties, TubeRackState};
    world
        .upsert(
            EntityKind::ColumnChromatographyMachine,
            format!("cc_machine_{work_station}"),
            EntityProperties::ColumnChromatographyMachine(CcMachineProperties {
                state: Some(DeviceState::Idle),
                location: Some(work_station.to_string()),
                ..Default::default()
            }),
        )
        .await;
    world
        .upsert(
            EntityKind::TubeRack,
            "tube_rack_001".to_string(),
            EntityProperties::TubeRack(TubeRackProperties {
                state: Some(TubeRackState::Contaminated),
                location: Some(work_station.to_string()),
                description: Some("used".to_string()),
            }),
        )
        .await;
}
