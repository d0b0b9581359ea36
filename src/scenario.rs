//! Scenario selector: per-command decision of `success | fail | vanish`
//!, plus the task-keyed failure descriptor table used when the
//! decision is `fail`.

use crate::types::TaskType;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The configured default outcome when neither `timeout_rate` nor
/// `failure_rate` fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    Success,
    Failure,
    Timeout,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::Success
    }
}

/// A single `(code, message)` failure descriptor within a task's 10-wide
/// band.
#[derive(Debug, Clone)]
pub struct FailureEntry {
    pub code: u32,
    pub msg: &'static str,
}

/// Draws a uniform `[0,1)` for timeout, then (if not timed out) another for
/// failure — timeout is checked first deliberately, so `timeout_rate = 1.0`
/// is silent regardless of `failure_rate`.
pub struct ScenarioSelector {
    rng: StdRng,
    failure_rate: f64,
    timeout_rate: f64,
    default_scenario: Scenario,
    failure_table: HashMap<TaskType, Vec<FailureEntry>>,
}

impl ScenarioSelector {
    pub fn new(seed: Option<u64>, failure_rate: f64, timeout_rate: f64, default_scenario: Scenario) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, failure_rate, timeout_rate, default_scenario, failure_table: build_failure_table() }
    }

    pub fn decide(&mut self) -> Scenario {
        if self.rng.gen::<f64>() < self.timeout_rate {
            return Scenario::Timeout;
        }
        if self.rng.gen::<f64>() < self.failure_rate {
            return Scenario::Failure;
        }
        self.default_scenario
    }

    /// Pick one `(code, msg)` uniformly from `task`'s failure band. Falls
    /// back to a single generic entry at the band's first code if a task
    /// somehow has no table entries (defensive; `build_failure_table`
    /// always populates every `TaskType`).
    pub fn pick_failure(&mut self, task: TaskType) -> (u32, String) {
        let entries = self.failure_table.get(&task).filter(|v| !v.is_empty());
        match entries {
            Some(entries) => {
                let idx = self.rng.gen_range(0..entries.len());
                let entry = &entries[idx];
                (entry.code, entry.msg.to_string())
            }
            None => (task.failure_band_start(), format!("{task} failed")),
        }
    }
}

fn build_failure_table() -> HashMap<TaskType, Vec<FailureEntry>> {
    let mut table = HashMap::new();
    table.insert(
        TaskType::SetupTubesToColumnMachine,
        vec![
            FailureEntry { code: 1010, msg: "ccs ext module did not respond" },
            FailureEntry { code: 1011, msg: "cartridge feed jammed" },
        ],
    );
    table.insert(
        TaskType::SetupTubeRack,
        vec![
            FailureEntry { code: 1020, msg: "tube rack gripper fault" },
            FailureEntry { code: 1021, msg: "tube rack not detected after mount" },
        ],
    );
    table.insert(
        TaskType::TakePhoto,
        vec![
            FailureEntry { code: 1030, msg: "camera device unreachable" },
            FailureEntry { code: 1031, msg: "image capture timed out" },
        ],
    );
    table.insert(
        TaskType::StartColumnChromatography,
        vec![
            FailureEntry { code: 1040, msg: "column chromatography machine fault" },
            FailureEntry { code: 1041, msg: "pressure sensor out of range" },
        ],
    );
    table.insert(
        TaskType::TerminateColumnChromatography,
        vec![
            FailureEntry { code: 1050, msg: "termination sequence aborted" },
            FailureEntry { code: 1051, msg: "machine did not acknowledge stop" },
        ],
    );
    table.insert(
        TaskType::CollectFractions,
        vec![
            FailureEntry { code: 1060, msg: "pcc chute positioning fault" },
            FailureEntry { code: 1061, msg: "flask handoff failed" },
        ],
    );
    table.insert(
        TaskType::StartEvaporation,
        vec![
            FailureEntry { code: 1070, msg: "evaporator heating fault" },
            FailureEntry { code: 1071, msg: "vacuum pump fault" },
        ],
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_rate_one_always_times_out_regardless_of_failure_rate() {
        let mut selector = ScenarioSelector::new(Some(1), 1.0, 1.0, Scenario::Success);
        for _ in 0..20 {
            assert_eq!(selector.decide(), Scenario::Timeout);
        }
    }

    #[test]
    fn zero_rates_always_yield_default_scenario() {
        let mut selector = ScenarioSelector::new(Some(2), 0.0, 0.0, Scenario::Success);
        for _ in 0..20 {
            assert_eq!(selector.decide(), Scenario::Success);
        }
    }

    #[test]
    fn picked_failure_is_within_the_task_band() {
        let mut selector = ScenarioSelector::new(Some(3), 0.0, 0.0, Scenario::Success);
        let (code, _msg) = selector.pick_failure(TaskType::StartEvaporation);
        assert!((1070..1080).contains(&code));
    }
}
