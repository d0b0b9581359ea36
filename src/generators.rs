//! Pure factories for timing, and image descriptors. Every
//! function here is deterministic modulo the `StdRng` it's handed; none of
//! them touch the world model or the wire.

use crate::types::command::EvaporationProfiles;
use crate::types::CapturedImage;
use chrono::Utc;
use rand::Rng;

/// `max(min_floor, uniform(min, max) * multiplier)`.
pub fn timed_delay(rng: &mut impl Rng, min: f64, max: f64, multiplier: f64, min_floor: f64) -> f64 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    let raw = if (hi - lo).abs() < f64::EPSILON { lo } else { rng.gen_range(lo..hi) };
    (raw * multiplier).max(min_floor)
}

/// CC duration (minutes) is `run_minutes + air_purge_minutes`.
pub fn cc_duration_minutes(run_minutes: f64, air_purge_minutes: f64) -> f64 {
    (run_minutes + air_purge_minutes).max(0.0)
}

/// Evaporation duration (minutes) is the latest `time_from_start` trigger
/// in `profiles.updates`, falling back to 60 minutes if the schedule is
/// empty.
pub fn evaporation_duration_minutes(profiles: &EvaporationProfiles, fallback_minutes: f64) -> f64 {
    profiles
        .updates
        .iter()
        .map(|u| u.time_from_start)
        .fold(None::<f64>, |acc, t| Some(acc.map_or(t, |a: f64| a.max(t))))
        .unwrap_or(fallback_minutes)
}

/// Intermediate publish interval: `configured_interval * multiplier`,
/// floored to `min_floor`.
pub fn intermediate_interval(configured_interval: f64, multiplier: f64, min_floor: f64) -> f64 {
    (configured_interval * multiplier).max(min_floor)
}

/// Scale a long-running task's nominal duration (minutes) down to the
/// number of seconds the simulator actually sleeps, by the same
/// `base_delay_multiplier` every other timing knob uses — without this, a
/// `run_minutes = 30` command would hold its simulator task open for 30
/// real minutes regardless of how aggressively the operator has tuned the
/// multiplier for fast local runs.
pub fn scaled_duration_seconds(duration_minutes: f64, multiplier: f64) -> f64 {
    (duration_minutes * 60.0 * multiplier).max(0.0)
}

/// Build one `CapturedImage` for a single photographed component. The URL
/// is a fabricated string matching `{base}/{workstation}/{device_id}/
/// {component}/{timestamp}.jpg` — no HTTP semantics
/// implied.
pub fn image_descriptor(
    base_url: &str,
    work_station: &str,
    device_id: &str,
    device_type: &str,
    component: &str,
    now: chrono::DateTime<Utc>,
) -> CapturedImage {
    let create_time = now.format("%Y-%m-%d_%H-%M-%S%.3f").to_string();
    let url = format!("{base_url}/{work_station}/{device_id}/{component}/{create_time}.jpg");
    CapturedImage {
        work_station: work_station.to_string(),
        device_id: device_id.to_string(),
        device_type: device_type.to_string(),
        component: component.to_string(),
        url,
        create_time,
    }
}
