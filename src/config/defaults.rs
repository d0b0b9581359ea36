//! Built-in default constants, used when neither a config file nor an
//! environment override supplies a value. Grouped by subsystem.

// ============================================================================
// Broker
// ============================================================================

pub const BROKER_HOST: &str = "localhost";
pub const BROKER_PORT: u16 = 5672;
pub const BROKER_USER: &str = "guest";
pub const BROKER_PASSWORD: &str = "guest";
pub const BROKER_VHOST: &str = "/";
pub const BROKER_EXCHANGE: &str = "robot.exchange";
pub const BROKER_CONNECTION_TIMEOUT_SECS: u64 = 10;
pub const BROKER_AMQP_HEARTBEAT_SECS: u16 = 60;
pub const BROKER_PREFETCH: u16 = 5;

// ============================================================================
// Identity
// ============================================================================

pub const ROBOT_ID: &str = "robot_001";

// ============================================================================
// Behavior
// ============================================================================

pub const FAILURE_RATE: f64 = 0.0;
pub const TIMEOUT_RATE: f64 = 0.0;
pub const BASE_DELAY_MULTIPLIER: f64 = 1.0;
pub const MIN_DELAY_SECONDS: f64 = 0.0;
pub const IMAGE_BASE_URL: &str = "https://images.bic-lab.internal";
pub const HEARTBEAT_INTERVAL_SECONDS: f64 = 2.0;
pub const CC_INTERMEDIATE_INTERVAL_SECONDS: f64 = 30.0;
pub const RE_INTERMEDIATE_INTERVAL_SECONDS: f64 = 30.0;

// ============================================================================
// Shutdown
// ============================================================================

/// How long the supervisor waits for in-flight short simulators to finish
/// before cancelling everything unconditionally.
pub const SHUTDOWN_DEADLINE_SECS: u64 = 10;

// ============================================================================
// Fallbacks used by generators
// ============================================================================

/// Fallback evaporation duration when no `profiles.updates` trigger is
/// present in the command params (minutes).
pub const EVAPORATION_FALLBACK_MINUTES: f64 = 60.0;
