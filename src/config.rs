//! Application configuration parameters
//!
//! All tunable parameters for drink verification, reminders and cycle
//! prediction. Values can be overridden through the config store.

use serde::{Deserialize, Serialize};

/// Object labels that plausibly hold a drink.
pub const CONTAINER_LABELS: [&str; 11] = [
    "Bottle",
    "Water bottle",
    "Cup",
    "Mug",
    "Drink",
    "Beverage",
    "Food",
    "Tableware",
    "Container",
    "Plastic",
    "Cylinder",
];

/// Core application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    // --- Pose ---
    /// Minimum head pitch (degrees, looking up is positive) for a drinking pose
    pub required_tilt_deg: f32,
    /// Maximum mouth-to-object-centre distance (pixels)
    pub distance_threshold_px: f32,
    /// Only count objects whose label matches a known container
    pub require_container_label: bool,
    /// Label substrings accepted when `require_container_label` is set
    pub container_labels: Vec<String>,

    // --- Debounce ---
    /// Continuous valid-pose duration before the remote check (milliseconds)
    pub required_duration_ms: u32,
    /// Invalid-frame tolerance before the accumulated duration resets (milliseconds)
    pub grace_period_ms: u32,

    // --- Confirmation ---
    /// Credit the user when the remote check errors out
    pub accept_on_confirmation_error: bool,
    /// Generative model used for the remote check
    pub confirmation_model: String,
    /// Remote check request timeout (seconds)
    pub confirmation_timeout_secs: u32,

    // --- Alarm ---
    /// Interval between alert tones in alarm mode (milliseconds)
    pub alarm_interval_ms: u32,

    // --- Reminders ---
    /// Hydration reminder interval (seconds)
    pub hydration_interval_secs: u32,
    /// Delay before the first hydration reminder (seconds)
    pub hydration_initial_delay_secs: u32,
    /// Period check interval (seconds)
    pub period_check_interval_secs: u32,
    /// Hour (0-23) at which reminder quiet hours begin
    pub quiet_start_hour: u8,
    /// Hour (0-23) at which reminder quiet hours end
    pub quiet_end_hour: u8,

    // --- Cycle ---
    /// Assumed menstrual cycle length (days)
    pub cycle_length_days: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            // Pose
            required_tilt_deg: 10.0,
            distance_threshold_px: 350.0,
            require_container_label: false,
            container_labels: CONTAINER_LABELS.iter().map(|l| (*l).to_string()).collect(),

            // Debounce
            required_duration_ms: 2000,
            grace_period_ms: 500,

            // Confirmation
            accept_on_confirmation_error: true,
            confirmation_model: "gemini-1.5-flash".to_string(),
            confirmation_timeout_secs: 30,

            // Alarm
            alarm_interval_ms: 1000,

            // Reminders
            hydration_interval_secs: 30 * 60,
            hydration_initial_delay_secs: 30 * 60,
            period_check_interval_secs: 6 * 60 * 60,
            quiet_start_hour: 22,
            quiet_end_hour: 10,

            // Cycle
            cycle_length_days: 28,
        }
    }
}

impl AppConfig {
    /// Range-check every field. Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(0.0..=60.0).contains(&self.required_tilt_deg) {
            return Err("required_tilt_deg must be 0.0–60.0");
        }
        if !(10.0..=2000.0).contains(&self.distance_threshold_px) {
            return Err("distance_threshold_px must be 10.0–2000.0");
        }
        if self.require_container_label && self.container_labels.is_empty() {
            return Err("container_labels must not be empty when labels are required");
        }
        if !(100..=30_000).contains(&self.required_duration_ms) {
            return Err("required_duration_ms must be 100–30000");
        }
        if self.grace_period_ms > 5000 {
            return Err("grace_period_ms must be 0–5000");
        }
        if self.grace_period_ms >= self.required_duration_ms {
            return Err("grace_period_ms must be < required_duration_ms");
        }
        if self.confirmation_model.trim().is_empty() {
            return Err("confirmation_model must not be empty");
        }
        if !(1..=300).contains(&self.confirmation_timeout_secs) {
            return Err("confirmation_timeout_secs must be 1–300");
        }
        if !(200..=10_000).contains(&self.alarm_interval_ms) {
            return Err("alarm_interval_ms must be 200–10000");
        }
        if !(60..=86_400).contains(&self.hydration_interval_secs) {
            return Err("hydration_interval_secs must be 60–86400");
        }
        if self.hydration_initial_delay_secs > 86_400 {
            return Err("hydration_initial_delay_secs must be 0–86400");
        }
        if !(900..=86_400).contains(&self.period_check_interval_secs) {
            return Err("period_check_interval_secs must be 900–86400");
        }
        if self.quiet_start_hour > 23 || self.quiet_end_hour > 23 {
            return Err("quiet hours must be 0–23");
        }
        if !(20..=45).contains(&self.cycle_length_days) {
            return Err("cycle_length_days must be 20–45");
        }
        Ok(())
    }
}
