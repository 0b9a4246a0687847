//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to.  It contains the latest frame verdict, the validity timer,
//! any confirmation outcome delivered since the last tick, the command
//! outputs the service acts on, and the configuration.

use crate::app::ports::ConfirmationOutcome;
use crate::config::AppConfig;
use crate::pose::ValidityTimer;

// ---------------------------------------------------------------------------
// Commands (written by state handlers; consumed by the service)
// ---------------------------------------------------------------------------

/// Requests that state handlers raise for the service to carry out
/// after the tick.  The service clears each flag once acted upon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerificationCommands {
    /// Send the triggering frame to the remote confirmation.
    pub request_confirmation: bool,
    /// Write one intake record.
    pub record_intake: bool,
    /// Play the success tone.
    pub play_success: bool,
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Timing --
    /// Ticks elapsed since the current state was entered.
    pub ticks_in_state: u64,
    /// Monotonic total tick count.
    pub total_ticks: u64,
    /// Timestamp of the frame (or poll) driving the current tick.
    pub now_ms: u64,

    // -- Frame data --
    /// Verdict of the frame processed this tick; `None` when the tick
    /// carries no new frame (confirmation poll only).
    pub frame_valid: Option<bool>,
    /// Grace-tolerant run of valid frames.
    pub validity: ValidityTimer,

    // -- Remote confirmation --
    /// Outcome delivered since the last tick, consumed by the handler.
    pub confirmation: Option<ConfirmationOutcome>,

    // -- Outputs --
    pub commands: VerificationCommands,
    /// Set once, on entering `Verified`.
    pub verified_at_ms: Option<u64>,

    // -- Configuration --
    pub config: AppConfig,
}

impl FsmContext {
    /// Create a new context with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self {
            ticks_in_state: 0,
            total_ticks: 0,
            now_ms: 0,
            frame_valid: None,
            validity: ValidityTimer::new(config.grace_period_ms),
            confirmation: None,
            commands: VerificationCommands::default(),
            verified_at_ms: None,
            config,
        }
    }

    /// Milliseconds the drinking pose has been held, if it is being held.
    pub fn held_ms(&self) -> Option<u64> {
        self.validity.held_ms(self.now_ms)
    }

    /// `true` when this tick's frame is valid and the pose has been held
    /// for at least the configured duration.
    pub fn pose_confirmed_locally(&self) -> bool {
        self.frame_valid == Some(true)
            && self
                .held_ms()
                .is_some_and(|held| held >= u64::from(self.config.required_duration_ms))
    }

    /// Swap in a new configuration, keeping the in-flight timer run.
    pub fn apply_config(&mut self, config: AppConfig) {
        self.validity.set_grace_period(config.grace_period_ms);
        self.config = config;
    }
}
