//! Inbound commands to the verification service.
//!
//! These represent actions requested by the outside world (CLI, a
//! tapped reminder, a config import) that the
//! [`VerificationService`](super::service::VerificationService)
//! interprets and acts upon.

use crate::config::AppConfig;
use crate::fsm::StateId;

/// Commands that adapters can send into the application core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Start over in Watching; any verification is forgotten.
    Restart,

    /// Turn the repeating alert tone on or off.
    SetAlarm(bool),

    /// Force the FSM into a specific state (debug / testing only).
    ForceState(StateId),

    /// Hot-reload configuration.
    UpdateConfig(AppConfig),
}
