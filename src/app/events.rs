//! Outbound application events.
//!
//! The [`VerificationService`](super::service::VerificationService) emits
//! these through the [`EventSink`](super::ports::EventSink) port.
//! Adapters on the other side decide what to do with them: log lines,
//! an overlay, a test recorder.

use crate::fsm::StateId;
use crate::pose::PoseVerdict;

use super::ports::ConfirmationOutcome;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started (carries initial state).
    Started(StateId),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// Per-frame snapshot.
    Status(StatusSnapshot),

    /// A frame was sent for remote confirmation.
    ConfirmationRequested { at_ms: u64 },

    /// The remote confirmation came back.
    ConfirmationResolved(ConfirmationOutcome),

    /// Drinking verified; exactly once per session.
    Verified { at_ms: u64 },

    /// A frame was discarded before assessment.
    FrameDropped { reason: String },
}

/// A point-in-time view of the session, suitable for an overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub state: StateId,
    pub timestamp_ms: u64,
    pub verdict: PoseVerdict,
    /// How long the pose has been held, if it is being held.
    pub held_ms: Option<u64>,
    pub alarm: bool,
    /// Multi-line detector diagnostics.
    pub diagnostics: String,
}
