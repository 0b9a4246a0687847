//! Concrete state handler functions and table builder.
//!
//! Each state is defined by three plain `fn` pointers: no closures, no
//! dynamic dispatch.
//!
//! ```text
//!  WATCHING ──[valid frame]──▶ CANDIDATE
//!     ▲  ▲                        │   │
//!     │  └────[grace expired]─────┘   │ [held ≥ required]
//!     │                               ▼
//!     └──[rejected / no image]─── AI_PENDING ──[confirmed / error]──▶ VERIFIED
//! ```

use super::context::FsmContext;
use super::{StateDescriptor, StateId};
use crate::app::ports::ConfirmationOutcome;
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the state table.  Called once per verification session.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Watching
        StateDescriptor {
            id: StateId::Watching,
            name: "Watching",
            on_enter: Some(watching_enter),
            on_exit: None,
            on_update: watching_update,
        },
        // Index 1: Candidate
        StateDescriptor {
            id: StateId::Candidate,
            name: "Candidate",
            on_enter: Some(candidate_enter),
            on_exit: None,
            on_update: candidate_update,
        },
        // Index 2: AiPending
        StateDescriptor {
            id: StateId::AiPending,
            name: "AiPending",
            on_enter: Some(ai_pending_enter),
            on_exit: Some(ai_pending_exit),
            on_update: ai_pending_update,
        },
        // Index 3: Verified
        StateDescriptor {
            id: StateId::Verified,
            name: "Verified",
            on_enter: Some(verified_enter),
            on_exit: None,
            on_update: verified_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  WATCHING: no pose held
// ═══════════════════════════════════════════════════════════════════════════

fn watching_enter(ctx: &mut FsmContext) {
    ctx.validity.reset();
    ctx.commands.request_confirmation = false;
}

fn watching_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.validity.is_accumulating() {
        return Some(StateId::Candidate);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  CANDIDATE: pose held, waiting for the duration threshold
// ═══════════════════════════════════════════════════════════════════════════

fn candidate_enter(ctx: &mut FsmContext) {
    info!(
        "Candidate: pose detected, need {}ms",
        ctx.config.required_duration_ms
    );
}

fn candidate_update(ctx: &mut FsmContext) -> Option<StateId> {
    if !ctx.validity.is_accumulating() {
        info!("Candidate: pose lost past grace period");
        return Some(StateId::Watching);
    }

    if ctx.pose_confirmed_locally() {
        return Some(StateId::AiPending);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  AI_PENDING: one remote confirmation outstanding
// ═══════════════════════════════════════════════════════════════════════════

fn ai_pending_enter(ctx: &mut FsmContext) {
    info!(
        "AiPending: pose held {}ms, requesting remote confirmation",
        ctx.held_ms().unwrap_or(0)
    );
    ctx.confirmation = None;
    ctx.commands.request_confirmation = true;
}

fn ai_pending_exit(ctx: &mut FsmContext) {
    ctx.commands.request_confirmation = false;
}

fn ai_pending_update(ctx: &mut FsmContext) -> Option<StateId> {
    match ctx.confirmation.take()? {
        ConfirmationOutcome::Confirmed => Some(StateId::Verified),
        ConfirmationOutcome::Rejected => {
            info!("AiPending: remote check says not drinking");
            Some(StateId::Watching)
        }
        ConfirmationOutcome::CaptureFailed => {
            warn!("AiPending: no image for the triggering frame");
            Some(StateId::Watching)
        }
        ConfirmationOutcome::Failed(reason) => {
            if ctx.config.accept_on_confirmation_error {
                warn!("AiPending: remote check failed ({}), accepting", reason);
                Some(StateId::Verified)
            } else {
                warn!("AiPending: remote check failed ({}), retrying", reason);
                Some(StateId::Watching)
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  VERIFIED: terminal for the session
// ═══════════════════════════════════════════════════════════════════════════

fn verified_enter(ctx: &mut FsmContext) {
    info!("Verified: drinking confirmed at {}ms", ctx.now_ms);
    ctx.verified_at_ms = Some(ctx.now_ms);
    ctx.commands.record_intake = true;
    ctx.commands.play_success = true;
}

fn verified_update(_ctx: &mut FsmContext) -> Option<StateId> {
    None
}
