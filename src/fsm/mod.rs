//! Function-pointer finite state machine engine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  StateTable                                                  │
//! │  ┌───────────┬───────────┬──────────┬───────────────────┐    │
//! │  │ StateId   │ on_enter  │ on_exit  │ on_update         │    │
//! │  ├───────────┼───────────┼──────────┼───────────────────┤    │
//! │  │ Watching  │ fn(ctx)   │ —        │ fn(ctx)->Option<> │    │
//! │  │ Candidate │ fn(ctx)   │ —        │ fn(ctx)->Option<> │    │
//! │  │ AiPending │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │    │
//! │  │ Verified  │ fn(ctx)   │ —        │ fn(ctx)->Option<> │    │
//! │  └───────────┴───────────┴──────────┴───────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer.  All functions receive `&mut FsmContext` which
//! holds the frame verdict, validity timer, confirmation outcome and
//! config.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all verification states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Watching = 0,
    Candidate = 1,
    AiPending = 2,
    Verified = 3,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 4;

    /// Convert an index back to `StateId`.  Asserts in debug builds;
    /// returns `Watching` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Watching,
            1 => Self::Candidate,
            2 => Self::AiPending,
            3 => Self::Verified,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Watching
            }
        }
    }

    /// Short status line for overlays.
    pub fn status_line(self) -> &'static str {
        match self {
            Self::Watching => "STATUS: Watching...",
            Self::Candidate => "DRINKING",
            Self::AiPending => "Verifying with AI...",
            Self::Verified => "Verified!",
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut FsmContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns the state table (array of [`StateDescriptor`]) and threads a
/// mutable [`FsmContext`] through every handler call.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Monotonically increasing tick counter.
    tick_count: u64,
    /// Tick at which the current state was entered.
    state_entry_tick: u64,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick.
    ///
    /// 1. Call `on_update` for the current state.
    /// 2. If it returns `Some(next)`, execute the transition:
    ///    `on_exit(current)` → update pointer → `on_enter(next)`.
    /// 3. Increment tick counter.
    pub fn tick(&mut self, ctx: &mut FsmContext) {
        self.tick_count += 1;
        ctx.ticks_in_state = self.tick_count - self.state_entry_tick;
        ctx.total_ticks = self.tick_count;

        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Force an immediate transition regardless of what `on_update`
    /// would return (restart commands, debugging).
    pub fn force_transition(&mut self, next: StateId, ctx: &mut FsmContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        self.table[self.current].id
    }

    /// How many ticks the FSM has been in the current state.
    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut FsmContext) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.state_entry_tick = self.tick_count;
        ctx.ticks_in_state = 0;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::context::FsmContext;
    use super::*;
    use crate::app::ports::ConfirmationOutcome;
    use crate::config::AppConfig;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Step {
        Frame { valid: bool, dt: u64 },
        Outcome(u8),
    }

    fn arb_step() -> impl Strategy<Value = Step> {
        prop_oneof![
            4 => (any::<bool>(), 1u64..700).prop_map(|(valid, dt)| Step::Frame { valid, dt }),
            1 => (0u8..4).prop_map(Step::Outcome),
        ]
    }

    fn outcome(code: u8) -> ConfirmationOutcome {
        match code {
            0 => ConfirmationOutcome::Confirmed,
            1 => ConfirmationOutcome::Rejected,
            2 => ConfirmationOutcome::CaptureFailed,
            _ => ConfirmationOutcome::Failed("boom".into()),
        }
    }

    proptest! {
        /// Verified is reached at most once and never left; AiPending is only
        /// entered from Candidate after the pose has been held long enough.
        #[test]
        fn verified_is_absorbing(steps in proptest::collection::vec(arb_step(), 1..300)) {
            let mut fsm = Fsm::new(states::build_state_table(), StateId::Watching);
            let mut ctx = FsmContext::new(AppConfig::default());
            fsm.start(&mut ctx);
            let mut now = 0u64;
            let mut verified_entries = 0u32;

            for step in steps {
                let before = fsm.current_state();
                match step {
                    Step::Frame { valid, dt } => {
                        now += dt;
                        ctx.now_ms = now;
                        ctx.frame_valid = Some(valid);
                        ctx.validity.observe(valid, now);
                    }
                    Step::Outcome(code) => {
                        ctx.frame_valid = None;
                        if before == StateId::AiPending {
                            ctx.confirmation = Some(outcome(code));
                        }
                    }
                }
                fsm.tick(&mut ctx);
                let after = fsm.current_state();

                if before == StateId::Verified {
                    prop_assert_eq!(after, StateId::Verified);
                }
                if before != StateId::Verified && after == StateId::Verified {
                    verified_entries += 1;
                }
                if before != StateId::AiPending && after == StateId::AiPending {
                    prop_assert_eq!(before, StateId::Candidate);
                    prop_assert!(ctx.held_ms().unwrap_or(0) >= 2000);
                }
            }
            prop_assert!(verified_entries <= 1);
        }
    }
}
