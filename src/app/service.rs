//! Verification service, the hexagonal core.
//!
//! [`VerificationService`] owns the FSM and its shared context.  It
//! exposes a device-agnostic API.  All I/O flows through port traits
//! injected at call sites, making the entire service testable with
//! mock adapters.
//!
//! ```text
//!   FramePort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                 │   VerificationService    │
//! ConfirmPort ◀──▶│  pose · timer · FSM      │ ──▶ FeedbackPort
//!                 └──────────────────────────┘
//! ```

use log::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::DetectError;
use crate::frame::{FrameImage, FrameObservation};
use crate::fsm::context::FsmContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::pose::{self, PoseAssessment};

use super::commands::AppCommand;
use super::events::{AppEvent, StatusSnapshot};
use super::ports::{ConfirmationOutcome, ConfirmationPort, EventSink, FeedbackPort, Tone};

// ───────────────────────────────────────────────────────────────
// VerificationService
// ───────────────────────────────────────────────────────────────

/// Orchestrates one drink-verification session.
pub struct VerificationService {
    fsm: Fsm,
    ctx: FsmContext,
    /// Repeating alert tone until verified.
    alarm: bool,
    last_alert_ms: Option<u64>,
    /// A request is in flight on the confirmation port.
    outstanding: bool,
    /// The in-flight request belongs to a session that was restarted.
    stale_outstanding: bool,
    /// Image of the most recent frame; sent when confirmation is wanted.
    latest_image: Option<FrameImage>,
    /// Verification timestamp not yet collected by the caller.
    unclaimed_verification: Option<u64>,
    last_assessment: Option<PoseAssessment>,
    frames_processed: u64,
}

impl VerificationService {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(config: AppConfig) -> Self {
        let ctx = FsmContext::new(config);
        let fsm = Fsm::new(build_state_table(), StateId::Watching);
        Self {
            fsm,
            ctx,
            alarm: false,
            last_alert_ms: None,
            outstanding: false,
            stale_outstanding: false,
            latest_image: None,
            unclaimed_verification: None,
            last_assessment: None,
            frames_processed: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the FSM in Watching.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("VerificationService started in {:?}", self.fsm.current_state());
    }

    // ── Per-frame orchestration ───────────────────────────────

    /// Feed one detector result.  A detector failure drops the frame.
    pub fn handle_frame_result(
        &mut self,
        result: Result<FrameObservation, DetectError>,
        confirmer: &mut impl ConfirmationPort,
        feedback: &mut impl FeedbackPort,
        sink: &mut impl EventSink,
    ) {
        match result {
            Ok(frame) => self.process_frame(frame, confirmer, feedback, sink),
            Err(e) => {
                warn!("Frame dropped: {}", e);
                sink.emit(&AppEvent::FrameDropped {
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Run one full cycle: assess pose → timer → confirmation → FSM.
    pub fn process_frame(
        &mut self,
        mut frame: FrameObservation,
        confirmer: &mut impl ConfirmationPort,
        feedback: &mut impl FeedbackPort,
        sink: &mut impl EventSink,
    ) {
        if self.fsm.current_state() == StateId::Verified {
            debug!("Frame at {}ms ignored, already verified", frame.timestamp_ms);
            return;
        }
        self.frames_processed += 1;

        // 1. Reduce detector output to a verdict
        let assessment = pose::assess(&frame, &self.ctx.config);
        let valid = assessment.is_valid();

        // 2. Debounce
        let now = frame.timestamp_ms;
        self.ctx.now_ms = now;
        self.ctx.frame_valid = Some(valid);
        self.ctx.validity.observe(valid, now);
        self.latest_image = frame.image.take();

        // 3. Confirmation, FSM, side effects
        self.step(confirmer, feedback, sink);

        // 4. Overlay snapshot
        sink.emit(&AppEvent::Status(StatusSnapshot {
            state: self.fsm.current_state(),
            timestamp_ms: now,
            verdict: assessment.verdict,
            held_ms: self.ctx.held_ms(),
            alarm: self.alarm,
            diagnostics: assessment.diagnostics(self.ctx.config.required_tilt_deg),
        }));
        self.last_assessment = Some(assessment);
    }

    /// Tick without a new frame: collects confirmation outcomes and
    /// keeps the alarm cadence going between frames.
    pub fn poll(
        &mut self,
        now_ms: u64,
        confirmer: &mut impl ConfirmationPort,
        feedback: &mut impl FeedbackPort,
        sink: &mut impl EventSink,
    ) {
        if self.fsm.current_state() == StateId::Verified {
            return;
        }
        self.ctx.now_ms = now_ms.max(self.ctx.now_ms);
        self.ctx.frame_valid = None;
        self.step(confirmer, feedback, sink);
    }

    // ── Command handling ──────────────────────────────────────

    /// Mark the in-flight confirmation, if any, so its answer is dropped.
    fn abandon_outstanding(&mut self) {
        if self.outstanding {
            self.stale_outstanding = true;
        }
    }

    /// Process an external command.
    pub fn handle_command(&mut self, cmd: AppCommand, sink: &mut impl EventSink) {
        match cmd {
            AppCommand::Restart => {
                let prev = self.fsm.current_state();
                self.abandon_outstanding();
                self.fsm.force_transition(StateId::Watching, &mut self.ctx);
                self.ctx.validity.reset();
                self.ctx.confirmation = None;
                self.ctx.commands = Default::default();
                self.ctx.verified_at_ms = None;
                self.unclaimed_verification = None;
                self.last_alert_ms = None;
                info!("Session restarted");
                if prev != StateId::Watching {
                    sink.emit(&AppEvent::StateChanged {
                        from: prev,
                        to: StateId::Watching,
                    });
                }
            }
            AppCommand::SetAlarm(on) => {
                self.alarm = on;
                self.last_alert_ms = None;
                info!("Alarm {}", if on { "enabled" } else { "disabled" });
            }
            AppCommand::ForceState(target) => {
                let prev = self.fsm.current_state();
                if target != StateId::AiPending {
                    self.abandon_outstanding();
                }
                self.fsm.force_transition(target, &mut self.ctx);
                self.collect_verification(sink);
                sink.emit(&AppEvent::StateChanged {
                    from: prev,
                    to: target,
                });
            }
            AppCommand::UpdateConfig(new_config) => {
                self.ctx.apply_config(new_config);
                info!("Configuration updated at runtime");
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn is_verified(&self) -> bool {
        self.fsm.current_state() == StateId::Verified
    }

    /// Hand over the verification timestamp.  Returns it once per
    /// verification so the caller writes exactly one intake record.
    pub fn take_verified(&mut self) -> Option<u64> {
        self.unclaimed_verification.take()
    }

    pub fn alarm_enabled(&self) -> bool {
        self.alarm
    }

    /// Whether a confirmation request is in flight.
    pub fn confirmation_pending(&self) -> bool {
        self.outstanding
    }

    pub fn last_assessment(&self) -> Option<&PoseAssessment> {
        self.last_assessment.as_ref()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Clone of the live configuration.
    pub fn current_config(&self) -> AppConfig {
        self.ctx.config.clone()
    }

    // ── Internal ──────────────────────────────────────────────

    fn step(
        &mut self,
        confirmer: &mut impl ConfirmationPort,
        feedback: &mut impl FeedbackPort,
        sink: &mut impl EventSink,
    ) {
        let prev_state = self.fsm.current_state();

        // Outcome from the port, if one arrived
        if self.outstanding {
            if let Some(outcome) = confirmer.poll() {
                self.outstanding = false;
                if self.stale_outstanding {
                    self.stale_outstanding = false;
                    debug!("Discarding outcome from restarted session: {:?}", outcome);
                } else {
                    sink.emit(&AppEvent::ConfirmationResolved(outcome.clone()));
                    self.ctx.confirmation = Some(outcome);
                }
            }
        }

        self.fsm.tick(&mut self.ctx);

        // Issue the request the FSM asked for
        if self.ctx.commands.request_confirmation && !self.outstanding {
            self.ctx.commands.request_confirmation = false;
            if let Some(outcome) = self.send_confirmation(confirmer, sink) {
                // Resolved without a round trip; settle it this tick.
                sink.emit(&AppEvent::ConfirmationResolved(outcome.clone()));
                self.ctx.confirmation = Some(outcome);
                self.ctx.frame_valid = None;
                self.fsm.tick(&mut self.ctx);
            }
        }

        if self.ctx.commands.play_success {
            self.ctx.commands.play_success = false;
            feedback.play(Tone::Success);
        }
        self.collect_verification(sink);

        let new_state = self.fsm.current_state();
        if new_state != prev_state {
            sink.emit(&AppEvent::StateChanged {
                from: prev_state,
                to: new_state,
            });
        }

        self.sound_alarm(feedback);
    }

    /// Start a remote check on the latest image.  Returns an outcome
    /// directly when no request could be made.
    fn send_confirmation(
        &mut self,
        confirmer: &mut impl ConfirmationPort,
        sink: &mut impl EventSink,
    ) -> Option<ConfirmationOutcome> {
        let Some(image) = self.latest_image.take() else {
            warn!("No image for the triggering frame");
            return Some(ConfirmationOutcome::CaptureFailed);
        };
        match confirmer.request(&image) {
            Ok(()) => {
                self.outstanding = true;
                sink.emit(&AppEvent::ConfirmationRequested {
                    at_ms: self.ctx.now_ms,
                });
                None
            }
            Err(e) => {
                warn!("Confirmation request failed: {}", e);
                Some(ConfirmationOutcome::Failed(e.to_string()))
            }
        }
    }

    fn collect_verification(&mut self, sink: &mut impl EventSink) {
        if !self.ctx.commands.record_intake {
            return;
        }
        self.ctx.commands.record_intake = false;
        let at_ms = self.ctx.verified_at_ms.unwrap_or(self.ctx.now_ms);
        self.unclaimed_verification = Some(at_ms);
        sink.emit(&AppEvent::Verified { at_ms });
    }

    fn sound_alarm(&mut self, feedback: &mut impl FeedbackPort) {
        if !self.alarm || self.fsm.current_state() == StateId::Verified {
            return;
        }
        let now = self.ctx.now_ms;
        let interval = u64::from(self.ctx.config.alarm_interval_ms);
        let due = self
            .last_alert_ms
            .is_none_or(|last| now.saturating_sub(last) >= interval);
        if due {
            feedback.play(Tone::Alert);
            self.last_alert_ms = Some(now);
        }
    }
}
