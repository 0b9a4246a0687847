//! Log-based event sink and notifier adapters.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade (stderr via `env_logger` in the binary), and
//! [`NotifierPort`] by logging the notification a tray would show.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{ConfirmationOutcome, EventSink, NotifierPort};
use crate::notify::{Notification, NotificationAction};

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink {
    /// Also log the multi-line detector diagnostics per frame.
    verbose: bool,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verbose() -> Self {
        Self { verbose: true }
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Status(s) => {
                debug!(
                    "STATUS | t={}ms | state={:?} | {} | verdict={:?} | held={}ms | alarm={}",
                    s.timestamp_ms,
                    s.state,
                    s.state.status_line(),
                    s.verdict,
                    s.held_ms.unwrap_or(0),
                    s.alarm,
                );
                if self.verbose {
                    for line in s.diagnostics.lines() {
                        info!("DIAG | {}", line);
                    }
                }
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::ConfirmationRequested { at_ms } => {
                info!("CONFIRM | requested at {}ms", at_ms);
            }
            AppEvent::ConfirmationResolved(outcome) => match outcome {
                ConfirmationOutcome::Failed(reason) => {
                    warn!("CONFIRM | failed: {}", reason);
                }
                other => info!("CONFIRM | {:?}", other),
            },
            AppEvent::Verified { at_ms } => {
                info!("VERIFIED | drinking confirmed at {}ms", at_ms);
            }
            AppEvent::FrameDropped { reason } => {
                warn!("FRAME | dropped: {}", reason);
            }
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
        }
    }
}

/// Notifier that logs instead of posting to a tray.
#[derive(Debug, Default)]
pub struct LogNotifier {
    posted: u32,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications posted so far.
    pub fn posted(&self) -> u32 {
        self.posted
    }
}

impl NotifierPort for LogNotifier {
    fn notify(&mut self, n: &Notification) {
        self.posted += 1;
        let action = match n.action {
            NotificationAction::OpenVerification { alarm: true } => "verify --alarm",
            NotificationAction::OpenVerification { alarm: false } => "verify",
            NotificationAction::OpenCycles => "period status",
        };
        info!(
            "NOTIFY | [{}#{}] {}: {} (tap: {})",
            n.channel, n.id, n.title, n.body, action
        );
    }
}
