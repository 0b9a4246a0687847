//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ VerificationService / RecordBook (domain)
//! ```
//!
//! Driven adapters (camera + detectors, remote confirmation, tones,
//! notifications, event sinks, storage) implement these traits.  The
//! domain consumes them via generics, so the core never touches a
//! camera, a network socket or the filesystem directly.
//!
//! ## Notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **StoragePort** writes MUST be atomic; a torn ledger loses history.
//! - All port errors are typed; callers must handle every variant explicitly.

use crate::config::AppConfig;
use crate::error::{ConfirmError, DetectError};
use crate::frame::{FrameImage, FrameObservation};
use crate::notify::Notification;

// ───────────────────────────────────────────────────────────────
// Frame port (driven adapter: camera + detectors → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: yields detector output one camera frame at a time.
pub trait FramePort {
    /// Next analysed frame.  `None` once the source is exhausted.
    /// A detector failure surfaces as `Some(Err(_))`; the frame is dropped.
    fn next_frame(&mut self) -> Option<Result<FrameObservation, DetectError>>;
}

// ───────────────────────────────────────────────────────────────
// Confirmation port (driven adapter: domain ↔ remote vision model)
// ───────────────────────────────────────────────────────────────

/// Result of one remote confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// The model agrees the user is drinking.
    Confirmed,
    /// The model says the user is not drinking.
    Rejected,
    /// No still image was available for the triggering frame.
    CaptureFailed,
    /// Transport or API failure.
    Failed(String),
}

/// Non-blocking remote classification.
///
/// `request` starts a check and returns immediately; `poll` yields the
/// outcome once.  Callers keep at most one request outstanding.
pub trait ConfirmationPort {
    fn request(&mut self, image: &FrameImage) -> Result<(), ConfirmError>;

    fn poll(&mut self) -> Option<ConfirmationOutcome>;
}

// ───────────────────────────────────────────────────────────────
// Feedback port (driven adapter: domain → speaker)
// ───────────────────────────────────────────────────────────────

/// Audible cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Repeating alert while a reminder alarm is unanswered.
    Alert,
    /// Single beep once drinking has been verified.
    Success,
}

pub trait FeedbackPort {
    fn play(&mut self, tone: Tone);
}

// ───────────────────────────────────────────────────────────────
// Notifier port (driven adapter: domain → notification tray)
// ───────────────────────────────────────────────────────────────

pub trait NotifierPort {
    fn notify(&mut self, notification: &Notification);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / overlay)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists application configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`AppConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<AppConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &AppConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ disk)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for ledgers and preferences.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Write operations MUST be atomic, no partial writes on crash.
pub trait StoragePort {
    /// Read a value.  `Err(StorageError::NotFound)` if absent.
    fn read(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from event system)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the scheduler invokes when a schedule fires.
///
/// This decouples the [`Scheduler`](crate::scheduler::Scheduler) from the
/// event queue.  The runtime loop implements it by pushing into
/// [`EventQueue`](crate::events::EventQueue).
pub trait SchedulerDelegate {
    /// Called when a schedule fires.
    ///
    /// * `name`: the unique name of the schedule that fired.
    /// * `kind`: whether it was delivered or swallowed by quiet hours.
    fn on_schedule_fired(&mut self, name: &str, kind: ScheduleFiredKind);
}

/// Discriminant passed to [`SchedulerDelegate::on_schedule_fired`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleFiredKind {
    /// The schedule fired normally.
    Periodic,
    /// The schedule came due inside quiet hours and was skipped.
    Suppressed,
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first run).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Namespace or key contains characters the backend cannot store.
    InvalidKey,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::InvalidKey => write!(f, "invalid namespace or key"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl std::error::Error for StorageError {}
