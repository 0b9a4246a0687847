//! Unified error types for the hydrocycle engine.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! runtime loop's error handling uniform. Port-level errors live next to
//! their traits in [`crate::app::ports`].

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible library operation funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A frame could not be analysed by the detectors.
    Detect(DetectError),
    /// The remote confirmation could not be started.
    Confirm(ConfirmError),
    /// Persistent storage failed.
    Storage(StorageError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// A stored record blob failed to decode.
    Corrupted(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detect(e) => write!(f, "detect: {e}"),
            Self::Confirm(e) => write!(f, "confirm: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Corrupted(what) => write!(f, "corrupted: {what}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Detector errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    /// The face detector failed on this frame.
    FaceDetector(String),
    /// The object detector failed on this frame.
    ObjectDetector(String),
    /// The frame source produced an unreadable record.
    Malformed(String),
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FaceDetector(msg) => write!(f, "face detection failed: {msg}"),
            Self::ObjectDetector(msg) => write!(f, "object detection failed: {msg}"),
            Self::Malformed(msg) => write!(f, "malformed frame: {msg}"),
        }
    }
}

impl From<DetectError> for Error {
    fn from(e: DetectError) -> Self {
        Self::Detect(e)
    }
}

// ---------------------------------------------------------------------------
// Confirmation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmError {
    /// A request is already outstanding.
    Busy,
    /// No credentials are configured for the remote service.
    NotConfigured,
    /// The worker could not be started.
    Spawn(String),
}

impl fmt::Display for ConfirmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "a confirmation is already pending"),
            Self::NotConfigured => write!(f, "remote confirmation not configured"),
            Self::Spawn(msg) => write!(f, "worker spawn failed: {msg}"),
        }
    }
}

impl From<ConfirmError> for Error {
    fn from(e: ConfirmError) -> Self {
        Self::Confirm(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Library-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
