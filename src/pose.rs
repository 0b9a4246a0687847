//! Pose evaluation and the validity timer.
//!
//! The evaluator runs on **every frame before the FSM** and reduces the
//! detector output to a single verdict.  The [`ValidityTimer`] then
//! debounces that verdict over time; the FSM state handlers read the
//! timer to decide when a drinking pose has been held long enough.
//!
//! ## Per-frame rules
//!
//! 1. The first detected face must expose a mouth-bottom landmark.
//! 2. The head must be tilted back beyond `required_tilt_deg`.
//! 3. Some detected object's box centre must lie within
//!    `distance_threshold_px` of the mouth.
//!
//! ## Grace period
//!
//! Detectors flicker.  A single dropped frame must not throw away two
//! seconds of accumulated pose, so invalid frames only reset the timer
//! once no valid frame has been seen for `grace_period_ms`.

use core::fmt::Write as _;

use crate::config::AppConfig;
use crate::frame::{FrameObservation, Point};

// ═══════════════════════════════════════════════════════════════
//  Per-frame assessment
// ═══════════════════════════════════════════════════════════════

/// Why a frame was (or was not) a drinking pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseVerdict {
    /// All conditions met.
    Valid,
    /// No face in frame.
    NoFace,
    /// A face was found but the mouth landmark was not.
    MouthNotVisible,
    /// Head is not tilted back far enough.
    NotTiltedBack,
    /// Tilted back, but no candidate object was detected.
    NoObject,
    /// Candidate objects exist but none is near the mouth.
    ObjectTooFar,
}

/// Mouth-to-object relation for one detected object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectProximity {
    pub label: String,
    pub distance_px: f32,
    /// Strictly closer than the distance threshold.
    pub close: bool,
    /// Passes the container-label filter.
    pub label_accepted: bool,
}

/// The reduced outcome of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseAssessment {
    pub verdict: PoseVerdict,
    pub mouth: Option<Point>,
    pub head_tilt_deg: f32,
    /// Every object's label as reported, in detector order.
    pub object_labels: Vec<String>,
    /// Proximity per object; only populated once the tilt check passed.
    pub proximities: Vec<ObjectProximity>,
}

impl PoseAssessment {
    pub fn is_valid(&self) -> bool {
        self.verdict == PoseVerdict::Valid
    }

    /// The nearest object to the mouth, if any was measured.
    pub fn closest(&self) -> Option<&ObjectProximity> {
        self.proximities
            .iter()
            .min_by(|a, b| a.distance_px.total_cmp(&b.distance_px))
    }

    /// Multi-line diagnostic text for an overlay or log.
    pub fn diagnostics(&self, required_tilt_deg: f32) -> String {
        let mut out = String::new();
        if self.object_labels.is_empty() {
            out.push_str("Objs: None\n");
        } else {
            let _ = writeln!(out, "Objs: {}", self.object_labels.join(", "));
        }

        if self.verdict == PoseVerdict::NoFace {
            out.push_str("Face: None\n");
            return out;
        }
        if self.verdict == PoseVerdict::MouthNotVisible {
            out.push_str("Mouth: Not visible\n");
            return out;
        }

        out.push_str("Mouth Found\n");
        let _ = writeln!(
            out,
            "Tilt: {}\u{00b0} (Req: >{}\u{00b0})",
            self.head_tilt_deg as i32, required_tilt_deg as i32
        );
        if self.verdict == PoseVerdict::NotTiltedBack {
            out.push_str("Look UP to drink\n");
            return out;
        }
        for p in &self.proximities {
            let tag = if p.close { "CLOSE" } else { "FAR" };
            let _ = writeln!(out, "{}: {}", tag, p.label);
        }
        if self.verdict == PoseVerdict::NoObject {
            out.push_str("No Object Near Mouth\n");
        }
        out
    }
}

/// Case-insensitive substring match against the container label list.
/// Unlabelled objects always pass.
pub fn label_accepted(label: Option<&str>, accepted: &[String]) -> bool {
    let Some(label) = label else {
        return true;
    };
    if label == "Unknown" {
        return true;
    }
    let label = label.to_lowercase();
    accepted
        .iter()
        .any(|candidate| label.contains(&candidate.to_lowercase()))
}

/// Reduce one frame's detector output to a [`PoseAssessment`].
pub fn assess(frame: &FrameObservation, config: &AppConfig) -> PoseAssessment {
    let object_labels: Vec<String> = frame
        .objects
        .iter()
        .map(|o| o.label_or_unknown().to_string())
        .collect();

    let mut assessment = PoseAssessment {
        verdict: PoseVerdict::NoFace,
        mouth: None,
        head_tilt_deg: 0.0,
        object_labels,
        proximities: Vec::new(),
    };

    let Some(face) = frame.faces.first() else {
        return assessment;
    };
    assessment.head_tilt_deg = face.head_euler_x;

    let Some(mouth) = face.mouth_bottom else {
        assessment.verdict = PoseVerdict::MouthNotVisible;
        return assessment;
    };
    assessment.mouth = Some(mouth);

    if face.head_euler_x <= config.required_tilt_deg {
        assessment.verdict = PoseVerdict::NotTiltedBack;
        return assessment;
    }

    let mut any_close = false;
    for object in &frame.objects {
        let distance_px = mouth.distance_to(object.bounding_box.center());
        let accepted = label_accepted(object.label.as_deref(), &config.container_labels);
        let close = distance_px < config.distance_threshold_px;
        if close && (accepted || !config.require_container_label) {
            any_close = true;
        }
        assessment.proximities.push(ObjectProximity {
            label: object.label_or_unknown().to_string(),
            distance_px,
            close,
            label_accepted: accepted,
        });
    }

    assessment.verdict = if any_close {
        PoseVerdict::Valid
    } else if frame.objects.is_empty() {
        PoseVerdict::NoObject
    } else {
        PoseVerdict::ObjectTooFar
    };
    assessment
}

// ═══════════════════════════════════════════════════════════════
//  Validity timer
// ═══════════════════════════════════════════════════════════════

/// Debounces per-frame verdicts into a continuous held duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidityTimer {
    grace_period_ms: u64,
    /// Start of the current run of (grace-tolerant) valid frames.
    valid_since: Option<u64>,
    /// Most recent valid frame.
    last_valid_at: Option<u64>,
}

impl ValidityTimer {
    pub fn new(grace_period_ms: u32) -> Self {
        Self {
            grace_period_ms: u64::from(grace_period_ms),
            valid_since: None,
            last_valid_at: None,
        }
    }

    /// Feed one frame's verdict observed at `now_ms`.
    pub fn observe(&mut self, valid: bool, now_ms: u64) {
        if valid {
            self.last_valid_at = Some(now_ms);
            if self.valid_since.is_none() {
                self.valid_since = Some(now_ms);
            }
            return;
        }

        match self.last_valid_at {
            None => self.valid_since = None,
            Some(last) if now_ms.saturating_sub(last) > self.grace_period_ms => {
                self.valid_since = None;
            }
            Some(_) => {}
        }
    }

    /// Whether a run of valid frames is currently being accumulated.
    pub fn is_accumulating(&self) -> bool {
        self.valid_since.is_some()
    }

    /// Milliseconds the pose has been held as of `now_ms`.
    pub fn held_ms(&self, now_ms: u64) -> Option<u64> {
        self.valid_since.map(|since| now_ms.saturating_sub(since))
    }

    /// Drop the accumulated run.  The last-valid marker is kept so the
    /// grace window still applies to the next invalid frame.
    pub fn reset(&mut self) {
        self.valid_since = None;
    }

    /// Change the grace window without disturbing the current run.
    pub fn set_grace_period(&mut self, grace_period_ms: u32) {
        self.grace_period_ms = u64::from(grace_period_ms);
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
