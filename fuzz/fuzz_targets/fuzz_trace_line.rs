//! Fuzz target: `trace::parse_line`
//!
//! Drives arbitrary text into the detection-trace line parser and
//! asserts that it never panics, that an accepted line never holds
//! more detections than the input could describe, and that the pose
//! assessment of the parsed frame never panics either.
//!
//! cargo fuzz run fuzz_trace_line

#![no_main]

use hydrocycle::adapters::trace::parse_line;
use hydrocycle::config::AppConfig;
use hydrocycle::frame::FrameObservation;
use hydrocycle::pose;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(Some(line)) = parse_line(text) {
        // Each detection needs at least `{}` in the input.
        assert!(line.faces.len() + line.objects.len() <= text.len() / 2);
        let frame = FrameObservation {
            timestamp_ms: line.timestamp_ms,
            faces: line.faces,
            objects: line.objects,
            image: None,
        };
        let assessment = pose::assess(&frame, &AppConfig::default());
        assert!(assessment.proximities.len() <= frame.objects.len());
    }
});
