//! Trace replay → verification → intake ledger on disk.

use std::fmt::Write as _;
use std::path::Path;

use hydrocycle::adapters::file_store::FileStore;
use hydrocycle::adapters::gemini::UnavailableConfirmer;
use hydrocycle::adapters::trace::TraceSource;
use hydrocycle::app::events::AppEvent;
use hydrocycle::app::ports::{ConfirmationOutcome, FramePort, Tone};
use hydrocycle::app::service::VerificationService;
use hydrocycle::config::AppConfig;
use hydrocycle::records::RecordBook;

use crate::mocks::{RecordingSink, RecordingTones};

const DRINKING_FACE: &str = r#"[{"mouth_bottom":{"x":320,"y":400},"head_euler_x":16.0}]"#;
const BOTTLE: &str =
    r#"[{"bounding_box":{"left":290,"top":380,"right":350,"bottom":560},"label":"Bottle"}]"#;

/// Drinking frames every 100 ms over `from..=to`, each with `image`.
fn drinking_lines(out: &mut String, from: u64, to: u64, image: Option<&str>) {
    for t in (from..=to).step_by(100) {
        match image {
            Some(img) => writeln!(
                out,
                r#"{{"t":{t},"faces":{DRINKING_FACE},"objects":{BOTTLE},"image":"{img}"}}"#
            ),
            None => writeln!(out, r#"{{"t":{t},"faces":{DRINKING_FACE},"objects":{BOTTLE}}}"#),
        }
        .unwrap();
    }
}

fn write_trace(dir: &Path, text: &str) -> std::path::PathBuf {
    std::fs::write(dir.join("frame.jpg"), [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
    let path = dir.join("session.jsonl");
    std::fs::write(&path, text).unwrap();
    path
}

struct Replay {
    svc: VerificationService,
    sink: RecordingSink,
    tones: RecordingTones,
}

fn replay(path: &Path, config: AppConfig, book: &mut RecordBook<FileStore>) -> Replay {
    let mut frames = TraceSource::open(path).unwrap();
    let mut confirmer = UnavailableConfirmer;
    let mut sink = RecordingSink::default();
    let mut tones = RecordingTones::default();
    let mut svc = VerificationService::new(config);
    svc.start(&mut sink);

    while let Some(result) = frames.next_frame() {
        svc.handle_frame_result(result, &mut confirmer, &mut tones, &mut sink);
        if let Some(at_ms) = svc.take_verified() {
            book.log_intake(1_710_000_000_000 + at_ms).unwrap();
        }
    }
    Replay { svc, sink, tones }
}

#[test]
fn held_pose_without_remote_check_is_accepted_and_logged() {
    let dir = tempfile::tempdir().unwrap();
    let mut text = String::from("# two seconds at the bottle\n");
    drinking_lines(&mut text, 0, 2500, Some("frame.jpg"));
    let trace = write_trace(dir.path(), &text);

    let data = dir.path().join("data");
    let mut book = RecordBook::new(FileStore::open(&data).unwrap());
    let run = replay(&trace, AppConfig::default(), &mut book);

    assert!(run.svc.is_verified());
    assert_eq!(run.tones.played, vec![Tone::Success]);
    assert_eq!(
        run.sink.count(|e| matches!(e, AppEvent::ConfirmationResolved(ConfirmationOutcome::Failed(_)))),
        1
    );

    let reopened = RecordBook::new(FileStore::open(&data).unwrap());
    let records = reopened.intake_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].timestamp_ms, 1_710_000_000_000 + 2000);
}

#[test]
fn detector_errors_are_dropped_without_breaking_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut text = String::new();
    drinking_lines(&mut text, 0, 900, Some("frame.jpg"));
    text.push_str(r#"{"t":950,"error":{"detector":"face","message":"model busy"}}"#);
    text.push('\n');
    text.push_str("{not json}\n");
    drinking_lines(&mut text, 1000, 2200, Some("frame.jpg"));
    let trace = write_trace(dir.path(), &text);

    let mut book = RecordBook::new(FileStore::open(dir.path().join("data")).unwrap());
    let run = replay(&trace, AppConfig::default(), &mut book);

    assert!(run.svc.is_verified());
    assert_eq!(run.sink.count(|e| matches!(e, AppEvent::FrameDropped { .. })), 2);
    assert_eq!(book.intake_records().unwrap().len(), 1);
}

#[test]
fn frames_without_images_never_verify() {
    let dir = tempfile::tempdir().unwrap();
    let mut text = String::new();
    drinking_lines(&mut text, 0, 5000, None);
    let trace = write_trace(dir.path(), &text);

    let mut book = RecordBook::new(FileStore::open(dir.path().join("data")).unwrap());
    let run = replay(&trace, AppConfig::default(), &mut book);

    assert!(!run.svc.is_verified());
    assert!(
        run.sink
            .count(|e| matches!(e, AppEvent::ConfirmationResolved(ConfirmationOutcome::CaptureFailed)))
            >= 2
    );
    assert!(book.intake_records().unwrap().is_empty());
}

#[test]
fn label_filter_rejects_non_container_labels() {
    let dir = tempfile::tempdir().unwrap();
    let mut text = String::new();
    for t in (0..=2500).step_by(100) {
        writeln!(
            text,
            r#"{{"t":{t},"faces":{DRINKING_FACE},"objects":[{{"bounding_box":{{"left":290,"top":380,"right":350,"bottom":560}},"label":"Phone"}}],"image":"frame.jpg"}}"#
        )
        .unwrap();
    }
    let trace = write_trace(dir.path(), &text);
    let config = AppConfig {
        require_container_label: true,
        ..AppConfig::default()
    };

    let mut book = RecordBook::new(FileStore::open(dir.path().join("data")).unwrap());
    let run = replay(&trace, config.clone(), &mut book);
    assert!(!run.svc.is_verified());

    // Same trace, filter off: the phone counts as a container.
    let mut book = RecordBook::new(FileStore::open(dir.path().join("data2")).unwrap());
    let run = replay(&trace, AppConfig::default(), &mut book);
    assert!(run.svc.is_verified());
}
