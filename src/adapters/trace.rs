//! Detection-trace frame source.
//!
//! Implements [`FramePort`] over a JSON-lines file of recorded detector
//! output, one frame per line:
//!
//! ```text
//! {"t":1200,"faces":[{"mouth_bottom":{"x":310,"y":402},"head_euler_x":14.5}],
//!  "objects":[{"bounding_box":{"left":280,"top":300,"right":350,"bottom":520},"label":"Bottle"}],
//!  "image":"frames/0012.jpg"}
//! {"t":1300,"error":{"detector":"face","message":"model not loaded"}}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.  Image paths are
//! relative to the trace file's directory; an unreadable image leaves
//! the frame without one.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Deserialize;

use crate::app::ports::FramePort;
use crate::error::DetectError;
use crate::frame::{DetectedObject, FaceObservation, FrameImage, FrameObservation};

/// Which collaborator failed on a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Detector {
    Face,
    Object,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TraceFailure {
    pub detector: Detector,
    #[serde(default)]
    pub message: String,
}

/// One parsed trace line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TraceLine {
    #[serde(rename = "t")]
    pub timestamp_ms: u64,
    #[serde(default)]
    pub faces: Vec<FaceObservation>,
    #[serde(default)]
    pub objects: Vec<DetectedObject>,
    /// Image path relative to the trace directory.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub error: Option<TraceFailure>,
}

/// Parse one line.  `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> Result<Option<TraceLine>, DetectError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| DetectError::Malformed(e.to_string()))
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// Replays a detection trace.
pub struct TraceSource<R: BufRead> {
    reader: R,
    base_dir: PathBuf,
    line_no: usize,
    buf: String,
}

impl TraceSource<BufReader<File>> {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self::from_reader(BufReader::new(file), base_dir))
    }
}

impl<R: BufRead> TraceSource<R> {
    pub fn from_reader(reader: R, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            base_dir: base_dir.into(),
            line_no: 0,
            buf: String::new(),
        }
    }

    fn load_image(&self, rel: &str) -> Option<FrameImage> {
        let path = self.base_dir.join(rel);
        match std::fs::read(&path) {
            Ok(bytes) => Some(FrameImage {
                mime_type: mime_for(&path).to_string(),
                bytes,
            }),
            Err(e) => {
                warn!("Trace: image {} unreadable: {}", path.display(), e);
                None
            }
        }
    }

    fn to_frame(&self, line: TraceLine) -> Result<FrameObservation, DetectError> {
        if let Some(failure) = line.error {
            return Err(match failure.detector {
                Detector::Face => DetectError::FaceDetector(failure.message),
                Detector::Object => DetectError::ObjectDetector(failure.message),
            });
        }
        let image = line.image.as_deref().and_then(|rel| self.load_image(rel));
        Ok(FrameObservation {
            timestamp_ms: line.timestamp_ms,
            faces: line.faces,
            objects: line.objects,
            image,
        })
    }
}

impl<R: BufRead> FramePort for TraceSource<R> {
    fn next_frame(&mut self) -> Option<Result<FrameObservation, DetectError>> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    warn!("Trace: read failed after line {}: {}", self.line_no, e);
                    return None;
                }
            }
            self.line_no += 1;

            match parse_line(&self.buf) {
                Ok(None) => continue,
                Ok(Some(line)) => {
                    debug!("Trace: line {} t={}ms", self.line_no, line.timestamp_ms);
                    return Some(self.to_frame(line));
                }
                Err(DetectError::Malformed(msg)) => {
                    return Some(Err(DetectError::Malformed(format!(
                        "line {}: {}",
                        self.line_no, msg
                    ))));
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
