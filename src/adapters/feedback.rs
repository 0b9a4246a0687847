//! Audible feedback adapter.
//!
//! Rings the terminal bell on stderr.  With `silent` set the tones are
//! only logged, which keeps replays in CI quiet.

use std::io::Write;

use log::{debug, info};

use crate::app::ports::{FeedbackPort, Tone};

#[derive(Debug, Default)]
pub struct BellFeedback {
    silent: bool,
    alerts: u32,
}

impl BellFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn silent() -> Self {
        Self {
            silent: true,
            alerts: 0,
        }
    }

    /// Alert tones played so far.
    pub fn alerts(&self) -> u32 {
        self.alerts
    }

    fn ring(&self, times: usize) {
        if self.silent {
            return;
        }
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(&b"\x07".repeat(times));
        let _ = err.flush();
    }
}

impl FeedbackPort for BellFeedback {
    fn play(&mut self, tone: Tone) {
        match tone {
            Tone::Alert => {
                self.alerts += 1;
                debug!("TONE | alert #{}", self.alerts);
                self.ring(1);
            }
            Tone::Success => {
                info!("TONE | success");
                self.ring(2);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_alerts_only() {
        let mut fb = BellFeedback::silent();
        fb.play(Tone::Alert);
        fb.play(Tone::Success);
        fb.play(Tone::Alert);
        assert_eq!(fb.alerts(), 2);
    }
}
