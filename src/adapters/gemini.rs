//! Remote drinking confirmation over the Gemini `generateContent` API.
//!
//! Implements [`ConfirmationPort`].  Each request runs on its own worker
//! thread with a blocking `reqwest` client; the outcome comes back
//! through a bounded `embassy-sync` channel that the runtime loop polls.
//!
//! ```text
//! ┌──────────────┐  request(image)  ┌──────────────┐  POST  ┌─────────┐
//! │ Runtime loop │─────────────────▶│ worker thread│───────▶│ Gemini  │
//! │  (sync)      │◀─────────────────│  (blocking)  │◀───────│         │
//! └──────────────┘  OUTCOME channel └──────────────┘  JSON  └─────────┘
//! ```
//!
//! The API key is read from `GEMINI_API_KEY`; it is never stored in
//! config or logged.

use log::{debug, info, warn};

use crate::app::ports::{ConfirmationOutcome, ConfirmationPort};
use crate::error::ConfirmError;
use crate::frame::FrameImage;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DRINKING_PROMPT: &str = "Analyze this image carefully.\n\
Is the person in this image ACTIVELY DRINKING water or liquid from a bottle or container?\n\
Important: They must be in the act of drinking (bottle tilted, liquid flowing, drinking posture).\n\
Simply holding a bottle near the face does NOT count.\n\
\n\
Respond with ONLY one word: YES or NO.";

/// Turn the model's reply text into an outcome.  No text counts as "NO".
pub fn interpret_reply(text: Option<&str>) -> ConfirmationOutcome {
    let reply = text.map(|t| t.trim().to_uppercase()).unwrap_or_else(|| "NO".to_string());
    debug!("Gemini reply: {}", reply);
    if reply.contains("YES") {
        ConfirmationOutcome::Confirmed
    } else {
        ConfirmationOutcome::Rejected
    }
}

// ═══════════════════════════════════════════════════════════════
//  Unconfigured fallback
// ═══════════════════════════════════════════════════════════════

/// Stand-in when no remote model is available.  Every request fails
/// with [`ConfirmError::NotConfigured`], which the FSM resolves per the
/// `accept_on_confirmation_error` policy.
#[derive(Debug, Default)]
pub struct UnavailableConfirmer;

impl ConfirmationPort for UnavailableConfirmer {
    fn request(&mut self, _image: &FrameImage) -> Result<(), ConfirmError> {
        Err(ConfirmError::NotConfigured)
    }

    fn poll(&mut self) -> Option<ConfirmationOutcome> {
        None
    }
}

// ═══════════════════════════════════════════════════════════════
//  HTTP client
// ═══════════════════════════════════════════════════════════════

#[cfg(feature = "gemini")]
pub use client::{GeminiConfig, GeminiConfirmer};

#[cfg(feature = "gemini")]
mod client {
    use std::sync::Arc;
    use std::time::Duration;

    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_sync::channel::Channel;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::config::AppConfig;

    /// One outcome in flight at a time.
    const OUTCOME_DEPTH: usize = 1;

    type OutcomeChannel = Channel<CriticalSectionRawMutex, ConfirmationOutcome, OUTCOME_DEPTH>;

    /// Connection settings for the remote model.
    #[derive(Clone)]
    pub struct GeminiConfig {
        pub api_key: String,
        pub endpoint: String,
        pub model: String,
        pub timeout: Duration,
    }

    impl core::fmt::Debug for GeminiConfig {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            f.debug_struct("GeminiConfig")
                .field("endpoint", &self.endpoint)
                .field("model", &self.model)
                .field("timeout", &self.timeout)
                .finish_non_exhaustive()
        }
    }

    impl GeminiConfig {
        /// Build from the app config plus `GEMINI_API_KEY`.
        pub fn from_env(app: &AppConfig) -> Result<Self, ConfirmError> {
            let api_key = std::env::var(API_KEY_ENV).unwrap_or_default();
            if api_key.trim().is_empty() {
                return Err(ConfirmError::NotConfigured);
            }
            Ok(Self {
                api_key,
                endpoint: DEFAULT_ENDPOINT.to_string(),
                model: app.confirmation_model.clone(),
                timeout: Duration::from_secs(u64::from(app.confirmation_timeout_secs)),
            })
        }

        fn url(&self) -> String {
            format!(
                "{}/models/{}:generateContent?key={}",
                self.endpoint.trim_end_matches('/'),
                self.model,
                self.api_key
            )
        }
    }

    // ── Wire format ───────────────────────────────────────────

    #[derive(Debug, Serialize)]
    pub(super) struct GenerateRequest {
        pub contents: Vec<Content>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub(super) struct Content {
        #[serde(default)]
        pub parts: Vec<Part>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub(super) struct Part {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        pub text: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        pub inline_data: Option<InlineData>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub(super) struct InlineData {
        pub mime_type: String,
        pub data: String,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct GenerateResponse {
        #[serde(default)]
        pub candidates: Vec<Candidate>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Candidate {
        pub content: Option<Content>,
    }

    impl GenerateRequest {
        pub(super) fn for_image(image: &FrameImage) -> Self {
            Self {
                contents: vec![Content {
                    parts: vec![
                        Part {
                            text: None,
                            inline_data: Some(InlineData {
                                mime_type: image.mime_type.clone(),
                                data: STANDARD.encode(&image.bytes),
                            }),
                        },
                        Part {
                            text: Some(DRINKING_PROMPT.to_string()),
                            inline_data: None,
                        },
                    ],
                }],
            }
        }
    }

    impl GenerateResponse {
        /// Text parts of the first candidate, concatenated.
        pub(super) fn text(&self) -> Option<String> {
            let content = self.candidates.first()?.content.as_ref()?;
            let text: String = content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect();
            if text.is_empty() { None } else { Some(text) }
        }
    }

    // ── Confirmer ─────────────────────────────────────────────

    pub struct GeminiConfirmer {
        config: Arc<GeminiConfig>,
        client: reqwest::blocking::Client,
        outcomes: Arc<OutcomeChannel>,
        in_flight: bool,
    }

    impl GeminiConfirmer {
        pub fn new(config: GeminiConfig) -> Result<Self, ConfirmError> {
            let client = reqwest::blocking::Client::builder()
                .timeout(config.timeout)
                .build()
                .map_err(|e| ConfirmError::Spawn(e.to_string()))?;
            info!("GeminiConfirmer: model {}", config.model);
            Ok(Self {
                config: Arc::new(config),
                client,
                outcomes: Arc::new(Channel::new()),
                in_flight: false,
            })
        }
    }

    fn classify(
        client: &reqwest::blocking::Client,
        config: &GeminiConfig,
        body: &GenerateRequest,
    ) -> ConfirmationOutcome {
        let response = match client.post(config.url()).json(body).send() {
            Ok(r) => r,
            Err(e) => {
                // reqwest includes the URL in errors; keep the key out of logs.
                let e = e.without_url();
                return ConfirmationOutcome::Failed(format!("transport: {e}"));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return ConfirmationOutcome::Failed(format!(
                "API request failed with status {}: {}",
                status,
                detail.chars().take(200).collect::<String>()
            ));
        }

        match response.json::<GenerateResponse>() {
            Ok(parsed) => interpret_reply(parsed.text().as_deref()),
            Err(e) => ConfirmationOutcome::Failed(format!("bad response: {}", e.without_url())),
        }
    }

    impl ConfirmationPort for GeminiConfirmer {
        fn request(&mut self, image: &FrameImage) -> Result<(), ConfirmError> {
            if self.in_flight {
                return Err(ConfirmError::Busy);
            }

            let body = GenerateRequest::for_image(image);
            let client = self.client.clone();
            let config = Arc::clone(&self.config);
            let outcomes = Arc::clone(&self.outcomes);

            std::thread::Builder::new()
                .name("gemini-confirm".into())
                .spawn(move || {
                    let outcome = classify(&client, &config, &body);
                    if outcomes.try_send(outcome).is_err() {
                        warn!("GeminiConfirmer: outcome channel full, dropping result");
                    }
                })
                .map_err(|e| ConfirmError::Spawn(e.to_string()))?;

            self.in_flight = true;
            debug!("GeminiConfirmer: request sent ({} bytes)", image.bytes.len());
            Ok(())
        }

        fn poll(&mut self) -> Option<ConfirmationOutcome> {
            let outcome = self.outcomes.try_receive().ok()?;
            self.in_flight = false;
            Some(outcome)
        }
    }

}
