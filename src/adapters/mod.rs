//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements         | Connects to                  |
//! |--------------|--------------------|------------------------------|
//! | `clock`      | (time queries)     | `Instant` + `chrono::Local`  |
//! | `feedback`   | FeedbackPort       | Terminal bell                |
//! | `file_store` | ConfigPort         | Data directory / in-memory   |
//! |              | StoragePort        |                              |
//! | `gemini`     | ConfirmationPort   | Gemini `generateContent`     |
//! | `log_sink`   | EventSink          | `log` output                 |
//! |              | NotifierPort       |                              |
//! | `trace`      | FramePort          | JSON-lines detection trace   |

pub mod clock;
pub mod feedback;
pub mod file_store;
pub mod gemini;
pub mod log_sink;
pub mod trace;
