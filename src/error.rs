//! Error taxonomy for backend interaction.
//!
//! Every failure mode the session has to distinguish gets its own variant;
//! everything carries enough context to produce a human-readable message.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The request exceeded its deadline.
    #[error("request to {endpoint} timed out after {waited_ms} ms")]
    Timeout { endpoint: String, waited_ms: u64 },

    /// Connection-level failure before any HTTP status was produced.
    #[error("transport error on {endpoint}: {detail}")]
    Transport { endpoint: String, detail: String },

    /// Non-2xx HTTP status.
    #[error("HTTP {status} {status_text} from {endpoint}")]
    Http {
        endpoint: String,
        status: u16,
        status_text: String,
    },

    /// 2xx response whose body carries `success: false`. The backend's
    /// application-level flag takes precedence over transport success.
    #[error("backend rejected {endpoint}: {message}")]
    Api { endpoint: String, message: String },

    /// Probe answered but the backend reports it is not ready yet.
    #[error("backend not initialized{}", fmt_detail(.detail))]
    NotInitialized { detail: Option<String> },

    /// Response parsed as JSON but required fields are missing or mistyped.
    #[error("malformed response from {endpoint}: {detail}")]
    Malformed { endpoint: String, detail: String },
}

fn fmt_detail(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(": {}", d),
        None => String::new(),
    }
}

impl ApiError {
    /// Collapse to the single human-readable shape the render collaborator
    /// shows for any failure.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}
