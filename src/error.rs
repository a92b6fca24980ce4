//! Error taxonomy for the pipeline and its HTTP boundary.
//!
//! Cache-slot *reads* never surface here (missing/corrupt files degrade to
//! `None`); everything else propagates to the request boundary, except sink
//! persistence, which the orchestrator swallows and logs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RadarError {
    /// Non-success HTTP status from a feed source, the generation endpoint,
    /// or the evaluation store. `target` is the offending URL or model name.
    #[error("{target} request failed ({status}): {detail}")]
    Transport {
        target: String,
        status: u16,
        detail: String,
    },

    /// The generation call returned 2xx but carried no usable text.
    #[error("{model} returned no text content")]
    EmptyContent { model: String },

    /// No evaluation row matches the requested identifier.
    #[error("Evaluation not found")]
    NotFound { id: String },

    /// A required environment variable is absent. Raised at first use, not
    /// at process start.
    #[error("missing {name} environment variable")]
    MissingEnv { name: String },

    /// Connect/send/body failure before any status was observed.
    #[error(transparent)]
    Network(#[from] reqwest::Error),

    /// Cache slot write failed. Reads are best-effort and never error.
    #[error("cache write failed: {0}")]
    CacheWrite(#[from] std::io::Error),
}

impl RadarError {
    pub fn transport(target: impl Into<String>, status: u16, detail: impl Into<String>) -> Self {
        Self::Transport {
            target: target.into(),
            status,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RadarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_message_names_target_and_status() {
        let err = RadarError::transport("https://hnrss.org/ask", 503, "unavailable");
        let msg = err.to_string();
        assert!(msg.contains("https://hnrss.org/ask"));
        assert!(msg.contains("503"));
    }

    #[test]
    fn not_found_message_matches_api_contract() {
        let err = RadarError::NotFound { id: "abc".into() };
        assert_eq!(err.to_string(), "Evaluation not found");
    }
}
