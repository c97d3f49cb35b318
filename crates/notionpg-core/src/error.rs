//! Classified error model for an import run.
//!
//! Transport failures, undecodable response bodies, and API error objects
//! are retryable inside the fetcher's backoff loop. Everything else is a
//! hard stop: either the upstream contract was violated or the run was
//! misconfigured. There is no partial-success mode — any error that reaches
//! the top aborts the run before the destination table is touched.

use thiserror::Error;

pub type Result<T, E = ImportError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ImportError {
    /// HTTP-level failure (connect, timeout, non-JSON transfer error).
    #[error("HTTP request error: {message}")]
    Transport { message: String },

    /// Response body was not valid JSON for the expected shape.
    #[error("failed to parse response: {message}")]
    Malformed { message: String },

    /// Upstream answered with an `object: "error"` payload.
    #[error("Notion API error: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// A property value the normalizer has no rule for.
    #[error("unsupported property value: {detail}")]
    Unsupported { detail: String },

    /// One computed property reported more than one output subtype.
    #[error("computed property reports mixed output subtypes: {kinds:?}")]
    MixedComputedSubtypes { kinds: Vec<&'static str> },

    /// The API contract guarantees UTC offsets, never named zones.
    #[error("expected a UTC-offset date, got named time zone {zone:?}")]
    UnexpectedTimeZone { zone: String },

    /// Error while handling one named property; wraps the underlying cause.
    #[error("property {label:?}: {source}")]
    Property {
        label: String,
        #[source]
        source: Box<ImportError>,
    },

    /// An upstream invariant did not hold (shape mismatch, missing field).
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Missing credentials or invalid caller-supplied identifiers.
    #[error("configuration error: {0}")]
    Config(String),

    /// Destination write failure; the transaction rolls back.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
}

impl ImportError {
    /// Whether the fetcher's backoff loop may retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Malformed { .. } | Self::Api { .. }
        )
    }

    /// Attach the property label this error occurred under.
    pub(crate) fn in_property(self, label: &str) -> Self {
        Self::Property {
            label: label.to_string(),
            source: Box::new(self),
        }
    }
}

impl From<reqwest::Error> for ImportError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_errors_are_retryable() {
        let errs = [
            ImportError::Transport {
                message: "connection reset".into(),
            },
            ImportError::Malformed {
                message: "EOF while parsing".into(),
            },
            ImportError::Api {
                status: 502,
                message: "bad gateway".into(),
            },
        ];
        for e in errs {
            assert!(e.is_retryable(), "{e} should be retryable");
        }
    }

    #[test]
    fn test_invariant_and_config_errors_are_fatal() {
        let errs = [
            ImportError::UnexpectedTimeZone {
                zone: "Europe/Paris".into(),
            },
            ImportError::MixedComputedSubtypes {
                kinds: vec!["number", "string"],
            },
            ImportError::Config("missing environment variable NOTION_TOKEN".into()),
            ImportError::Invariant("row count mismatch".into()),
        ];
        for e in errs {
            assert!(!e.is_retryable(), "{e} should be fatal");
        }
    }

    #[test]
    fn test_property_wrapper_keeps_cause_visible() {
        let e = ImportError::UnexpectedTimeZone {
            zone: "Asia/Tokyo".into(),
        }
        .in_property("Due date");
        let msg = e.to_string();
        assert!(msg.contains("Due date"));
        assert!(!e.is_retryable());
    }
}
