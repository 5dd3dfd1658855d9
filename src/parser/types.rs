use thiserror::Error;

/// Why a candidate entry could not be turned into a [`crate::Proxy`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExplodeError {
    /// The text has no `scheme://` delimiter at all.
    #[error("not a proxy link")]
    NotALink,

    /// The scheme is not supported, or its payload has an unrecognized shape.
    /// Such entries are kept verbatim rather than dropped.
    #[error("unsupported proxy type: {scheme}{}", fmt_reason(.reason))]
    UnsupportedKind {
        scheme: String,
        reason: Option<String>,
    },

    /// A field is structurally invalid, e.g. a non-numeric port.
    #[error("malformed entry: {0}")]
    MalformedEntry(String),
}

impl ExplodeError {
    pub fn unsupported(scheme: &str) -> Self {
        ExplodeError::UnsupportedKind {
            scheme: scheme.to_string(),
            reason: None,
        }
    }

    pub fn unsupported_payload(scheme: &str, reason: impl Into<String>) -> Self {
        ExplodeError::UnsupportedKind {
            scheme: scheme.to_string(),
            reason: Some(reason.into()),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        ExplodeError::MalformedEntry(message.into())
    }
}

fn fmt_reason(reason: &Option<String>) -> String {
    reason
        .as_ref()
        .map(|r| format!(" ({})", r))
        .unwrap_or_default()
}

pub type ExplodeResult<T> = Result<T, ExplodeError>;
