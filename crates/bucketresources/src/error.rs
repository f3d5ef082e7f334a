use keel_s3::S3Error;

/// Failures surfaced by a facet reconciler. Nothing here is retried internally.
#[derive(Debug, thiserror::Error)]
pub enum FacetError {
    /// Transport failure other than the facet's well-known not-found condition.
    #[error("{op}: {source}")]
    Transport { op: &'static str, source: S3Error },
    /// Declared configuration that must not be sent to the external system.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("{op}: cancelled")]
    Cancelled { op: &'static str },
    #[error("{op}: deadline exceeded")]
    DeadlineExceeded { op: &'static str },
}

impl FacetError {
    pub fn transport(op: &'static str, source: S3Error) -> Self { Self::Transport { op, source } }

    /// Operation the error was raised by, if any.
    pub fn op(&self) -> Option<&'static str> {
        match self {
            Self::Transport { op, .. } | Self::Cancelled { op } | Self::DeadlineExceeded { op } => Some(op),
            Self::Invalid(_) => None,
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Invalid(_) => "invalid",
            Self::Cancelled { .. } => "cancelled",
            Self::DeadlineExceeded { .. } => "deadline",
        }
    }
}

pub type FacetResult<T> = Result<T, FacetError>;
