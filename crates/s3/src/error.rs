use serde::{Deserialize, Serialize};

/// Error codes the object-storage API reports for absent state.
pub mod codes {
    pub const NO_SUCH_TAG_SET: &str = "NoSuchTagSet";
    pub const NO_SUCH_BUCKET: &str = "NoSuchBucket";
}

/// Domain errors surfaced by a [`BucketClient`](crate::BucketClient).
///
/// Translating raw transport failures into these variants is the transport's job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum S3Error {
    #[error("not found: {code}")]
    NotFound { code: String },
    #[error("api error {code}: {message}")]
    Api { code: String, message: String },
    #[error("transport: {0}")]
    Transport(String),
}

impl S3Error {
    pub fn not_found(code: impl Into<String>) -> Self { Self::NotFound { code: code.into() } }

    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api { code: code.into(), message: message.into() }
    }

    pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound { .. }) }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::NotFound { code } | Self::Api { code, .. } => Some(code),
            Self::Transport(_) => None,
        }
    }
}

/// True when the bucket exists but has no tag set.
pub fn tagging_not_found(err: &S3Error) -> bool {
    matches!(err, S3Error::NotFound { code } if code == codes::NO_SUCH_TAG_SET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagging_not_found_only_matches_missing_tag_set() {
        assert!(tagging_not_found(&S3Error::not_found(codes::NO_SUCH_TAG_SET)));
        assert!(!tagging_not_found(&S3Error::not_found(codes::NO_SUCH_BUCKET)));
        assert!(!tagging_not_found(&S3Error::api(codes::NO_SUCH_TAG_SET, "reported as api error")));
        assert!(!tagging_not_found(&S3Error::Transport("connection reset".into())));
    }

    #[test]
    fn display_includes_code() {
        let e = S3Error::api("AccessDenied", "denied");
        assert_eq!(e.to_string(), "api error AccessDenied: denied");
        assert_eq!(e.code(), Some("AccessDenied"));
        assert_eq!(S3Error::Transport("boom".into()).code(), None);
    }
}
