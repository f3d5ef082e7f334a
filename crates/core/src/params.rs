//! Declared per-facet configuration carried in `spec.forProvider`.
//!
//! Every facet is optional on [`BucketParameters`](crate::BucketParameters): `None` means the
//! facet is not managed and should be reset if the external system holds state for it.
//! An empty facet (e.g. a tag set with no entries) is a different, explicit declaration.

use serde::{Deserialize, Serialize};

/// A single key/value tag as declared by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// Declared tag set. Order is preserved as written; keys are not required to be unique here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tagging {
    #[serde(default)]
    pub tag_set: Vec<Tag>,
}

impl Tagging {
    pub fn new(tags: impl IntoIterator<Item = Tag>) -> Self {
        Self { tag_set: tags.into_iter().collect() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersioningStatus {
    Enabled,
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MfaDelete {
    Enabled,
    Disabled,
}

/// Declared versioning state. Unset fields may be filled from the external bucket
/// during late initialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersioningConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<VersioningStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfa_delete: Option<MfaDelete>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccelerateStatus {
    Enabled,
    Suspended,
}

/// Declared transfer acceleration state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccelerateConfiguration {
    pub status: AccelerateStatus,
}
