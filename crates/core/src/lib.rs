//! Keel core types: the declared bucket snapshot handed to the reconciler.
//!
//! The snapshot is owned by the declared-state store; the engine only reads it, except
//! for late initialization which fills fields the user left unset.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

mod params;

pub use params::{AccelerateConfiguration, AccelerateStatus, MfaDelete, Tag, Tagging, VersioningConfiguration, VersioningStatus};

/// Annotation holding the identity of the external bucket when it differs from the object name.
pub const EXTERNAL_NAME_ANNOTATION: &str = "keel.io/external-name";

pub const BUCKET_KIND: &str = "Bucket";

pub mod prelude {
    pub use super::{
        AccelerateConfiguration, AccelerateStatus, Bucket, BucketParameters, BucketSpec, MfaDelete, ObjectMeta, Tag, Tagging,
        VersioningConfiguration, VersioningStatus,
    };
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Provider-facing parameters of a bucket. Each facet is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_constraint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_tagging: Option<Tagging>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versioning_configuration: Option<VersioningConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accelerate_configuration: Option<AccelerateConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSpec {
    #[serde(default)]
    pub for_provider: BucketParameters,
}

/// Managed bucket as declared by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: BucketSpec,
}

impl Bucket {
    pub fn new(name: impl Into<String>) -> Self {
        Self { metadata: ObjectMeta { name: name.into(), annotations: BTreeMap::new() }, spec: BucketSpec::default() }
    }

    /// Identity of the external bucket: the external-name annotation if set, else the object name.
    pub fn external_name(&self) -> &str {
        self.metadata
            .annotations
            .get(EXTERNAL_NAME_ANNOTATION)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.metadata.name)
    }

    pub fn set_external_name(&mut self, name: impl Into<String>) {
        self.metadata.annotations.insert(EXTERNAL_NAME_ANNOTATION.to_string(), name.into());
    }

    pub fn params(&self) -> &BucketParameters { &self.spec.for_provider }
    pub fn params_mut(&mut self) -> &mut BucketParameters { &mut self.spec.for_provider }

    /// Parse a single bucket manifest (YAML or JSON, which is a YAML subset).
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.len() > max_manifest_bytes() {
            return Err(anyhow!("manifest too large (>{} bytes)", max_manifest_bytes()));
        }
        let val: serde_yaml::Value = serde_yaml::from_str(yaml).context("parsing YAML")?;
        let json = serde_json::to_value(val).context("converting YAML to JSON")?;
        let kind = json.get("kind").and_then(|v| v.as_str()).ok_or_else(|| anyhow!("manifest missing kind"))?;
        if kind != BUCKET_KIND {
            return Err(anyhow!("unexpected kind {} (expect {})", kind, BUCKET_KIND));
        }
        let has_name = json.get("metadata").and_then(|m| m.get("name")).and_then(Json::as_str).map(|s| !s.is_empty()).unwrap_or(false);
        if !has_name {
            return Err(anyhow!("manifest missing metadata.name"));
        }
        let bucket: Bucket = serde_json::from_value(json).context("decoding bucket spec")?;
        tracing::debug!(bucket = %bucket.metadata.name, "bucket manifest loaded");
        Ok(bucket)
    }
}

fn max_manifest_bytes() -> usize {
    std::env::var("KEEL_MAX_MANIFEST_BYTES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1_000_000)
}
