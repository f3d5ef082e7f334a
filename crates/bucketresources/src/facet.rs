use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use keel_core::Bucket;
use keel_s3::BucketClient;
use serde::{Deserialize, Serialize};

use crate::{AccelerateConfigurationClient, CallContext, FacetResult, ResourceStatus, TaggingConfigurationClient, VersioningConfigurationClient};

/// The managed facets of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetKind {
    Tagging,
    Versioning,
    Acceleration,
}

impl FacetKind {
    pub const ALL: [FacetKind; 3] = [FacetKind::Tagging, FacetKind::Versioning, FacetKind::Acceleration];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tagging => "tagging",
            Self::Versioning => "versioning",
            Self::Acceleration => "acceleration",
        }
    }
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Extra information produced by a successful write. No facet currently publishes any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalUpdate {
    pub connection_details: BTreeMap<String, Vec<u8>>,
}

/// Convergence contract every bucket facet implements.
///
/// Instances are built per reconciliation pass from the declared snapshot and dropped
/// afterwards; they hold no state across passes. `observe` never mutates the external
/// system, `create_or_update` and `delete` are externally idempotent.
#[async_trait::async_trait]
pub trait SubResourceClient: Send + Sync {
    fn kind(&self) -> FacetKind;

    /// Fill declared fields the user left unset from server-side state. Never overwrites a
    /// declared value; a no-op when the external facet does not exist.
    async fn late_initialize(&self, ctx: &CallContext, bucket: &mut Bucket) -> FacetResult<()>;

    /// Compare external state with the declared state. Performs no mutation.
    async fn observe(&self, ctx: &CallContext, bucket: &Bucket) -> FacetResult<ResourceStatus>;

    /// Write the complete declared state. A no-op when the facet is not declared.
    async fn create_or_update(&self, ctx: &CallContext, bucket: &Bucket) -> FacetResult<ExternalUpdate>;

    /// Reset the facet to the external default, whatever is declared.
    async fn delete(&self, ctx: &CallContext, bucket: &Bucket) -> FacetResult<()>;
}

/// Closed set of facet reconcilers.
pub enum FacetClient {
    Tagging(TaggingConfigurationClient),
    Versioning(VersioningConfigurationClient),
    Acceleration(AccelerateConfigurationClient),
}

impl FacetClient {
    pub fn new(kind: FacetKind, bucket: &Bucket, client: Arc<dyn BucketClient>) -> Self {
        match kind {
            FacetKind::Tagging => Self::Tagging(TaggingConfigurationClient::new(bucket, client)),
            FacetKind::Versioning => Self::Versioning(VersioningConfigurationClient::new(bucket, client)),
            FacetKind::Acceleration => Self::Acceleration(AccelerateConfigurationClient::new(bucket, client)),
        }
    }

    fn inner(&self) -> &dyn SubResourceClient {
        match self {
            Self::Tagging(c) => c,
            Self::Versioning(c) => c,
            Self::Acceleration(c) => c,
        }
    }
}

#[async_trait::async_trait]
impl SubResourceClient for FacetClient {
    fn kind(&self) -> FacetKind { self.inner().kind() }

    async fn late_initialize(&self, ctx: &CallContext, bucket: &mut Bucket) -> FacetResult<()> {
        self.inner().late_initialize(ctx, bucket).await
    }

    async fn observe(&self, ctx: &CallContext, bucket: &Bucket) -> FacetResult<ResourceStatus> {
        self.inner().observe(ctx, bucket).await
    }

    async fn create_or_update(&self, ctx: &CallContext, bucket: &Bucket) -> FacetResult<ExternalUpdate> {
        self.inner().create_or_update(ctx, bucket).await
    }

    async fn delete(&self, ctx: &CallContext, bucket: &Bucket) -> FacetResult<()> {
        self.inner().delete(ctx, bucket).await
    }
}

/// One reconciler per facet kind for the given snapshot.
pub fn facet_clients(bucket: &Bucket, client: Arc<dyn BucketClient>) -> Vec<FacetClient> {
    FacetKind::ALL.iter().map(|k| FacetClient::new(*k, bucket, client.clone())).collect()
}
