//! Versioning facet.
//!
//! The external API has no delete for versioning: once enabled it can only be suspended,
//! so "reset to default" means putting `Suspended`, and a suspended bucket counts as
//! unconfigured.

use std::sync::Arc;

use keel_core::{Bucket, MfaDelete, VersioningConfiguration, VersioningStatus};
use keel_s3::{self as s3, BucketClient};
use metrics::counter;
use tracing::{debug, info};

use crate::status::{classify_value, ResourceStatus};
use crate::{CallContext, ExternalUpdate, FacetError, FacetKind, FacetResult, SubResourceClient};

const ERR_GET: &str = "cannot get bucket versioning";
const ERR_PUT: &str = "cannot put bucket versioning";
const ERR_DELETE: &str = "cannot delete bucket versioning configuration";

pub struct VersioningConfigurationClient {
    config: Option<VersioningConfiguration>,
    client: Arc<dyn BucketClient>,
}

impl VersioningConfigurationClient {
    pub fn new(bucket: &Bucket, client: Arc<dyn BucketClient>) -> Self {
        Self { config: bucket.params().versioning_configuration.clone(), client }
    }

    async fn fetch(&self, ctx: &CallContext, name: &str) -> FacetResult<s3::VersioningConfiguration> {
        let input = s3::GetBucketVersioningInput { bucket: name.to_string() };
        ctx.run(ERR_GET, self.client.get_bucket_versioning(input)).await?.map_err(|e| FacetError::transport(ERR_GET, e))
    }
}

fn status_to_wire(s: VersioningStatus) -> s3::BucketVersioningStatus {
    match s {
        VersioningStatus::Enabled => s3::BucketVersioningStatus::Enabled,
        VersioningStatus::Suspended => s3::BucketVersioningStatus::Suspended,
    }
}

fn status_from_wire(s: s3::BucketVersioningStatus) -> VersioningStatus {
    match s {
        s3::BucketVersioningStatus::Enabled => VersioningStatus::Enabled,
        s3::BucketVersioningStatus::Suspended => VersioningStatus::Suspended,
    }
}

fn mfa_to_wire(m: MfaDelete) -> s3::MfaDeleteStatus {
    match m {
        MfaDelete::Enabled => s3::MfaDeleteStatus::Enabled,
        MfaDelete::Disabled => s3::MfaDeleteStatus::Disabled,
    }
}

fn mfa_from_wire(m: s3::MfaDeleteStatus) -> MfaDelete {
    match m {
        s3::MfaDeleteStatus::Enabled => MfaDelete::Enabled,
        s3::MfaDeleteStatus::Disabled => MfaDelete::Disabled,
    }
}

/// What an untouched or reset bucket reports.
fn is_default(v: &s3::VersioningConfiguration) -> bool {
    matches!(v.status, None | Some(s3::BucketVersioningStatus::Suspended)) && matches!(v.mfa_delete, None | Some(s3::MfaDeleteStatus::Disabled))
}

pub fn generate_versioning_configuration(config: &VersioningConfiguration) -> s3::VersioningConfiguration {
    s3::VersioningConfiguration { status: config.status.map(status_to_wire), mfa_delete: config.mfa_delete.map(mfa_to_wire) }
}

pub fn generate_put_bucket_versioning(name: &str, config: &VersioningConfiguration) -> s3::PutBucketVersioningInput {
    s3::PutBucketVersioningInput { bucket: name.to_string(), versioning_configuration: generate_versioning_configuration(config) }
}

#[async_trait::async_trait]
impl SubResourceClient for VersioningConfigurationClient {
    fn kind(&self) -> FacetKind { FacetKind::Versioning }

    /// Adopts the external status and MFA-delete flag into whichever declared fields are unset.
    async fn late_initialize(&self, ctx: &CallContext, bucket: &mut Bucket) -> FacetResult<()> {
        let external = self.fetch(ctx, bucket.external_name()).await?;
        if external.status.is_none() && external.mfa_delete.is_none() {
            return Ok(());
        }
        let conf = bucket.params_mut().versioning_configuration.get_or_insert_with(VersioningConfiguration::default);
        if conf.status.is_none() {
            conf.status = external.status.map(status_from_wire);
        }
        if conf.mfa_delete.is_none() {
            conf.mfa_delete = external.mfa_delete.map(mfa_from_wire);
        }
        Ok(())
    }

    async fn observe(&self, ctx: &CallContext, bucket: &Bucket) -> FacetResult<ResourceStatus> {
        let observed = self.fetch(ctx, bucket.external_name()).await?;
        let desired = self.config.as_ref().map(generate_versioning_configuration);
        let status = classify_value(desired.as_ref(), &observed, is_default);
        debug!(bucket = %bucket.external_name(), facet = "versioning", observed = ?observed.status, verdict = %status, "observed");
        counter!("facet_observe_total", 1u64, "facet" => "versioning", "verdict" => status.as_str());
        Ok(status)
    }

    async fn create_or_update(&self, ctx: &CallContext, bucket: &Bucket) -> FacetResult<ExternalUpdate> {
        let Some(config) = self.config.as_ref() else {
            return Ok(ExternalUpdate::default());
        };
        let input = generate_put_bucket_versioning(bucket.external_name(), config);
        ctx.run(ERR_PUT, self.client.put_bucket_versioning(input)).await?.map_err(|e| FacetError::transport(ERR_PUT, e))?;
        info!(bucket = %bucket.external_name(), facet = "versioning", status = ?config.status, "versioning updated");
        counter!("facet_put_total", 1u64, "facet" => "versioning");
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, ctx: &CallContext, bucket: &Bucket) -> FacetResult<()> {
        let input = s3::PutBucketVersioningInput {
            bucket: bucket.external_name().to_string(),
            versioning_configuration: s3::VersioningConfiguration { status: Some(s3::BucketVersioningStatus::Suspended), mfa_delete: None },
        };
        ctx.run(ERR_DELETE, self.client.put_bucket_versioning(input)).await?.map_err(|e| FacetError::transport(ERR_DELETE, e))?;
        info!(bucket = %bucket.external_name(), facet = "versioning", "versioning suspended");
        counter!("facet_delete_total", 1u64, "facet" => "versioning");
        Ok(())
    }
}
