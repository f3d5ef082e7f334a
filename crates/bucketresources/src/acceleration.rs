//! Transfer acceleration facet. Reset means putting `Suspended`.

use std::sync::Arc;

use keel_core::{AccelerateConfiguration, AccelerateStatus, Bucket};
use keel_s3::{self as s3, BucketClient};
use metrics::counter;
use tracing::{debug, info};

use crate::status::{classify_value, ResourceStatus};
use crate::{CallContext, ExternalUpdate, FacetError, FacetKind, FacetResult, SubResourceClient};

const ERR_GET: &str = "cannot get bucket accelerate configuration";
const ERR_PUT: &str = "cannot put bucket acceleration configuration";
const ERR_DELETE: &str = "cannot delete bucket acceleration configuration";

pub struct AccelerateConfigurationClient {
    config: Option<AccelerateConfiguration>,
    client: Arc<dyn BucketClient>,
}

impl AccelerateConfigurationClient {
    pub fn new(bucket: &Bucket, client: Arc<dyn BucketClient>) -> Self {
        Self { config: bucket.params().accelerate_configuration.clone(), client }
    }

    async fn fetch(&self, ctx: &CallContext, name: &str) -> FacetResult<s3::AccelerateConfiguration> {
        let input = s3::GetBucketAccelerateConfigurationInput { bucket: name.to_string() };
        ctx.run(ERR_GET, self.client.get_bucket_accelerate_configuration(input)).await?.map_err(|e| FacetError::transport(ERR_GET, e))
    }
}

pub fn generate_accelerate_configuration(config: &AccelerateConfiguration) -> s3::AccelerateConfiguration {
    let status = match config.status {
        AccelerateStatus::Enabled => s3::BucketAccelerateStatus::Enabled,
        AccelerateStatus::Suspended => s3::BucketAccelerateStatus::Suspended,
    };
    s3::AccelerateConfiguration { status: Some(status) }
}

pub fn generate_put_bucket_accelerate(name: &str, config: &AccelerateConfiguration) -> s3::PutBucketAccelerateConfigurationInput {
    s3::PutBucketAccelerateConfigurationInput { bucket: name.to_string(), accelerate_configuration: generate_accelerate_configuration(config) }
}

fn is_default(v: &s3::AccelerateConfiguration) -> bool {
    matches!(v.status, None | Some(s3::BucketAccelerateStatus::Suspended))
}

#[async_trait::async_trait]
impl SubResourceClient for AccelerateConfigurationClient {
    fn kind(&self) -> FacetKind { FacetKind::Acceleration }

    async fn late_initialize(&self, ctx: &CallContext, bucket: &mut Bucket) -> FacetResult<()> {
        if bucket.params().accelerate_configuration.is_some() {
            return Ok(());
        }
        let external = self.fetch(ctx, bucket.external_name()).await?;
        let status = match external.status {
            Some(s3::BucketAccelerateStatus::Enabled) => AccelerateStatus::Enabled,
            Some(s3::BucketAccelerateStatus::Suspended) => AccelerateStatus::Suspended,
            None => return Ok(()),
        };
        bucket.params_mut().accelerate_configuration = Some(AccelerateConfiguration { status });
        Ok(())
    }

    async fn observe(&self, ctx: &CallContext, bucket: &Bucket) -> FacetResult<ResourceStatus> {
        let observed = self.fetch(ctx, bucket.external_name()).await?;
        let desired = self.config.as_ref().map(generate_accelerate_configuration);
        let status = classify_value(desired.as_ref(), &observed, is_default);
        debug!(bucket = %bucket.external_name(), facet = "acceleration", observed = ?observed.status, verdict = %status, "observed");
        counter!("facet_observe_total", 1u64, "facet" => "acceleration", "verdict" => status.as_str());
        Ok(status)
    }

    async fn create_or_update(&self, ctx: &CallContext, bucket: &Bucket) -> FacetResult<ExternalUpdate> {
        let Some(config) = self.config.as_ref() else {
            return Ok(ExternalUpdate::default());
        };
        let input = generate_put_bucket_accelerate(bucket.external_name(), config);
        ctx.run(ERR_PUT, self.client.put_bucket_accelerate_configuration(input)).await?.map_err(|e| FacetError::transport(ERR_PUT, e))?;
        info!(bucket = %bucket.external_name(), facet = "acceleration", status = ?config.status, "acceleration updated");
        counter!("facet_put_total", 1u64, "facet" => "acceleration");
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, ctx: &CallContext, bucket: &Bucket) -> FacetResult<()> {
        let input = s3::PutBucketAccelerateConfigurationInput {
            bucket: bucket.external_name().to_string(),
            accelerate_configuration: s3::AccelerateConfiguration { status: Some(s3::BucketAccelerateStatus::Suspended) },
        };
        ctx.run(ERR_DELETE, self.client.put_bucket_accelerate_configuration(input)).await?.map_err(|e| FacetError::transport(ERR_DELETE, e))?;
        info!(bucket = %bucket.external_name(), facet = "acceleration", "acceleration suspended");
        counter!("facet_delete_total", 1u64, "facet" => "acceleration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BucketBuilder, BUCKET_NAME};
    use keel_s3::fake::{Call, FakeBucketClient, Operation};
    use keel_s3::S3Error;

    #[tokio::test]
    async fn observe_matrix() {
        use s3::BucketAccelerateStatus as W;
        let cases = [
            (None, None, ResourceStatus::Updated),
            (None, Some(W::Suspended), ResourceStatus::Updated),
            (None, Some(W::Enabled), ResourceStatus::NeedsDeletion),
            (Some(AccelerateStatus::Enabled), None, ResourceStatus::NeedsUpdate),
            (Some(AccelerateStatus::Enabled), Some(W::Suspended), ResourceStatus::NeedsUpdate),
            (Some(AccelerateStatus::Enabled), Some(W::Enabled), ResourceStatus::Updated),
            (Some(AccelerateStatus::Suspended), Some(W::Suspended), ResourceStatus::Updated),
        ];
        for (declared, external, want) in cases {
            let mut fake = FakeBucketClient::new().with_bucket(BUCKET_NAME);
            if let Some(s) = external {
                fake = fake.with_accelerate(BUCKET_NAME, s);
            }
            let fake = Arc::new(fake);
            let mut builder = BucketBuilder::new();
            if let Some(status) = declared {
                builder = builder.acceleration(AccelerateConfiguration { status });
            }
            let b = builder.build();
            let got = AccelerateConfigurationClient::new(&b, fake).observe(&CallContext::new(), &b).await.unwrap();
            assert_eq!(got, want, "declared={:?} external={:?}", declared, external);
        }
    }

    #[tokio::test]
    async fn create_or_update_puts_declared_status() {
        let fake = Arc::new(FakeBucketClient::new().with_bucket(BUCKET_NAME));
        let b = BucketBuilder::new().acceleration(AccelerateConfiguration { status: AccelerateStatus::Enabled }).build();
        AccelerateConfigurationClient::new(&b, fake.clone()).create_or_update(&CallContext::new(), &b).await.unwrap();
        assert_eq!(
            fake.mutations(),
            vec![Call::PutBucketAccelerate {
                bucket: BUCKET_NAME.into(),
                configuration: s3::AccelerateConfiguration { status: Some(s3::BucketAccelerateStatus::Enabled) },
            }]
        );
    }

    #[tokio::test]
    async fn late_initialize_adopts_external_status_once() {
        let fake = Arc::new(FakeBucketClient::new().with_accelerate(BUCKET_NAME, s3::BucketAccelerateStatus::Enabled));
        let mut b = BucketBuilder::new().build();
        let c = AccelerateConfigurationClient::new(&b, fake.clone());
        c.late_initialize(&CallContext::new(), &mut b).await.unwrap();
        assert_eq!(b.params().accelerate_configuration, Some(AccelerateConfiguration { status: AccelerateStatus::Enabled }));

        // Declared value wins; no call is made.
        fake.clear_calls();
        let mut declared = BucketBuilder::new().acceleration(AccelerateConfiguration { status: AccelerateStatus::Suspended }).build();
        c.late_initialize(&CallContext::new(), &mut declared).await.unwrap();
        assert_eq!(declared.params().accelerate_configuration, Some(AccelerateConfiguration { status: AccelerateStatus::Suspended }));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn delete_wraps_errors() {
        let fake = Arc::new(FakeBucketClient::new().with_bucket(BUCKET_NAME));
        fake.fail_next(Operation::PutBucketAccelerate, S3Error::api("InvalidRequest", "not supported in region"));
        let b = BucketBuilder::new().build();
        let err = AccelerateConfigurationClient::new(&b, fake.clone()).delete(&CallContext::new(), &b).await.unwrap_err();
        assert_eq!(err.to_string(), "cannot delete bucket acceleration configuration: api error InvalidRequest: not supported in region");
    }
}
