//! Tag-set facet.

use std::sync::Arc;

use keel_core::{Bucket, Tagging};
use keel_s3::{self as s3, tagging_not_found, BucketClient};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::status::{classify_set, ResourceStatus};
use crate::{CallContext, ExternalUpdate, FacetError, FacetKind, FacetResult, SubResourceClient};

const ERR_GET: &str = "cannot get bucket tagging";
const ERR_PUT: &str = "cannot put bucket tagging";
const ERR_DELETE: &str = "cannot delete bucket tagging configuration";

pub const MAX_TAGS: usize = 50;
pub const MAX_KEY_CHARS: usize = 128;
pub const MAX_VALUE_CHARS: usize = 256;
const RESERVED_PREFIX: &str = "aws:";

static TAG_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\p{L}\p{Z}\p{N}_.:/=+\-@]*$").expect("static tag regex"));

/// Reconciles the bucket's tag set. The whole set is replaced on every write.
pub struct TaggingConfigurationClient {
    config: Option<Tagging>,
    client: Arc<dyn BucketClient>,
}

impl TaggingConfigurationClient {
    pub fn new(bucket: &Bucket, client: Arc<dyn BucketClient>) -> Self {
        Self { config: bucket.params().bucket_tagging.clone(), client }
    }
}

fn validate_tag(tag: &keel_core::Tag) -> FacetResult<()> {
    let key_chars = tag.key.chars().count();
    if key_chars == 0 {
        return Err(FacetError::Invalid("tag key must not be empty".into()));
    }
    if key_chars > MAX_KEY_CHARS {
        return Err(FacetError::Invalid(format!("tag key {:?} longer than {} characters", tag.key, MAX_KEY_CHARS)));
    }
    if tag.value.chars().count() > MAX_VALUE_CHARS {
        return Err(FacetError::Invalid(format!("value of tag {:?} longer than {} characters", tag.key, MAX_VALUE_CHARS)));
    }
    if tag.key.to_ascii_lowercase().starts_with(RESERVED_PREFIX) {
        return Err(FacetError::Invalid(format!("tag key {:?} uses reserved prefix {}", tag.key, RESERVED_PREFIX)));
    }
    if !TAG_CHARS.is_match(&tag.key) || !TAG_CHARS.is_match(&tag.value) {
        return Err(FacetError::Invalid(format!("tag {:?} contains unsupported characters", tag.key)));
    }
    Ok(())
}

/// Wire tag set for the declared configuration. Absent or empty declarations both yield an
/// empty (never missing) tag set.
pub fn generate_tagging(config: Option<&Tagging>) -> FacetResult<s3::Tagging> {
    let Some(config) = config else {
        return Ok(s3::Tagging { tag_set: Vec::new() });
    };
    if config.tag_set.len() > MAX_TAGS {
        return Err(FacetError::Invalid(format!("{} tags declared, at most {} allowed", config.tag_set.len(), MAX_TAGS)));
    }
    let mut tag_set = Vec::with_capacity(config.tag_set.len());
    for t in &config.tag_set {
        validate_tag(t)?;
        tag_set.push(s3::Tag::new(t.key.clone(), t.value.clone()));
    }
    Ok(s3::Tagging { tag_set })
}

pub fn generate_put_bucket_tagging(name: &str, config: Option<&Tagging>) -> FacetResult<s3::PutBucketTaggingInput> {
    Ok(s3::PutBucketTaggingInput { bucket: name.to_string(), tagging: generate_tagging(config)? })
}

#[async_trait::async_trait]
impl SubResourceClient for TaggingConfigurationClient {
    fn kind(&self) -> FacetKind { FacetKind::Tagging }

    /// Intentionally a no-op: tags found on a pre-existing bucket are not adopted into an
    /// unset declaration, so an unmanaged tag set is reported as `NeedsDeletion`.
    // TODO: adopt external tags into an unset bucketTagging once brownfield tag ownership is settled.
    async fn late_initialize(&self, _ctx: &CallContext, _bucket: &mut Bucket) -> FacetResult<()> {
        Ok(())
    }

    async fn observe(&self, ctx: &CallContext, bucket: &Bucket) -> FacetResult<ResourceStatus> {
        let desired = self.config.as_ref().map(|c| generate_tagging(Some(c))).transpose()?;
        let name = bucket.external_name();
        let res = ctx.run(ERR_GET, self.client.get_bucket_tagging(s3::GetBucketTaggingInput { bucket: name.to_string() })).await?;
        let observed = match res {
            Ok(out) => Some(out.tag_set),
            Err(e) if tagging_not_found(&e) => None,
            Err(e) => return Err(FacetError::transport(ERR_GET, e)),
        };
        let status = classify_set(desired.as_ref().map(|t| t.tag_set.as_slice()), observed.as_deref());
        debug!(bucket = %name, facet = "tagging", observed = ?observed.as_ref().map(Vec::len), verdict = %status, "observed");
        counter!("facet_observe_total", 1u64, "facet" => "tagging", "verdict" => status.as_str());
        Ok(status)
    }

    async fn create_or_update(&self, ctx: &CallContext, bucket: &Bucket) -> FacetResult<ExternalUpdate> {
        let Some(config) = self.config.as_ref() else {
            return Ok(ExternalUpdate::default());
        };
        let input = generate_put_bucket_tagging(bucket.external_name(), Some(config))?;
        let count = input.tagging.tag_set.len();
        ctx.run(ERR_PUT, self.client.put_bucket_tagging(input)).await?.map_err(|e| FacetError::transport(ERR_PUT, e))?;
        info!(bucket = %bucket.external_name(), facet = "tagging", tags = count, "tag set replaced");
        counter!("facet_put_total", 1u64, "facet" => "tagging");
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, ctx: &CallContext, bucket: &Bucket) -> FacetResult<()> {
        let input = s3::DeleteBucketTaggingInput { bucket: bucket.external_name().to_string() };
        match ctx.run(ERR_DELETE, self.client.delete_bucket_tagging(input)).await? {
            Ok(()) => {}
            Err(e) if tagging_not_found(&e) => debug!(bucket = %bucket.external_name(), "tag set already absent"),
            Err(e) => return Err(FacetError::transport(ERR_DELETE, e)),
        }
        info!(bucket = %bucket.external_name(), facet = "tagging", "tag set deleted");
        counter!("facet_delete_total", 1u64, "facet" => "tagging");
        Ok(())
    }
}
