//! Keel object-storage transport boundary.
//!
//! Defines the wire representation of bucket facets and the [`BucketClient`] trait the
//! reconciler issues its calls through. Each method is one atomic request; the client does
//! not retry.

#![forbid(unsafe_code)]

mod error;
mod types;

#[cfg(feature = "fake")]
pub mod fake;

pub use error::{codes, tagging_not_found, S3Error};
pub use types::*;

pub type S3Result<T> = Result<T, S3Error>;

/// Bucket facet API consumed by the reconciler.
#[async_trait::async_trait]
pub trait BucketClient: Send + Sync {
    /// Fails with `NotFound { code: "NoSuchTagSet" }` when the bucket carries no tags.
    async fn get_bucket_tagging(&self, input: GetBucketTaggingInput) -> S3Result<GetBucketTaggingOutput>;
    /// Replaces the entire tag set.
    async fn put_bucket_tagging(&self, input: PutBucketTaggingInput) -> S3Result<()>;
    async fn delete_bucket_tagging(&self, input: DeleteBucketTaggingInput) -> S3Result<()>;

    async fn get_bucket_versioning(&self, input: GetBucketVersioningInput) -> S3Result<VersioningConfiguration>;
    async fn put_bucket_versioning(&self, input: PutBucketVersioningInput) -> S3Result<()>;

    async fn get_bucket_accelerate_configuration(&self, input: GetBucketAccelerateConfigurationInput) -> S3Result<AccelerateConfiguration>;
    async fn put_bucket_accelerate_configuration(&self, input: PutBucketAccelerateConfigurationInput) -> S3Result<()>;
}
