//! In-memory [`BucketClient`] for tests.
//!
//! Keeps per-bucket facet state, records every call in order, and can be told to fail the
//! next call of a given operation or to delay every call.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::*;

/// Facet state of one fake bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketState {
    /// `None` until tags are first put, and again after a delete.
    pub tag_set: Option<Vec<Tag>>,
    pub versioning: VersioningConfiguration,
    pub accelerate: AccelerateConfiguration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetBucketTagging,
    PutBucketTagging,
    DeleteBucketTagging,
    GetBucketVersioning,
    PutBucketVersioning,
    GetBucketAccelerate,
    PutBucketAccelerate,
}

impl Operation {
    pub fn is_mutation(self) -> bool {
        matches!(self, Self::PutBucketTagging | Self::DeleteBucketTagging | Self::PutBucketVersioning | Self::PutBucketAccelerate)
    }
}

/// A recorded request, including the payload of writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetBucketTagging { bucket: String },
    PutBucketTagging { bucket: String, tag_set: Vec<Tag> },
    DeleteBucketTagging { bucket: String },
    GetBucketVersioning { bucket: String },
    PutBucketVersioning { bucket: String, configuration: VersioningConfiguration },
    GetBucketAccelerate { bucket: String },
    PutBucketAccelerate { bucket: String, configuration: AccelerateConfiguration },
}

impl Call {
    pub fn operation(&self) -> Operation {
        match self {
            Call::GetBucketTagging { .. } => Operation::GetBucketTagging,
            Call::PutBucketTagging { .. } => Operation::PutBucketTagging,
            Call::DeleteBucketTagging { .. } => Operation::DeleteBucketTagging,
            Call::GetBucketVersioning { .. } => Operation::GetBucketVersioning,
            Call::PutBucketVersioning { .. } => Operation::PutBucketVersioning,
            Call::GetBucketAccelerate { .. } => Operation::GetBucketAccelerate,
            Call::PutBucketAccelerate { .. } => Operation::PutBucketAccelerate,
        }
    }
}

#[derive(Default)]
struct FakeState {
    buckets: BTreeMap<String, BucketState>,
    calls: Vec<Call>,
    failures: HashMap<Operation, VecDeque<S3Error>>,
}

#[derive(Default)]
pub struct FakeBucketClient {
    state: Mutex<FakeState>,
    latency: Option<Duration>,
}

impl FakeBucketClient {
    pub fn new() -> Self { Self::default() }

    /// Add an empty bucket.
    pub fn with_bucket(self, name: &str) -> Self {
        self.lock().buckets.entry(name.to_string()).or_default();
        self
    }

    /// Add a bucket that already carries the given tags.
    pub fn with_tags(self, name: &str, tags: Vec<Tag>) -> Self {
        self.lock().buckets.entry(name.to_string()).or_default().tag_set = Some(tags);
        self
    }

    pub fn with_versioning(self, name: &str, configuration: VersioningConfiguration) -> Self {
        self.lock().buckets.entry(name.to_string()).or_default().versioning = configuration;
        self
    }

    pub fn with_accelerate(self, name: &str, status: BucketAccelerateStatus) -> Self {
        self.lock().buckets.entry(name.to_string()).or_default().accelerate = AccelerateConfiguration { status: Some(status) };
        self
    }

    /// Delay every call by `latency` before it touches state.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next call of `op` fail with `err`. Queued failures are consumed in order.
    pub fn fail_next(&self, op: Operation, err: S3Error) {
        self.lock().failures.entry(op).or_default().push_back(err);
    }

    /// Change external state behind the reconciler's back.
    pub fn set_tags(&self, name: &str, tags: Option<Vec<Tag>>) {
        self.lock().buckets.entry(name.to_string()).or_default().tag_set = tags;
    }

    pub fn bucket(&self, name: &str) -> Option<BucketState> { self.lock().buckets.get(name).cloned() }

    pub fn tags(&self, name: &str) -> Option<Vec<Tag>> { self.lock().buckets.get(name).and_then(|b| b.tag_set.clone()) }

    pub fn calls(&self) -> Vec<Call> { self.lock().calls.clone() }

    pub fn mutations(&self) -> Vec<Call> { self.lock().calls.iter().filter(|c| c.operation().is_mutation()).cloned().collect() }

    pub fn clear_calls(&self) { self.lock().calls.clear(); }

    fn lock(&self) -> MutexGuard<'_, FakeState> { self.state.lock().unwrap_or_else(PoisonError::into_inner) }

    async fn enter(&self, call: Call) -> S3Result<()> {
        if let Some(d) = self.latency {
            tokio::time::sleep(d).await;
        }
        let mut st = self.lock();
        let op = call.operation();
        tracing::trace!(?op, "fake bucket call");
        st.calls.push(call);
        match st.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn with_state<T>(&self, bucket: &str, f: impl FnOnce(&mut BucketState) -> S3Result<T>) -> S3Result<T> {
        let mut st = self.lock();
        match st.buckets.get_mut(bucket) {
            Some(b) => f(b),
            None => Err(S3Error::not_found(codes::NO_SUCH_BUCKET)),
        }
    }
}

#[async_trait::async_trait]
impl BucketClient for FakeBucketClient {
    async fn get_bucket_tagging(&self, input: GetBucketTaggingInput) -> S3Result<GetBucketTaggingOutput> {
        self.enter(Call::GetBucketTagging { bucket: input.bucket.clone() }).await?;
        self.with_state(&input.bucket, |b| match &b.tag_set {
            Some(tags) => Ok(GetBucketTaggingOutput { tag_set: tags.clone() }),
            None => Err(S3Error::not_found(codes::NO_SUCH_TAG_SET)),
        })
    }

    async fn put_bucket_tagging(&self, input: PutBucketTaggingInput) -> S3Result<()> {
        let tags = input.tagging.tag_set;
        self.enter(Call::PutBucketTagging { bucket: input.bucket.clone(), tag_set: tags.clone() }).await?;
        self.with_state(&input.bucket, |b| {
            b.tag_set = Some(tags);
            Ok(())
        })
    }

    async fn delete_bucket_tagging(&self, input: DeleteBucketTaggingInput) -> S3Result<()> {
        self.enter(Call::DeleteBucketTagging { bucket: input.bucket.clone() }).await?;
        self.with_state(&input.bucket, |b| {
            b.tag_set = None;
            Ok(())
        })
    }

    async fn get_bucket_versioning(&self, input: GetBucketVersioningInput) -> S3Result<VersioningConfiguration> {
        self.enter(Call::GetBucketVersioning { bucket: input.bucket.clone() }).await?;
        self.with_state(&input.bucket, |b| Ok(b.versioning.clone()))
    }

    async fn put_bucket_versioning(&self, input: PutBucketVersioningInput) -> S3Result<()> {
        let conf = input.versioning_configuration;
        self.enter(Call::PutBucketVersioning { bucket: input.bucket.clone(), configuration: conf.clone() }).await?;
        self.with_state(&input.bucket, |b| {
            b.versioning = conf;
            Ok(())
        })
    }

    async fn get_bucket_accelerate_configuration(&self, input: GetBucketAccelerateConfigurationInput) -> S3Result<AccelerateConfiguration> {
        self.enter(Call::GetBucketAccelerate { bucket: input.bucket.clone() }).await?;
        self.with_state(&input.bucket, |b| Ok(b.accelerate.clone()))
    }

    async fn put_bucket_accelerate_configuration(&self, input: PutBucketAccelerateConfigurationInput) -> S3Result<()> {
        let conf = input.accelerate_configuration;
        self.enter(Call::PutBucketAccelerate { bucket: input.bucket.clone(), configuration: conf.clone() }).await?;
        self.with_state(&input.bucket, |b| {
            b.accelerate = conf;
            Ok(())
        })
    }
}
