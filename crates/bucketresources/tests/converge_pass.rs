#![forbid(unsafe_code)]

use std::sync::Arc;

use keel_bucketresources::testing::{wire_tags, BucketBuilder, BUCKET_NAME};
use keel_bucketresources::{converge, Action, CallContext, ConvergeOptions, FacetKind, ResourceStatus};
use keel_core::{AccelerateConfiguration, AccelerateStatus, Bucket, VersioningConfiguration, VersioningStatus};
use keel_s3::fake::{FakeBucketClient, Operation};
use keel_s3::{self as s3, S3Error};

fn enabled_versioning() -> VersioningConfiguration {
    VersioningConfiguration { status: Some(VersioningStatus::Enabled), mfa_delete: None }
}

#[tokio::test]
async fn fresh_bucket_converges_in_one_pass_and_is_stable() {
    let fake = Arc::new(FakeBucketClient::new().with_bucket(BUCKET_NAME));
    let mut b = BucketBuilder::new()
        .tags(&[("env", "prod")])
        .versioning(enabled_versioning())
        .acceleration(AccelerateConfiguration { status: AccelerateStatus::Enabled })
        .build();
    let ctx = ConvergeOptions::default().context();

    let first = converge(&ctx, &mut b, fake.clone()).await;
    assert!(!first.has_errors(), "{:?}", first);
    assert!(!first.late_initialized);
    for kind in FacetKind::ALL {
        let o = first.outcome(kind).unwrap();
        assert_eq!(o.verdict, Some(ResourceStatus::NeedsUpdate), "{}", kind);
        assert_eq!(o.action, Action::CreatedOrUpdated, "{}", kind);
    }

    fake.clear_calls();
    let second = converge(&ctx, &mut b, fake.clone()).await;
    assert!(second.is_up_to_date(), "{:?}", second);
    assert!(fake.mutations().is_empty());
}

#[tokio::test]
async fn unmanaged_tags_are_removed_and_brownfield_versioning_adopted() {
    let fake = Arc::new(
        FakeBucketClient::new()
            .with_tags(BUCKET_NAME, wire_tags(&[("a", "b")]))
            .with_versioning(BUCKET_NAME, s3::VersioningConfiguration { status: Some(s3::BucketVersioningStatus::Enabled), mfa_delete: None }),
    );
    let mut b = BucketBuilder::new().build();
    let report = converge(&CallContext::new(), &mut b, fake.clone()).await;

    assert!(report.late_initialized);
    assert_eq!(b.params().versioning_configuration, Some(enabled_versioning()));
    assert!(b.params().bucket_tagging.is_none());

    let tagging = report.outcome(FacetKind::Tagging).unwrap();
    assert_eq!(tagging.verdict, Some(ResourceStatus::NeedsDeletion));
    assert_eq!(tagging.action, Action::Deleted);
    assert_eq!(fake.tags(BUCKET_NAME), None);

    let versioning = report.outcome(FacetKind::Versioning).unwrap();
    assert_eq!(versioning.verdict, Some(ResourceStatus::Updated));
    assert_eq!(versioning.action, Action::None);
    assert_eq!(fake.bucket(BUCKET_NAME).unwrap().versioning.status, Some(s3::BucketVersioningStatus::Enabled));
}

#[tokio::test]
async fn failing_facet_does_not_block_others() {
    let fake = Arc::new(FakeBucketClient::new().with_bucket(BUCKET_NAME));
    fake.fail_next(Operation::GetBucketTagging, S3Error::api("InternalError", "try again"));
    let mut b = BucketBuilder::new().tags(&[("env", "prod")]).versioning(enabled_versioning()).build();
    let report = converge(&CallContext::new(), &mut b, fake.clone()).await;

    assert!(report.has_errors());
    let tagging = report.outcome(FacetKind::Tagging).unwrap();
    assert_eq!(tagging.verdict, None);
    assert_eq!(tagging.error.as_deref(), Some("cannot get bucket tagging: api error InternalError: try again"));
    assert_eq!(fake.tags(BUCKET_NAME), None);

    let versioning = report.outcome(FacetKind::Versioning).unwrap();
    assert_eq!(versioning.action, Action::CreatedOrUpdated);
    assert!(versioning.error.is_none());

    // Next pass picks up where the failed one left off; no retry happened in between.
    let report = converge(&CallContext::new(), &mut b, fake.clone()).await;
    assert_eq!(report.outcome(FacetKind::Tagging).unwrap().action, Action::CreatedOrUpdated);
    assert_eq!(fake.tags(BUCKET_NAME), Some(wire_tags(&[("env", "prod")])));
}

#[tokio::test]
async fn late_init_failure_is_reported_for_that_facet_only() {
    let fake = Arc::new(FakeBucketClient::new().with_bucket(BUCKET_NAME));
    fake.fail_next(Operation::GetBucketAccelerate, S3Error::Transport("reset".into()));
    let mut b = BucketBuilder::new().tags(&[("env", "prod")]).build();
    let report = converge(&CallContext::new(), &mut b, fake.clone()).await;

    let accel = report.outcome(FacetKind::Acceleration).unwrap();
    assert_eq!(accel.error.as_deref(), Some("cannot get bucket accelerate configuration: transport: reset"));
    assert_eq!(report.outcome(FacetKind::Tagging).unwrap().action, Action::CreatedOrUpdated);
    assert_eq!(report.facets.len(), 3);
}

#[tokio::test]
async fn report_uses_external_name_and_serializes() {
    let fake = Arc::new(FakeBucketClient::new().with_bucket("assets-7f3a"));
    let mut b: Bucket = BucketBuilder::new().external_name("assets-7f3a").tags(&[("env", "prod")]).build();
    let report = converge(&CallContext::new(), &mut b, fake.clone()).await;
    assert_eq!(report.bucket, "assets-7f3a");
    let json = report.to_json().unwrap();
    assert!(json.contains("\"created_or_updated\""), "json={}", json);
    assert!(json.contains("\"NeedsUpdate\""), "json={}", json);
}

#[tokio::test]
async fn object_name_addresses_bucket_without_annotation() {
    let fake = Arc::new(FakeBucketClient::new().with_bucket("media"));
    let mut b = BucketBuilder::new().name("media").tags(&[("env", "prod")]).build();
    let report = converge(&CallContext::new(), &mut b, fake.clone()).await;
    assert!(!report.has_errors(), "{:?}", report);
    assert_eq!(report.bucket, "media");
    assert_eq!(fake.tags("media"), Some(wire_tags(&[("env", "prod")])));
    assert_eq!(fake.tags(BUCKET_NAME), None);
}

#[tokio::test]
async fn cancelled_pass_writes_nothing() {
    let fake = Arc::new(FakeBucketClient::new().with_tags(BUCKET_NAME, wire_tags(&[("a", "b")])));
    let mut b = BucketBuilder::new().tags(&[("env", "prod")]).versioning(enabled_versioning()).build();
    let ctx = CallContext::new();
    ctx.cancel();
    let report = converge(&ctx, &mut b, fake.clone()).await;
    assert_eq!(report.facets.len(), 3);
    assert!(report.facets.iter().all(|f| f.error.as_deref().map(|e| e.ends_with("cancelled")).unwrap_or(false)), "{:?}", report);
    assert!(fake.calls().is_empty());
}
