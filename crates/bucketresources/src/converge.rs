//! One reconciliation pass over every facet of a bucket.
//!
//! Late initialization runs first and sequentially since it writes into the snapshot.
//! Facets are then observed and acted on concurrently; a failing facet does not stop the
//! others. Nothing is retried here.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use keel_core::Bucket;
use keel_s3::BucketClient;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{facet_clients, CallContext, FacetClient, FacetError, FacetKind, ResourceStatus, SubResourceClient};

/// Environment-driven knobs for a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergeOptions {
    /// Deadline for the whole pass; `None` disables it.
    pub call_timeout: Option<Duration>,
}

impl Default for ConvergeOptions {
    fn default() -> Self { Self { call_timeout: Some(Duration::from_secs(30)) } }
}

impl ConvergeOptions {
    /// Reads `KEEL_CALL_TIMEOUT_SECS` (`0` disables the deadline).
    pub fn from_env() -> Self {
        let secs = std::env::var("KEEL_CALL_TIMEOUT_SECS").ok().and_then(|s| s.parse::<u64>().ok());
        match secs {
            Some(0) => Self { call_timeout: None },
            Some(s) => Self { call_timeout: Some(Duration::from_secs(s)) },
            None => Self::default(),
        }
    }

    pub fn context(&self) -> CallContext {
        match self.call_timeout {
            Some(t) => CallContext::new().with_timeout(t),
            None => CallContext::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    None,
    CreatedOrUpdated,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetOutcome {
    pub facet: FacetKind,
    /// `None` when observation failed (status unknown for this pass).
    pub verdict: Option<ResourceStatus>,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    pub bucket: String,
    /// Late initialization changed the declared snapshot; the caller should persist it.
    pub late_initialized: bool,
    pub facets: Vec<FacetOutcome>,
}

impl PassReport {
    pub fn has_errors(&self) -> bool { self.facets.iter().any(|f| f.error.is_some()) }

    /// Every facet was already in sync; nothing was written.
    pub fn is_up_to_date(&self) -> bool {
        self.facets.iter().all(|f| f.error.is_none() && f.verdict == Some(ResourceStatus::Updated))
    }

    pub fn outcome(&self, facet: FacetKind) -> Option<&FacetOutcome> { self.facets.iter().find(|f| f.facet == facet) }

    pub fn to_json(&self) -> serde_json::Result<String> { serde_json::to_string_pretty(self) }
}

fn failed(facet: FacetKind, verdict: Option<ResourceStatus>, err: &FacetError) -> FacetOutcome {
    counter!("facet_error_total", 1u64, "facet" => facet.as_str(), "kind" => err.label());
    FacetOutcome { facet, verdict, action: Action::None, error: Some(err.to_string()) }
}

async fn reconcile_facet(ctx: &CallContext, client: &FacetClient, bucket: &Bucket) -> FacetOutcome {
    let facet = client.kind();
    let verdict = match client.observe(ctx, bucket).await {
        Ok(v) => v,
        Err(e) => {
            warn!(bucket = %bucket.external_name(), facet = %facet, error = %e, "observe failed");
            return failed(facet, None, &e);
        }
    };
    let res = match verdict {
        ResourceStatus::Updated => Ok(Action::None),
        ResourceStatus::NeedsUpdate => client.create_or_update(ctx, bucket).await.map(|_| Action::CreatedOrUpdated),
        ResourceStatus::NeedsDeletion => client.delete(ctx, bucket).await.map(|_| Action::Deleted),
    };
    match res {
        Ok(action) => {
            debug!(bucket = %bucket.external_name(), facet = %facet, verdict = %verdict, ?action, "facet reconciled");
            FacetOutcome { facet, verdict: Some(verdict), action, error: None }
        }
        Err(e) => {
            warn!(bucket = %bucket.external_name(), facet = %facet, verdict = %verdict, error = %e, "facet write failed");
            failed(facet, Some(verdict), &e)
        }
    }
}

/// Run one pass: late-initialize, observe, and converge every facet of `bucket`.
pub async fn converge(ctx: &CallContext, bucket: &mut Bucket, client: Arc<dyn BucketClient>) -> PassReport {
    let t0 = std::time::Instant::now();
    let before = bucket.clone();

    let mut late_init_errors: HashMap<FacetKind, FacetError> = HashMap::new();
    for c in facet_clients(bucket, client.clone()) {
        if let Err(e) = c.late_initialize(ctx, bucket).await {
            warn!(bucket = %bucket.external_name(), facet = %c.kind(), error = %e, "late initialization failed");
            late_init_errors.insert(c.kind(), e);
        }
    }
    let late_initialized = *bucket != before;
    if late_initialized {
        info!(bucket = %bucket.external_name(), "declared state late-initialized from external bucket");
    }

    let snapshot: &Bucket = bucket;
    let clients: Vec<FacetClient> = facet_clients(snapshot, client).into_iter().filter(|c| !late_init_errors.contains_key(&c.kind())).collect();
    let mut outcomes = futures::future::join_all(clients.iter().map(|c| reconcile_facet(ctx, c, snapshot))).await;
    outcomes.extend(late_init_errors.iter().map(|(k, e)| failed(*k, None, e)));
    outcomes.sort_by_key(|o| o.facet);

    histogram!("converge_latency_ms", t0.elapsed().as_secs_f64() * 1000.0);
    PassReport { bucket: snapshot.external_name().to_string(), late_initialized, facets: outcomes }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default_has_deadline() {
        let o = ConvergeOptions::default();
        assert_eq!(o.call_timeout, Some(Duration::from_secs(30)));
        assert!(o.context().deadline().is_some());
        assert!(ConvergeOptions { call_timeout: None }.context().deadline().is_none());
    }

    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn options_with_env(value: Option<&str>) -> ConvergeOptions {
        let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let previous = std::env::var_os("KEEL_CALL_TIMEOUT_SECS");
        match value {
            Some(v) => std::env::set_var("KEEL_CALL_TIMEOUT_SECS", v),
            None => std::env::remove_var("KEEL_CALL_TIMEOUT_SECS"),
        }
        let opts = ConvergeOptions::from_env();
        match previous {
            Some(v) => std::env::set_var("KEEL_CALL_TIMEOUT_SECS", v),
            None => std::env::remove_var("KEEL_CALL_TIMEOUT_SECS"),
        }
        opts
    }

    #[test]
    fn options_from_env() {
        assert_eq!(options_with_env(None).call_timeout, Some(Duration::from_secs(30)));
        assert_eq!(options_with_env(Some("0")).call_timeout, None);
        assert_eq!(options_with_env(Some("5")).call_timeout, Some(Duration::from_secs(5)));
        assert_eq!(options_with_env(Some("soon")).call_timeout, Some(Duration::from_secs(30)));
        assert_eq!(options_with_env(Some("-1")).call_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn huge_timeout_from_env_yields_context_without_deadline() {
        let opts = options_with_env(Some("18446744073709551615"));
        assert_eq!(opts.call_timeout, Some(Duration::from_secs(u64::MAX)));
        assert!(opts.context().deadline().is_none());
    }

    #[test]
    fn report_helpers() {
        let mut r = PassReport {
            bucket: "b".into(),
            late_initialized: false,
            facets: vec![
                FacetOutcome { facet: FacetKind::Tagging, verdict: Some(ResourceStatus::Updated), action: Action::None, error: None },
                FacetOutcome { facet: FacetKind::Versioning, verdict: Some(ResourceStatus::Updated), action: Action::None, error: None },
            ],
        };
        assert!(r.is_up_to_date());
        assert!(!r.has_errors());
        r.facets[1] = FacetOutcome { facet: FacetKind::Versioning, verdict: None, action: Action::None, error: Some("boom".into()) };
        assert!(!r.is_up_to_date());
        assert!(r.has_errors());
        assert_eq!(r.outcome(FacetKind::Versioning).and_then(|o| o.error.as_deref()), Some("boom"));
        let json = r.to_json().unwrap();
        assert!(json.contains("\"facet\": \"versioning\""), "json={}", json);
    }
}
