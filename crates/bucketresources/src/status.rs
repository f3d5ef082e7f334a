//! Convergence verdicts and the comparison that produces them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result of comparing a facet's observed state against its declared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceStatus {
    /// Observed matches declared, or both are absent.
    Updated,
    /// Declared is set and observed is absent or different.
    NeedsUpdate,
    /// Declared is absent but the external system holds state.
    NeedsDeletion,
}

impl ResourceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::NeedsUpdate => "needs_update",
            Self::NeedsDeletion => "needs_deletion",
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Multiset equality: order is ignored, duplicates count.
pub fn same_set<T: Ord>(a: &[T], b: &[T]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a: Vec<&T> = a.iter().collect();
    let mut b: Vec<&T> = b.iter().collect();
    a.sort();
    b.sort();
    a == b
}

/// Classify a collection-valued facet. `observed == None` is the external not-found
/// condition and counts as an empty collection.
pub fn classify_set<T: Ord>(desired: Option<&[T]>, observed: Option<&[T]>) -> ResourceStatus {
    let observed = observed.unwrap_or(&[]);
    match desired {
        None if observed.is_empty() => ResourceStatus::Updated,
        None => ResourceStatus::NeedsDeletion,
        Some(d) if same_set(d, observed) => ResourceStatus::Updated,
        Some(_) => ResourceStatus::NeedsUpdate,
    }
}

/// Classify a scalar facet. `is_default` tells whether the observed value is what the
/// external system reports for a facet nobody configured.
pub fn classify_value<T: PartialEq>(desired: Option<&T>, observed: &T, is_default: impl FnOnce(&T) -> bool) -> ResourceStatus {
    match desired {
        None if is_default(observed) => ResourceStatus::Updated,
        None => ResourceStatus::NeedsDeletion,
        Some(d) if d == observed => ResourceStatus::Updated,
        Some(_) => ResourceStatus::NeedsUpdate,
    }
}
