//! Keel bucket resources: per-facet reconcilers for a managed object-storage bucket.
//!
//! Each facet (tag set, versioning, transfer acceleration) implements
//! [`SubResourceClient`]. A control loop outside this crate calls `observe` and, based on
//! the returned [`ResourceStatus`], `create_or_update` or `delete`. [`converge`] runs one
//! such pass over every facet.

#![forbid(unsafe_code)]

mod acceleration;
mod context;
mod converge;
mod error;
mod facet;
pub mod status;
mod tagging;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
mod versioning;

pub use acceleration::{generate_accelerate_configuration, generate_put_bucket_accelerate, AccelerateConfigurationClient};
pub use context::CallContext;
pub use converge::{converge, Action, ConvergeOptions, FacetOutcome, PassReport};
pub use error::{FacetError, FacetResult};
pub use facet::{facet_clients, ExternalUpdate, FacetClient, FacetKind, SubResourceClient};
pub use status::ResourceStatus;
pub use tagging::{generate_put_bucket_tagging, generate_tagging, TaggingConfigurationClient};
pub use versioning::{generate_put_bucket_versioning, generate_versioning_configuration, VersioningConfigurationClient};

pub use tokio_util::sync::CancellationToken;
