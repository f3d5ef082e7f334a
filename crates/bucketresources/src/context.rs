//! Per-pass call context: cancellation and deadline for every transport call.

use std::future::Future;
use std::time::Duration;

use keel_s3::S3Result;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::FacetError;

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self { Self::default() }

    /// A timeout too large to represent as an instant leaves the context without a deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(d) => self.with_deadline(d),
            None => self,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Share cancellation with the caller's token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn deadline(&self) -> Option<Instant> { self.deadline }

    pub fn cancel(&self) { self.cancel.cancel(); }

    pub fn is_cancelled(&self) -> bool { self.cancel.is_cancelled() }

    /// Run one transport call under this context. The outer error is cancellation or
    /// deadline expiry; the inner result is the transport's own answer.
    pub(crate) async fn run<T, F>(&self, op: &'static str, call: F) -> Result<S3Result<T>, FacetError>
    where
        F: Future<Output = S3Result<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(FacetError::Cancelled { op });
        }
        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FacetError::Cancelled { op }),
            _ = deadline => Err(FacetError::DeadlineExceeded { op }),
            res = call => Ok(res),
        }
    }
}
