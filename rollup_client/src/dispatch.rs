//! The poll → process → report loop.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, info};
use wallet_core::{FinishStatus, Output, Request};
use wallet_program::Router;

use crate::RollupError;

/// The coordinator as seen by the dispatch loop.
pub trait Rollup {
    /// Report the previous request's status and wait for the next request.
    /// `None` means nothing is pending yet.
    fn finish(
        &mut self,
        status: FinishStatus,
    ) -> impl Future<Output = Result<Option<Request>, RollupError>> + Send;

    /// Deliver one notice, voucher or report.
    fn emit(&mut self, output: &Output) -> impl Future<Output = Result<(), RollupError>> + Send;
}

/// Drives requests through the [`Router`] one at a time, in coordinator order.
pub struct Dispatcher<R> {
    rollup: R,
    router: Router,
    status: FinishStatus,
    poll_interval: Duration,
}

impl<R: Rollup> Dispatcher<R> {
    pub fn new(rollup: R, router: Router) -> Self {
        Self {
            rollup,
            router,
            status: FinishStatus::Accept,
            poll_interval: Duration::ZERO,
        }
    }

    /// Pause between polls when the coordinator has nothing pending.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn rollup(&self) -> &R {
        &self.rollup
    }

    /// Status that will be sent with the next `/finish`.
    pub fn status(&self) -> FinishStatus {
        self.status
    }

    /// Run one cycle. Returns whether a request was processed.
    ///
    /// Only a failed `/finish` is an error; undelivered outputs are logged.
    pub async fn step(&mut self) -> Result<bool, RollupError> {
        let Some(request) = self.rollup.finish(self.status).await? else {
            debug!("no request pending");
            if !self.poll_interval.is_zero() {
                tokio::time::sleep(self.poll_interval).await;
            }
            return Ok(false);
        };

        let outcome = self.router.process(&request);
        for output in &outcome.outputs {
            if let Err(e) = self.rollup.emit(output).await {
                error!(error = %e, "failed to deliver output");
            }
        }
        self.status = outcome.status;
        Ok(true)
    }

    /// Loop forever; returns only when the coordinator becomes unreachable.
    pub async fn run(mut self) -> Result<(), RollupError> {
        info!(poll_interval = ?self.poll_interval, "dispatch loop started");
        loop {
            self.step().await?;
        }
    }
}
