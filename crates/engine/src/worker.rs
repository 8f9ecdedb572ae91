use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use abasto_core::domain::job::{JobKind, ScheduledJob};
use abasto_core::domain::preorder::{PreOrderStatus, ResponseTrigger};
use abasto_db::repositories::{JobQueue, PreOrderRepository};

use crate::errors::EngineError;
use crate::resolver::ResponseResolver;

/// Jobs dispatched in one worker tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub dispatched: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Polls the durable queue and dispatches due jobs. Delivery is
/// at-least-once; both job kinds tolerate being handed the same pre-order
/// twice.
pub struct JobWorker {
    jobs: Arc<dyn JobQueue>,
    pre_orders: Arc<dyn PreOrderRepository>,
    resolver: Arc<ResponseResolver>,
    poll_interval: Duration,
}

impl JobWorker {
    pub fn new(
        jobs: Arc<dyn JobQueue>,
        pre_orders: Arc<dyn PreOrderRepository>,
        resolver: Arc<ResponseResolver>,
        poll_interval: Duration,
    ) -> Self {
        Self { jobs, pre_orders, resolver, poll_interval }
    }

    /// Poll loop. Runs until the task is dropped or cancelled from outside.
    pub async fn run(&self) {
        tracing::info!(
            event_name = "negotiation.worker.started",
            poll_interval_secs = self.poll_interval.as_secs(),
            "job worker started"
        );
        loop {
            match self.tick(Utc::now()).await {
                Ok(summary) if summary.dispatched > 0 => {
                    tracing::debug!(
                        event_name = "negotiation.worker.tick",
                        dispatched = summary.dispatched,
                        completed = summary.completed,
                        failed = summary.failed,
                        "worker tick"
                    );
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::error!(
                        event_name = "negotiation.worker.tick_failed",
                        error = %error,
                        "worker tick failed"
                    );
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Dispatch every job due at `now`. Split out from `run` so tests can
    /// drive the clock by hand.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickSummary, EngineError> {
        let due = self.jobs.due(now).await?;
        let mut summary = TickSummary { dispatched: due.len(), ..TickSummary::default() };

        for job in due {
            match job.kind {
                JobKind::Timeout => self.dispatch_timeout(&job, &mut summary).await?,
                JobKind::ProcessResponse => {
                    self.dispatch_process_response(&job, &mut summary).await?
                }
            }
        }
        Ok(summary)
    }

    async fn dispatch_timeout(
        &self,
        job: &ScheduledJob,
        summary: &mut TickSummary,
    ) -> Result<(), EngineError> {
        let outcome = self
            .resolver
            .handle_provider_response(
                &job.pre_order_id,
                &[],
                &[],
                ResponseTrigger::Timeout,
                job.instance,
            )
            .await;
        match outcome {
            Ok(_) => {
                self.jobs.complete(&job.id).await?;
                summary.completed += 1;
            }
            Err(error) => {
                tracing::error!(
                    event_name = "negotiation.worker.timeout_failed",
                    job_id = %job.id.0,
                    pre_order_id = %job.pre_order_id.0,
                    error = %error,
                    "timeout dispatch failed"
                );
                self.jobs.fail(&job.id).await?;
                summary.failed += 1;
            }
        }
        Ok(())
    }

    /// A process-response job is a watchdog: the response itself arrives
    /// through the resolver directly. The job completes once its pre-order
    /// has left `pending` and otherwise stays queued for the next poll.
    async fn dispatch_process_response(
        &self,
        job: &ScheduledJob,
        summary: &mut TickSummary,
    ) -> Result<(), EngineError> {
        match self.pre_orders.find_aggregate(&job.pre_order_id).await? {
            None => {
                tracing::error!(
                    event_name = "negotiation.worker.orphan_job",
                    job_id = %job.id.0,
                    pre_order_id = %job.pre_order_id.0,
                    "job references a missing pre-order"
                );
                self.jobs.fail(&job.id).await?;
                summary.failed += 1;
            }
            Some(aggregate) if aggregate.pre_order.status != PreOrderStatus::Pending => {
                self.jobs.complete(&job.id).await?;
                summary.completed += 1;
            }
            Some(_) => {}
        }
        Ok(())
    }
}
