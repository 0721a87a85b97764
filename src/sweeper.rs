use crate::{
    chains::ChainRegistry,
    storage::VerificationStore,
    types::VerificationRequest,
    verification::{SubmitOutcome, VerificationManager, VerificationStatus},
};
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;
use tokio_cron_scheduler::Job;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SweepSummary {
    /// Entries examined this sweep.
    pub swept: usize,
    /// Entries the explorer confirmed and that were removed.
    pub verified: usize,
    /// Entries still pending after the sweep.
    pub remaining: usize,
    pub errors: usize,
    pub overflow: bool,
}

/// Re-drives the verification protocol over the pending backlog. Each run is
/// idempotent: confirmed entries are deleted, everything else is retained
/// for the next sweep.
pub struct Sweeper {
    chains: ChainRegistry,
    manager: Arc<VerificationManager>,
    verifications: Arc<dyn VerificationStore>,
    backlog_warn_threshold: usize,
}

impl Sweeper {
    pub fn new(
        chains: ChainRegistry,
        manager: Arc<VerificationManager>,
        verifications: Arc<dyn VerificationStore>,
        backlog_warn_threshold: usize,
    ) -> Self {
        Self {
            chains,
            manager,
            verifications,
            backlog_warn_threshold,
        }
    }

    pub async fn sweep(&self) -> SweepSummary {
        let backlog = match self.verifications.pending().await {
            Ok(backlog) => backlog,
            Err(err) => {
                tracing::error!(err = ?err, "failed to load verification backlog");
                return SweepSummary::default();
            }
        };

        let mut summary = SweepSummary {
            swept: backlog.len(),
            ..Default::default()
        };
        for request in &backlog {
            // one bad entry must not abort the sweep of the rest
            match self.sweep_one(request).await {
                Ok(true) => summary.verified += 1,
                Ok(false) => {}
                Err(err) => {
                    summary.errors += 1;
                    tracing::error!(
                        tx = %request.deploy_tx_hash,
                        chain_id = request.chain_id,
                        err = ?err,
                        "verification attempt failed, entry retained"
                    );
                }
            }
        }

        summary.remaining = match self.verifications.pending().await {
            Ok(backlog) => backlog.len(),
            Err(_) => summary.swept - summary.verified,
        };
        if summary.remaining > self.backlog_warn_threshold {
            summary.overflow = true;
            tracing::warn!(
                remaining = summary.remaining,
                threshold = self.backlog_warn_threshold,
                "verification backlog exceeds threshold, explorer or pipeline is falling behind"
            );
        }
        summary
    }

    async fn sweep_one(&self, request: &VerificationRequest) -> anyhow::Result<bool> {
        let chain = self.chains.get(request.chain_id)?;
        match self.manager.submit(chain, request).await? {
            SubmitOutcome::AlreadyVerified => {
                self.verifications
                    .remove_pending(&request.deploy_tx_hash)
                    .await?;
                Ok(true)
            }
            SubmitOutcome::Submitted { guid } => {
                match self.manager.poll(chain, &guid).await? {
                    VerificationStatus::Verified => {
                        self.verifications
                            .remove_pending(&request.deploy_tx_hash)
                            .await?;
                        Ok(true)
                    }
                    VerificationStatus::Pending => Ok(false),
                    VerificationStatus::Failed(reason) => {
                        tracing::debug!(
                            tx = %request.deploy_tx_hash,
                            reason = %reason,
                            "explorer has not verified the contract yet"
                        );
                        Ok(false)
                    }
                }
            }
            SubmitOutcome::Rejected { reason } => {
                tracing::debug!(
                    tx = %request.deploy_tx_hash,
                    reason = %reason,
                    "explorer rejected the submission, entry retained"
                );
                Ok(false)
            }
        }
    }
}

pub fn sweep_job(schedule: &str, sweeper: Arc<Sweeper>) -> anyhow::Result<Job> {
    let job = Job::new_async(schedule, move |_uuid, mut _l| {
        let sweeper = sweeper.clone();
        Box::pin(async move {
            let summary = sweeper.sweep().await;
            tracing::info!(
                swept = summary.swept,
                verified = summary.verified,
                remaining = summary.remaining,
                errors = summary.errors,
                "verification sweep finished"
            );
        })
    })
    .context("creating verification sweep job")?;
    Ok(job)
}
