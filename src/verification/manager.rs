use super::client::{ExplorerApi, ExplorerError, ExplorerResponse};
use crate::{chains::Chain, types::VerificationRequest};
use std::sync::Arc;

// Explorer phrasing the protocol keys on.
const ALREADY_VERIFIED: &str = "already verified";
const PASS: &str = "Pass - Verified";
const PENDING: &str = "Pending in queue";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The explorer knows the contract already; terminal success.
    AlreadyVerified,
    /// Accepted for processing; poll with the returned GUID.
    Submitted { guid: String },
    /// The explorer refused the submission outright.
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    Verified,
    Pending,
    Failed(String),
}

/// Drives the explorer's two-step verification protocol. Polling cadence is
/// owned by the sweeper; nothing here blocks waiting for the explorer.
pub struct VerificationManager {
    explorer: Arc<dyn ExplorerApi>,
}

impl VerificationManager {
    pub fn new(explorer: Arc<dyn ExplorerApi>) -> Self {
        Self { explorer }
    }

    pub async fn submit(
        &self,
        chain: &Chain,
        request: &VerificationRequest,
    ) -> Result<SubmitOutcome, ExplorerError> {
        let response = self.explorer.verify_source_code(chain, request).await?;
        Ok(submit_outcome(response))
    }

    pub async fn poll(
        &self,
        chain: &Chain,
        guid: &str,
    ) -> Result<VerificationStatus, ExplorerError> {
        let response = self.explorer.check_verify_status(chain, guid).await?;
        Ok(poll_status(response))
    }
}

fn mentions_already_verified(response: &ExplorerResponse) -> bool {
    response.result.to_lowercase().contains(ALREADY_VERIFIED)
        || response.message.to_lowercase().contains(ALREADY_VERIFIED)
}

fn submit_outcome(response: ExplorerResponse) -> SubmitOutcome {
    if mentions_already_verified(&response) {
        return SubmitOutcome::AlreadyVerified;
    }
    if response.status == "1" {
        SubmitOutcome::Submitted {
            guid: response.result,
        }
    } else {
        SubmitOutcome::Rejected {
            reason: response.result,
        }
    }
}

fn poll_status(response: ExplorerResponse) -> VerificationStatus {
    if response.result.starts_with(PASS) || mentions_already_verified(&response) {
        VerificationStatus::Verified
    } else if response.result.contains(PENDING) {
        VerificationStatus::Pending
    } else {
        VerificationStatus::Failed(response.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn response(status: &str, message: &str, result: &str) -> ExplorerResponse {
        ExplorerResponse {
            status: status.to_string(),
            message: message.to_string(),
            result: result.to_string(),
        }
    }

    #[test]
    fn submit_outcomes() {
        assert_eq!(
            submit_outcome(response("1", "OK", "ezq878u486pzijkvvmerl6a9mzwhv6sefgvqi5tkwceejc7tvn")),
            SubmitOutcome::Submitted {
                guid: "ezq878u486pzijkvvmerl6a9mzwhv6sefgvqi5tkwceejc7tvn".to_string()
            }
        );
        assert_eq!(
            submit_outcome(response("0", "NOTOK", "Contract source code already verified")),
            SubmitOutcome::AlreadyVerified
        );
        assert_eq!(
            submit_outcome(response("0", "NOTOK", "Missing or invalid ApiKey")),
            SubmitOutcome::Rejected {
                reason: "Missing or invalid ApiKey".to_string()
            }
        );
    }

    #[test]
    fn poll_statuses() {
        assert_eq!(
            poll_status(response("1", "OK", "Pass - Verified")),
            VerificationStatus::Verified
        );
        assert_eq!(
            poll_status(response("0", "NOTOK", "Pending in queue")),
            VerificationStatus::Pending
        );
        assert_eq!(
            poll_status(response("0", "NOTOK", "Already Verified")),
            VerificationStatus::Verified
        );
        assert_eq!(
            poll_status(response("0", "NOTOK", "Fail - Unable to verify")),
            VerificationStatus::Failed("Fail - Unable to verify".to_string())
        );
    }
}
