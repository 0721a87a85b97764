mod client;
mod manager;

pub use client::{EtherscanClient, ExplorerApi, ExplorerError, ExplorerResponse};
pub use manager::{SubmitOutcome, VerificationManager, VerificationStatus};
