use chrono::{DateTime, Utc};
use ethers_solc::{artifacts::Sources, CompilerInput};
use serde::{Deserialize, Serialize};

/// A request to compile and deploy a single contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    pub chain_id: u64,
    pub contract_name: String,
    pub source_code: String,
    /// Positional constructor arguments. Nested arrays are passed as
    /// bracketed strings, e.g. `["1","2"]` for a `uint256[]` parameter.
    #[serde(default)]
    pub constructor_args: Vec<String>,
    /// Already-resolved sources, keyed by flattened file name. Allows
    /// re-deploying without re-fetching the import graph.
    #[serde(default)]
    pub imports: Option<Sources>,
}

/// Output of a successful compilation. Immutable once produced.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub abi: serde_json::Value,
    /// Creation bytecode, normalized to carry exactly one `0x` prefix.
    pub bytecode: String,
    pub standard_json_input: CompilerInput,
    pub sources: Sources,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    pub contract_address: String,
    pub deploy_tx_hash: String,
    pub explorer_url: String,
    /// Absent when the artifact upload failed; deployment itself is
    /// unaffected, only artifact browsing is.
    pub ipfs_cid: Option<String>,
    pub verification: VerificationRequest,
}

/// Everything the explorer needs to verify a deployed contract. Persisted to
/// the pending index at deploy time and re-driven by the sweeper until the
/// explorer reports success.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub deploy_tx_hash: String,
    pub contract_address: String,
    pub standard_json_input: CompilerInput,
    /// ABI-encoded constructor arguments, hex without a `0x` prefix; empty
    /// when the constructor takes no arguments.
    pub encoded_constructor_args: String,
    pub file_name: String,
    pub contract_name: String,
    pub compiler_version: String,
    pub chain_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub chain_id: u64,
    pub contract_name: String,
    pub contract_address: String,
    pub deploy_tx_hash: String,
    pub ipfs_cid: Option<String>,
    pub created_at: DateTime<Utc>,
}
