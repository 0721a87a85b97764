use crate::{
    analytics::{Analytics, AnalyticsEvent},
    artifacts::IpfsClient,
    chains::{ChainRegistry, UnknownChain},
    compiler::{contract_file_name, CompileError, SolcCompiler},
    imports::{ImportError, ImportResolver},
    storage::{DeploymentStore, VerificationStore},
    types::{DeploymentRecord, DeploymentRequest, DeploymentResult, VerificationRequest},
};
use chrono::Utc;
use ethabi::token::{LenientTokenizer, Tokenizer};
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{BlockId, BlockNumber, Bytes, TransactionRequest},
    utils::get_contract_address,
};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error(transparent)]
    UnknownChain(#[from] UnknownChain),
    #[error(transparent)]
    Imports(#[from] ImportError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("invalid constructor arguments: {0}")]
    ConstructorArgs(String),
    #[error("no deployer wallet is configured")]
    WalletUnavailable,
    #[error("rpc error: {0}")]
    Rpc(String),
}

impl DeployError {
    /// Pipeline stage the error belongs to; part of the error payload
    /// returned to deploy callers.
    pub fn stage(&self) -> &'static str {
        match self {
            DeployError::UnknownChain(_) => "chain",
            DeployError::Imports(_) => "imports",
            DeployError::Compile(_) => "compilation",
            DeployError::ConstructorArgs(_) => "constructor_args",
            DeployError::WalletUnavailable => "wallet",
            DeployError::Rpc(_) => "rpc",
        }
    }
}

pub struct Deployer {
    chains: ChainRegistry,
    resolver: ImportResolver,
    compiler: SolcCompiler,
    artifacts: IpfsClient,
    deployments: Arc<dyn DeploymentStore>,
    verifications: Arc<dyn VerificationStore>,
    analytics: Analytics,
    wallet: Option<LocalWallet>,
    rpc_client: reqwest::Client,
    // serializes nonce read + broadcast; concurrent deploys from the same
    // signer must not observe the same nonce
    nonce_lock: tokio::sync::Mutex<()>,
}

impl Deployer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chains: ChainRegistry,
        resolver: ImportResolver,
        compiler: SolcCompiler,
        artifacts: IpfsClient,
        deployments: Arc<dyn DeploymentStore>,
        verifications: Arc<dyn VerificationStore>,
        analytics: Analytics,
        wallet: Option<LocalWallet>,
        rpc_client: reqwest::Client,
    ) -> Self {
        Self {
            chains,
            resolver,
            compiler,
            artifacts,
            deployments,
            verifications,
            analytics,
            wallet,
            rpc_client,
            nonce_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Runs the whole pipeline: resolve imports, compile, derive the
    /// contract address from the pre-submission nonce, broadcast, upload
    /// artifacts, persist the verification request. Returns as soon as the
    /// transaction is accepted by the node; confirmation and verification
    /// are asynchronous.
    pub async fn deploy(
        &self,
        request: DeploymentRequest,
    ) -> Result<DeploymentResult, DeployError> {
        let chain = self.chains.get(request.chain_id)?.clone();
        let wallet = self
            .wallet
            .clone()
            .ok_or(DeployError::WalletUnavailable)?
            .with_chain_id(chain.id);

        let file_name = contract_file_name(&request.contract_name);
        let sources = self
            .resolver
            .resolve(&file_name, &request.source_code, request.imports.as_ref())
            .await?;
        let compiled = self
            .compiler
            .compile(&request.contract_name, sources.clone())
            .await?;

        let encoded_args = encode_constructor_args(&compiled.abi, &request.constructor_args)?;
        let calldata = deployment_calldata(&compiled.bytecode, &encoded_args)?;

        let provider = Provider::new(Http::new_with_client(
            chain.rpc_url.clone(),
            self.rpc_client.clone(),
        ));
        let client = SignerMiddleware::new(provider, wallet.clone());

        let submit = async {
            let _guard = self.nonce_lock.lock().await;
            let nonce = client
                .get_transaction_count(
                    wallet.address(),
                    Some(BlockId::Number(BlockNumber::Pending)),
                )
                .await
                .map_err(|err| DeployError::Rpc(err.to_string()))?;
            let contract_address = get_contract_address(wallet.address(), nonce);
            let tx = TransactionRequest::new()
                .from(wallet.address())
                .nonce(nonce)
                .data(calldata.clone());
            let pending = client
                .send_transaction(tx, None)
                .await
                .map_err(|err| DeployError::Rpc(err.to_string()))?;
            Ok::<_, DeployError>((contract_address, *pending))
        };
        let upload = self.artifacts.upload(
            &sources,
            &compiled.abi,
            &compiled.bytecode,
            &compiled.standard_json_input,
        );
        let (submitted, ipfs_cid) = tokio::join!(submit, upload);
        let (contract_address, tx_hash) = submitted?;
        if let Some(cid) = &ipfs_cid {
            tracing::debug!(url = %self.artifacts.gateway_url(cid), "build artifacts uploaded");
        }

        let contract_address = format!("{contract_address:#x}");
        let deploy_tx_hash = format!("{tx_hash:#x}");
        let explorer_url = chain.address_url(&contract_address);

        let verification = VerificationRequest {
            deploy_tx_hash: deploy_tx_hash.clone(),
            contract_address: contract_address.clone(),
            standard_json_input: compiled.standard_json_input.clone(),
            encoded_constructor_args: hex::encode(&encoded_args),
            file_name,
            contract_name: request.contract_name.clone(),
            compiler_version: self.compiler.version().to_string(),
            chain_id: chain.id,
        };

        // bookkeeping must not fail an already-broadcast deployment
        if let Err(err) = self.verifications.insert_pending(verification.clone()).await {
            tracing::warn!(err = ?err, tx = %deploy_tx_hash, "failed to persist pending verification");
        }
        let record = DeploymentRecord {
            chain_id: chain.id,
            contract_name: request.contract_name.clone(),
            contract_address: contract_address.clone(),
            deploy_tx_hash: deploy_tx_hash.clone(),
            ipfs_cid: ipfs_cid.clone(),
            created_at: Utc::now(),
        };
        if let Err(err) = self.deployments.insert_deployment(record).await {
            tracing::warn!(err = ?err, tx = %deploy_tx_hash, "failed to persist deployment record");
        }
        self.analytics.track(AnalyticsEvent::contract_deployed(
            chain.id,
            &request.contract_name,
            &contract_address,
        ));

        tracing::info!(
            chain_id = chain.id,
            contract = %request.contract_name,
            address = %contract_address,
            tx = %deploy_tx_hash,
            "contract deployment submitted"
        );

        Ok(DeploymentResult {
            contract_address,
            deploy_tx_hash,
            explorer_url,
            ipfs_cid,
            verification,
        })
    }
}

/// ABI-encodes positional constructor arguments against the contract ABI.
/// Arity mismatches and untokenizable values are caller errors.
fn encode_constructor_args(
    abi: &serde_json::Value,
    args: &[String],
) -> Result<Vec<u8>, DeployError> {
    let abi: ethabi::Contract = serde_json::from_value(abi.clone())
        .map_err(|err| DeployError::ConstructorArgs(format!("invalid abi: {err}")))?;
    let constructor = match abi.constructor.as_ref() {
        Some(constructor) => constructor,
        None if args.is_empty() => return Ok(Vec::new()),
        None => {
            return Err(DeployError::ConstructorArgs(format!(
                "contract has no constructor, but {} argument(s) were provided",
                args.len()
            )))
        }
    };
    if constructor.inputs.len() != args.len() {
        return Err(DeployError::ConstructorArgs(format!(
            "expected {} argument(s), got {}",
            constructor.inputs.len(),
            args.len()
        )));
    }
    let tokens = constructor
        .inputs
        .iter()
        .zip(args)
        .map(|(param, value)| {
            LenientTokenizer::tokenize(&param.kind, value).map_err(|err| {
                DeployError::ConstructorArgs(format!("argument `{}`: {err}", param.name))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ethabi::encode(&tokens))
}

/// Deployment calldata: creation bytecode followed by the encoded
/// constructor arguments.
fn deployment_calldata(bytecode: &str, encoded_args: &[u8]) -> Result<Bytes, DeployError> {
    let mut data = hex::decode(bytecode.trim_start_matches("0x"))
        .map_err(|err| DeployError::Compile(CompileError::InvalidBytecode(err.to_string())))?;
    data.extend_from_slice(encoded_args);
    Ok(Bytes::from(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::{Address, U256};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn erc20_abi() -> serde_json::Value {
        json!([{
            "type": "constructor",
            "stateMutability": "nonpayable",
            "inputs": [
                {"name": "name_", "type": "string", "internalType": "string"},
                {"name": "symbol_", "type": "string", "internalType": "string"},
                {"name": "initialSupply", "type": "uint256", "internalType": "uint256"}
            ]
        }])
    }

    #[test]
    fn create_address_derivation() {
        // canonical CREATE vector
        let sender: Address = "0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0"
            .parse()
            .unwrap();
        let derived = get_contract_address(sender, U256::zero());
        assert_eq!(
            format!("{derived:#x}"),
            "0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"
        );
    }

    #[test]
    fn encode_positional_args() {
        let encoded = encode_constructor_args(
            &erc20_abi(),
            &["MyToken".to_string(), "MTK".to_string(), "1000000".to_string()],
        )
        .unwrap();
        // 3 head words, 2 words per string tail
        assert_eq!(encoded.len(), 7 * 32);
        // first head word is the offset of the first string (0x60)
        assert_eq!(encoded[31], 0x60);
    }

    #[test]
    fn arity_mismatch_is_an_error() {
        let err = encode_constructor_args(
            &erc20_abi(),
            &["MyToken".to_string(), "MTK".to_string()],
        )
        .unwrap_err();
        assert_eq!(err.stage(), "constructor_args");
        assert!(err.to_string().contains("expected 3 argument(s), got 2"));
    }

    #[test]
    fn args_without_constructor_are_an_error() {
        let abi = json!([]);
        assert!(encode_constructor_args(&abi, &[]).unwrap().is_empty());
        encode_constructor_args(&abi, &["1".to_string()])
            .expect_err("no constructor takes no arguments");
    }

    #[test]
    fn encode_nested_array_argument() {
        let abi = json!([{
            "type": "constructor",
            "stateMutability": "nonpayable",
            "inputs": [
                {"name": "values", "type": "uint256[]", "internalType": "uint256[]"}
            ]
        }]);
        let encoded = encode_constructor_args(&abi, &["[1,2,3]".to_string()]).unwrap();
        // offset word, length word, three elements
        assert_eq!(encoded.len(), 5 * 32);
        assert_eq!(encoded[63], 3);
    }

    #[test]
    fn calldata_concatenation() {
        let args = vec![0xaa_u8; 32];
        let calldata = deployment_calldata("0x6001", &args).unwrap();
        assert_eq!(calldata.len(), 2 + 32);
        assert_eq!(&calldata[..2], &[0x60, 0x01]);

        deployment_calldata("0xzz", &[]).expect_err("invalid hex must not submit");
    }
}
