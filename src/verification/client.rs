use crate::{chains::Chain, types::VerificationRequest};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Response envelope shared by all etherscan-compatible endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerResponse {
    pub status: String,
    pub message: String,
    pub result: String,
}

#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("explorer request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("explorer returned status {0}")]
    Unavailable(StatusCode),
    #[error("failed to encode verification request: {0}")]
    Encode(#[from] serde_json::Error),
}

#[async_trait]
pub trait ExplorerApi: Send + Sync {
    async fn verify_source_code(
        &self,
        chain: &Chain,
        request: &VerificationRequest,
    ) -> Result<ExplorerResponse, ExplorerError>;

    async fn check_verify_status(
        &self,
        chain: &Chain,
        guid: &str,
    ) -> Result<ExplorerResponse, ExplorerError>;
}

pub struct EtherscanClient {
    client: reqwest::Client,
}

impl EtherscanClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn post_form(
        &self,
        chain: &Chain,
        form: &[(&str, String)],
    ) -> Result<ExplorerResponse, ExplorerError> {
        let response = self
            .client
            .post(chain.explorer_api_url.clone())
            .form(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExplorerError::Unavailable(status));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ExplorerApi for EtherscanClient {
    async fn verify_source_code(
        &self,
        chain: &Chain,
        request: &VerificationRequest,
    ) -> Result<ExplorerResponse, ExplorerError> {
        let source_code = serde_json::to_string(&request.standard_json_input)?;
        let mut form = vec![
            ("apikey", chain.explorer_api_key.clone()),
            ("module", "contract".to_string()),
            ("action", "verifysourcecode".to_string()),
            ("contractaddress", request.contract_address.clone()),
            ("sourceCode", source_code),
            ("codeformat", "solidity-standard-json-input".to_string()),
            (
                "contractname",
                format!("{}:{}", request.file_name, request.contract_name),
            ),
            ("compilerversion", request.compiler_version.clone()),
            ("optimizationUsed", "1".to_string()),
            ("runs", "200".to_string()),
        ];
        if !request.encoded_constructor_args.is_empty() {
            // the misspelling is the protocol's, not ours
            form.push((
                "constructorArguements",
                request.encoded_constructor_args.clone(),
            ));
        }
        self.post_form(chain, &form).await
    }

    async fn check_verify_status(
        &self,
        chain: &Chain,
        guid: &str,
    ) -> Result<ExplorerResponse, ExplorerError> {
        let form = vec![
            ("apikey", chain.explorer_api_key.clone()),
            ("module", "contract".to_string()),
            ("action", "checkverifystatus".to_string()),
            ("guid", guid.to_string()),
        ];
        self.post_form(chain, &form).await
    }
}
