use crate::{
    deployer::{DeployError, Deployer},
    types::{DeploymentRequest, DeploymentResult},
};
use actix_web::web::{self, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

#[derive(Debug, Serialize)]
pub struct StageError {
    /// Pipeline stage that failed: `chain`, `imports`, `compilation`,
    /// `constructor_args`, `wallet` or `rpc`.
    pub stage: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DeployResponse {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<DeploymentResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StageError>,
}

impl DeployResponse {
    pub fn ok(result: DeploymentResult) -> Self {
        Self {
            status: Status::Ok,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(err: &DeployError) -> Self {
        Self {
            status: Status::Error,
            result: None,
            error: Some(StageError {
                stage: err.stage(),
                message: err.to_string(),
            }),
        }
    }
}

pub async fn deploy(
    deployer: web::Data<Deployer>,
    request: Json<DeploymentRequest>,
) -> Json<DeployResponse> {
    match deployer.deploy(request.into_inner()).await {
        Ok(result) => Json(DeployResponse::ok(result)),
        Err(err) => {
            tracing::error!(stage = err.stage(), err = %err, "deployment failed");
            Json(DeployResponse::err(&err))
        }
    }
}
