use actix_web::web::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { healthy: true })
}
