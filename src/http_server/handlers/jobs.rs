use crate::sweeper::Sweeper;
use actix_web::{
    error,
    http::header,
    web::{self, Json},
    HttpRequest,
};
use serde::{Deserialize, Serialize};

pub struct JobsAuth {
    pub token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub success: bool,
    /// Verifications still pending after the sweep.
    pub verification_count: usize,
}

pub async fn sweep(
    sweeper: web::Data<Sweeper>,
    auth: web::Data<JobsAuth>,
    request: HttpRequest,
) -> Result<Json<SweepResponse>, actix_web::Error> {
    authorize(&auth, &request)?;
    let summary = sweeper.sweep().await;
    Ok(Json(SweepResponse {
        success: true,
        verification_count: summary.remaining,
    }))
}

fn authorize(auth: &JobsAuth, request: &HttpRequest) -> Result<(), actix_web::Error> {
    let expected = match auth.token.as_deref() {
        Some(token) => token,
        // no token configured: development mode, endpoint is open
        None => return Ok(()),
    };
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    match header.strip_prefix("Bearer ") {
        Some(token) if token == expected => Ok(()),
        _ => Err(error::ErrorUnauthorized("invalid bearer token")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn bearer_token_is_required_when_configured() {
        let auth = JobsAuth {
            token: Some("secret".to_string()),
        };

        let request = TestRequest::post()
            .insert_header((header::AUTHORIZATION, "Bearer secret"))
            .to_http_request();
        authorize(&auth, &request).expect("valid token");

        let request = TestRequest::post()
            .insert_header((header::AUTHORIZATION, "Bearer wrong"))
            .to_http_request();
        authorize(&auth, &request).expect_err("wrong token");

        let request = TestRequest::post().to_http_request();
        authorize(&auth, &request).expect_err("missing header");
    }

    #[test]
    fn open_when_no_token_is_configured() {
        let auth = JobsAuth { token: None };
        let request = TestRequest::post().to_http_request();
        authorize(&auth, &request).expect("open endpoint");
    }
}
