//! REST API v1 endpoints
//!
//! All endpoints exchange the catalog description types as JSON.
//!
//! ## API Structure
//!
//! ```text
//! /api/v1/
//! ├── health                      GET     Health check
//! │
//! ├── compute-resources/          Full CRUD + queues, interfaces, priorities
//! ├── storage-resources/          Full CRUD + data movement interfaces
//! ├── resource-job-managers/      Full CRUD
//! ├── job-submissions/            ssh, local, cloud, unicore
//! ├── data-movements/             scp, gridftp, unicore, local
//! ├── app-modules/                Full CRUD (gateway scoped)
//! ├── app-interfaces/             Full CRUD + inputs, outputs, mappings
//! ├── app-deployments/            Full CRUD
//! ├── gateway-profiles/           Full CRUD + compute/storage preferences
//! ├── user-profiles/              Full CRUD + compute/storage preferences
//! ├── group-profiles/             Full CRUD + preferences and policies
//! ├── group-policies/             Compute and batch queue policies by id
//! ├── parsers/                    Save, get, list, remove + inputs/outputs
//! └── parsing-templates/          Save, get, list, remove
//! ```

pub mod applications;
pub mod compute_resources;
pub mod data_movements;
pub mod gateway_profiles;
pub mod group_profiles;
pub mod job_submissions;
pub mod parsers;
pub mod resource_job_managers;
pub mod storage_resources;
pub mod user_profiles;

use appcatalog_core::Error;
use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, instrument};

use crate::state::AppState;

/// Standard API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub error: ApiErrorDetails,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorDetails {
    pub code: String,
    pub message: String,
}

/// Handler result carrying the error response on failure
pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

impl ApiError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ApiErrorDetails {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (StatusCode::NOT_FOUND, Json(Self::new("NOT_FOUND", message)))
    }

    pub fn bad_request(message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            StatusCode::BAD_REQUEST,
            Json(Self::new("BAD_REQUEST", message)),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Self::new("INTERNAL_ERROR", message)),
        )
    }

    /// Map a catalog error to its HTTP response
    pub fn from_catalog(err: &Error) -> (StatusCode, Json<Self>) {
        match err {
            Error::NotFound { .. } => Self::not_found(err.to_string()),
            Error::ValidationError(_) | Error::AppCatalogError(_) => Self::bad_request(err.to_string()),
            _ => Self::internal_error(err.to_string()),
        }
    }
}

/// Log a failed catalog call and turn it into an error response
pub fn catalog_error(context: &'static str) -> impl Fn(Error) -> (StatusCode, Json<ApiError>) {
    move |e| {
        if e.is_not_found() {
            debug!(error = %e, "{}", context);
        } else {
            error!(error = %e, "{}", context);
        }
        ApiError::from_catalog(&e)
    }
}

/// `?gateway_id=` on gateway scoped endpoints
#[derive(Debug, Deserialize)]
pub struct GatewayQuery {
    pub gateway_id: String,
}

/// Create the complete v1 API router
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .nest("/compute-resources", compute_resources::routes())
        .nest("/storage-resources", storage_resources::routes())
        .nest("/resource-job-managers", resource_job_managers::routes())
        .nest("/job-submissions", job_submissions::routes())
        .nest("/data-movements", data_movements::routes())
        .merge(applications::routes())
        .nest("/gateway-profiles", gateway_profiles::routes())
        .nest("/user-profiles", user_profiles::routes())
        .nest("/group-profiles", group_profiles::routes())
        .nest("/group-policies", group_profiles::policy_routes())
        .merge(parsers::routes())
}

/// Health check endpoint
///
/// ## Response
/// ```json
/// {
///   "status": "ok",
///   "service": "appcatalog",
///   "version": "0.1.0"
/// }
/// ```
#[instrument]
async fn health_check() -> impl IntoResponse {
    debug!("Health check requested");
    Json(json!({
        "status": "ok",
        "service": "appcatalog",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::state::AppState;

    pub async fn app() -> Router {
        crate::routes::app(AppState::for_tests().await)
    }

    /// Send one request and decode the JSON body (Null when empty, String when not JSON)
    pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{app, send};
    use super::*;
    use axum::http::Method;

    #[tokio::test]
    async fn test_health() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[test]
    fn test_error_mapping() {
        let (status, _) = ApiError::from_catalog(&Error::not_found("Parser", "p1"));
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, body) = ApiError::from_catalog(&Error::AppCatalogError("bad ref".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0.error.code, "BAD_REQUEST");
        let (status, _) = ApiError::from_catalog(&Error::DatabaseError("locked".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
