//! Resource job manager API endpoints

use appcatalog_core::ResourceJobManager;
use appcatalog_database::queries;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::instrument;

use super::{catalog_error, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", post(add_resource_job_manager)).route(
        "/{id}",
        get(get_resource_job_manager)
            .put(update_resource_job_manager)
            .delete(delete_resource_job_manager),
    )
}

#[instrument(skip(state, rjm))]
async fn add_resource_job_manager(
    State(state): State<AppState>,
    Json(rjm): Json<ResourceJobManager>,
) -> ApiResult<impl IntoResponse> {
    let id = queries::add_resource_job_manager(&state.pool, &rjm)
        .await
        .map_err(catalog_error("Failed to add resource job manager"))?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[instrument(skip(state))]
async fn get_resource_job_manager(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let rjm = queries::get_resource_job_manager(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get resource job manager"))?;

    Ok(Json(rjm))
}

#[instrument(skip(state, rjm))]
async fn update_resource_job_manager(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(rjm): Json<ResourceJobManager>,
) -> ApiResult<impl IntoResponse> {
    queries::update_resource_job_manager(&state.pool, &id, &rjm)
        .await
        .map_err(catalog_error("Failed to update resource job manager"))?;

    Ok(Json(json!({ "id": id, "updated": true })))
}

#[instrument(skip(state))]
async fn delete_resource_job_manager(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    queries::delete_resource_job_manager(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to delete resource job manager"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::api::test_support::{app, send};

    #[tokio::test]
    async fn test_job_manager_commands_round_trip() {
        let app = app().await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/resource-job-managers",
            Some(json!({
                "resource_job_manager_type": "SLURM",
                "job_manager_bin_path": "/usr/bin",
                "job_manager_commands": { "SUBMISSION": "sbatch", "DELETION": "scancel" }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();
        assert!(id.starts_with("RJM_"));

        let (status, body) = send(&app, Method::GET, &format!("/api/v1/resource-job-managers/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resource_job_manager_type"], "SLURM");
        assert_eq!(body["job_manager_commands"]["SUBMISSION"], "sbatch");

        let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/resource-job-managers/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/resource-job-managers/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
