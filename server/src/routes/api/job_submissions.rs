//! Job submission protocol endpoints
//!
//! Each protocol keeps its own settings; the compute resource links to them
//! through a job submission interface carrying the returned id.

use appcatalog_core::{CloudJobSubmission, LocalSubmission, SshJobSubmission, UnicoreJobSubmission};
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
    Router::new()
        .route("/ssh", post(add_ssh_job_submission))
        .route("/ssh/{id}", get(get_ssh_job_submission).put(update_ssh_job_submission))
        .route("/local", post(add_local_job_submission))
        .route(
            "/local/{id}",
            get(get_local_job_submission).put(update_local_job_submission),
        )
        .route("/cloud", post(add_cloud_job_submission))
        .route("/cloud/{id}", get(get_cloud_job_submission))
        .route("/unicore", post(add_unicore_job_submission))
        .route("/unicore/{id}", get(get_unicore_job_submission))
}

fn created(id: String) -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::CREATED, Json(json!({ "id": id })))
}

#[instrument(skip(state, sub))]
async fn add_ssh_job_submission(
    State(state): State<AppState>,
    Json(sub): Json<SshJobSubmission>,
) -> ApiResult<impl IntoResponse> {
    let id = queries::add_ssh_job_submission(&state.pool, &sub)
        .await
        .map_err(catalog_error("Failed to add SSH job submission"))?;
    Ok(created(id))
}

#[instrument(skip(state))]
async fn get_ssh_job_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let sub = queries::get_ssh_job_submission(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get SSH job submission"))?;
    Ok(Json(sub))
}

#[instrument(skip(state, sub))]
async fn update_ssh_job_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(sub): Json<SshJobSubmission>,
) -> ApiResult<impl IntoResponse> {
    queries::update_ssh_job_submission(&state.pool, &id, &sub)
        .await
        .map_err(catalog_error("Failed to update SSH job submission"))?;
    Ok(Json(json!({ "id": id, "updated": true })))
}

#[instrument(skip(state, sub))]
async fn add_local_job_submission(
    State(state): State<AppState>,
    Json(sub): Json<LocalSubmission>,
) -> ApiResult<impl IntoResponse> {
    let id = queries::add_local_job_submission(&state.pool, &sub)
        .await
        .map_err(catalog_error("Failed to add local job submission"))?;
    Ok(created(id))
}

#[instrument(skip(state))]
async fn get_local_job_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let sub = queries::get_local_job_submission(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get local job submission"))?;
    Ok(Json(sub))
}

#[instrument(skip(state, sub))]
async fn update_local_job_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(sub): Json<LocalSubmission>,
) -> ApiResult<impl IntoResponse> {
    queries::update_local_job_submission(&state.pool, &id, &sub)
        .await
        .map_err(catalog_error("Failed to update local job submission"))?;
    Ok(Json(json!({ "id": id, "updated": true })))
}

#[instrument(skip(state, sub))]
async fn add_cloud_job_submission(
    State(state): State<AppState>,
    Json(sub): Json<CloudJobSubmission>,
) -> ApiResult<impl IntoResponse> {
    let id = queries::add_cloud_job_submission(&state.pool, &sub)
        .await
        .map_err(catalog_error("Failed to add cloud job submission"))?;
    Ok(created(id))
}

#[instrument(skip(state))]
async fn get_cloud_job_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let sub = queries::get_cloud_job_submission(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get cloud job submission"))?;
    Ok(Json(sub))
}

#[instrument(skip(state, sub))]
async fn add_unicore_job_submission(
    State(state): State<AppState>,
    Json(sub): Json<UnicoreJobSubmission>,
) -> ApiResult<impl IntoResponse> {
    let id = queries::add_unicore_job_submission(&state.pool, &sub)
        .await
        .map_err(catalog_error("Failed to add UNICORE job submission"))?;
    Ok(created(id))
}

#[instrument(skip(state))]
async fn get_unicore_job_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let sub = queries::get_unicore_job_submission(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get UNICORE job submission"))?;
    Ok(Json(sub))
}
