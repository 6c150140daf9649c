//! Data movement protocol endpoints

use appcatalog_core::{GridFtpDataMovement, LocalDataMovement, ScpDataMovement, UnicoreDataMovement};
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
        .route("/scp", post(add_scp_data_movement))
        .route("/scp/{id}", get(get_scp_data_movement).put(update_scp_data_movement))
        .route("/gridftp", post(add_gridftp_data_movement))
        .route("/gridftp/{id}", get(get_gridftp_data_movement))
        .route("/unicore", post(add_unicore_data_movement))
        .route("/unicore/{id}", get(get_unicore_data_movement))
        .route("/local", post(add_local_data_movement))
        .route("/local/{id}", get(get_local_data_movement))
}

#[instrument(skip(state, dm))]
async fn add_scp_data_movement(
    State(state): State<AppState>,
    Json(dm): Json<ScpDataMovement>,
) -> ApiResult<impl IntoResponse> {
    let id = queries::add_scp_data_movement(&state.pool, &dm)
        .await
        .map_err(catalog_error("Failed to add SCP data movement"))?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[instrument(skip(state))]
async fn get_scp_data_movement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let dm = queries::get_scp_data_movement(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get SCP data movement"))?;
    Ok(Json(dm))
}

#[instrument(skip(state, dm))]
async fn update_scp_data_movement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(dm): Json<ScpDataMovement>,
) -> ApiResult<impl IntoResponse> {
    queries::update_scp_data_movement(&state.pool, &id, &dm)
        .await
        .map_err(catalog_error("Failed to update SCP data movement"))?;
    Ok(Json(json!({ "id": id, "updated": true })))
}

#[instrument(skip(state, dm))]
async fn add_gridftp_data_movement(
    State(state): State<AppState>,
    Json(dm): Json<GridFtpDataMovement>,
) -> ApiResult<impl IntoResponse> {
    let id = queries::add_gridftp_data_movement(&state.pool, &dm)
        .await
        .map_err(catalog_error("Failed to add GridFTP data movement"))?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[instrument(skip(state))]
async fn get_gridftp_data_movement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let dm = queries::get_gridftp_data_movement(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get GridFTP data movement"))?;
    Ok(Json(dm))
}

#[instrument(skip(state, dm))]
async fn add_unicore_data_movement(
    State(state): State<AppState>,
    Json(dm): Json<UnicoreDataMovement>,
) -> ApiResult<impl IntoResponse> {
    let id = queries::add_unicore_data_movement(&state.pool, &dm)
        .await
        .map_err(catalog_error("Failed to add UNICORE data movement"))?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[instrument(skip(state))]
async fn get_unicore_data_movement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let dm = queries::get_unicore_data_movement(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get UNICORE data movement"))?;
    Ok(Json(dm))
}

#[instrument(skip(state, dm))]
async fn add_local_data_movement(
    State(state): State<AppState>,
    Json(dm): Json<LocalDataMovement>,
) -> ApiResult<impl IntoResponse> {
    let id = queries::add_local_data_movement(&state.pool, &dm)
        .await
        .map_err(catalog_error("Failed to add local data movement"))?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[instrument(skip(state))]
async fn get_local_data_movement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let dm = queries::get_local_data_movement(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get local data movement"))?;
    Ok(Json(dm))
}
