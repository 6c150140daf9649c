//! User resource profile endpoints
//!
//! A user profile is addressed by the pair `/{user_id}/{gateway_id}`.

use appcatalog_core::{UserComputeResourcePreference, UserResourceProfile, UserStoragePreference};
use appcatalog_database::queries;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use super::{catalog_error, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_profiles).post(add_profile))
        .route(
            "/{user_id}/{gateway_id}",
            get(get_profile).put(update_profile).delete(remove_profile),
        )
        .route(
            "/{user_id}/{gateway_id}/compute-preferences",
            get(list_compute_preferences).post(add_compute_preference),
        )
        .route(
            "/{user_id}/{gateway_id}/compute-preferences/{compute_resource_id}",
            get(get_compute_preference).delete(remove_compute_preference),
        )
        .route(
            "/{user_id}/{gateway_id}/storage-preferences",
            get(list_storage_preferences).post(add_storage_preference),
        )
        .route(
            "/{user_id}/{gateway_id}/storage-preferences/{storage_resource_id}",
            get(get_storage_preference).delete(remove_storage_preference),
        )
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    gateway_id: Option<String>,
}

/// Every profile, or only the user ids registered under `?gateway_id=`
#[instrument(skip(state))]
async fn list_profiles(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    if let Some(gateway_id) = query.gateway_id {
        let user_ids = queries::get_gateway_profile_ids(&state.pool, &gateway_id)
            .await
            .map_err(catalog_error("Failed to list gateway users"))?;
        return Ok(Json(json!({ "gateway_id": gateway_id, "user_ids": user_ids })));
    }

    let profiles = queries::get_all_user_resource_profiles(&state.pool)
        .await
        .map_err(catalog_error("Failed to list user profiles"))?;
    Ok(Json(json!({ "user_profiles": profiles })))
}

#[instrument(skip(state, profile), fields(user_id = %profile.user_id, gateway_id = %profile.gateway_id))]
async fn add_profile(
    State(state): State<AppState>,
    Json(profile): Json<UserResourceProfile>,
) -> ApiResult<impl IntoResponse> {
    let id = queries::add_user_resource_profile(&state.pool, &profile)
        .await
        .map_err(catalog_error("Failed to add user profile"))?;

    info!(profile = %id, "User profile registered");
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[instrument(skip(state))]
async fn get_profile(
    State(state): State<AppState>,
    Path((user_id, gateway_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let profile = queries::get_user_resource_profile(&state.pool, &user_id, &gateway_id)
        .await
        .map_err(catalog_error("Failed to get user profile"))?;

    Ok(Json(profile))
}

#[instrument(skip(state, profile))]
async fn update_profile(
    State(state): State<AppState>,
    Path((user_id, gateway_id)): Path<(String, String)>,
    Json(profile): Json<UserResourceProfile>,
) -> ApiResult<impl IntoResponse> {
    queries::update_user_resource_profile(&state.pool, &user_id, &gateway_id, &profile)
        .await
        .map_err(catalog_error("Failed to update user profile"))?;

    Ok(Json(json!({ "updated": true })))
}

#[instrument(skip(state))]
async fn remove_profile(
    State(state): State<AppState>,
    Path((user_id, gateway_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    queries::remove_user_resource_profile(&state.pool, &user_id, &gateway_id)
        .await
        .map_err(catalog_error("Failed to remove user profile"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn list_compute_preferences(
    State(state): State<AppState>,
    Path((user_id, gateway_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let prefs = queries::get_all_user_compute_resource_preferences(&state.pool, &user_id, &gateway_id)
        .await
        .map_err(catalog_error("Failed to list user compute preferences"))?;

    Ok(Json(prefs))
}

#[instrument(skip(state, pref))]
async fn add_compute_preference(
    State(state): State<AppState>,
    Path((user_id, gateway_id)): Path<(String, String)>,
    Json(pref): Json<UserComputeResourcePreference>,
) -> ApiResult<impl IntoResponse> {
    queries::add_user_compute_resource_preference(&state.pool, &user_id, &gateway_id, &pref)
        .await
        .map_err(catalog_error("Failed to add user compute preference"))?;

    Ok((StatusCode::CREATED, Json(pref)))
}

#[instrument(skip(state))]
async fn get_compute_preference(
    State(state): State<AppState>,
    Path((user_id, gateway_id, compute_resource_id)): Path<(String, String, String)>,
) -> ApiResult<impl IntoResponse> {
    let pref = queries::get_user_compute_resource_preference(&state.pool, &user_id, &gateway_id, &compute_resource_id)
        .await
        .map_err(catalog_error("Failed to get user compute preference"))?;

    Ok(Json(pref))
}

#[instrument(skip(state))]
async fn remove_compute_preference(
    State(state): State<AppState>,
    Path((user_id, gateway_id, compute_resource_id)): Path<(String, String, String)>,
) -> ApiResult<impl IntoResponse> {
    queries::remove_user_compute_resource_preference(&state.pool, &user_id, &gateway_id, &compute_resource_id)
        .await
        .map_err(catalog_error("Failed to remove user compute preference"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn list_storage_preferences(
    State(state): State<AppState>,
    Path((user_id, gateway_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let prefs = queries::get_all_user_storage_preferences(&state.pool, &user_id, &gateway_id)
        .await
        .map_err(catalog_error("Failed to list user storage preferences"))?;

    Ok(Json(prefs))
}

#[instrument(skip(state, pref))]
async fn add_storage_preference(
    State(state): State<AppState>,
    Path((user_id, gateway_id)): Path<(String, String)>,
    Json(pref): Json<UserStoragePreference>,
) -> ApiResult<impl IntoResponse> {
    queries::add_user_storage_preference(&state.pool, &user_id, &gateway_id, &pref)
        .await
        .map_err(catalog_error("Failed to add user storage preference"))?;

    Ok((StatusCode::CREATED, Json(pref)))
}

#[instrument(skip(state))]
async fn get_storage_preference(
    State(state): State<AppState>,
    Path((user_id, gateway_id, storage_resource_id)): Path<(String, String, String)>,
) -> ApiResult<impl IntoResponse> {
    let pref = queries::get_user_storage_preference(&state.pool, &user_id, &gateway_id, &storage_resource_id)
        .await
        .map_err(catalog_error("Failed to get user storage preference"))?;

    Ok(Json(pref))
}

#[instrument(skip(state))]
async fn remove_storage_preference(
    State(state): State<AppState>,
    Path((user_id, gateway_id, storage_resource_id)): Path<(String, String, String)>,
) -> ApiResult<impl IntoResponse> {
    queries::remove_user_storage_preference(&state.pool, &user_id, &gateway_id, &storage_resource_id)
        .await
        .map_err(catalog_error("Failed to remove user storage preference"))?;

    Ok(StatusCode::NO_CONTENT)
}
