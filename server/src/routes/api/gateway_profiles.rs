//! Gateway resource profile endpoints

use appcatalog_core::{ComputeResourcePreference, GatewayResourceProfile, StoragePreference};
use appcatalog_database::queries;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument};

use super::{catalog_error, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_profiles).post(add_profile))
        .route(
            "/{gateway_id}",
            get(get_profile).put(update_profile).delete(remove_profile),
        )
        .route(
            "/{gateway_id}/compute-preferences",
            get(list_compute_preferences).post(add_compute_preference),
        )
        .route(
            "/{gateway_id}/compute-preferences/{compute_resource_id}",
            get(get_compute_preference)
                .put(update_compute_preference)
                .delete(remove_compute_preference),
        )
        .route(
            "/{gateway_id}/storage-preferences",
            get(list_storage_preferences).post(add_storage_preference),
        )
        .route(
            "/{gateway_id}/storage-preferences/{storage_resource_id}",
            get(get_storage_preference)
                .put(update_storage_preference)
                .delete(remove_storage_preference),
        )
}

#[instrument(skip(state))]
async fn list_profiles(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let profiles = queries::get_all_gateway_profiles(&state.pool)
        .await
        .map_err(catalog_error("Failed to list gateway profiles"))?;

    Ok(Json(json!({ "gateway_profiles": profiles })))
}

#[instrument(skip(state, profile), fields(gateway_id = %profile.gateway_id))]
async fn add_profile(
    State(state): State<AppState>,
    Json(profile): Json<GatewayResourceProfile>,
) -> ApiResult<impl IntoResponse> {
    let id = queries::add_gateway_resource_profile(&state.pool, &profile)
        .await
        .map_err(catalog_error("Failed to add gateway profile"))?;

    info!(gateway_id = %id, "Gateway profile registered");
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[instrument(skip(state))]
async fn get_profile(
    State(state): State<AppState>,
    Path(gateway_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let profile = queries::get_gateway_profile(&state.pool, &gateway_id)
        .await
        .map_err(catalog_error("Failed to get gateway profile"))?;

    Ok(Json(profile))
}

#[instrument(skip(state, profile))]
async fn update_profile(
    State(state): State<AppState>,
    Path(gateway_id): Path<String>,
    Json(profile): Json<GatewayResourceProfile>,
) -> ApiResult<impl IntoResponse> {
    queries::update_gateway_resource_profile(&state.pool, &gateway_id, &profile)
        .await
        .map_err(catalog_error("Failed to update gateway profile"))?;

    Ok(Json(json!({ "id": gateway_id, "updated": true })))
}

#[instrument(skip(state))]
async fn remove_profile(
    State(state): State<AppState>,
    Path(gateway_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    queries::remove_gateway_resource_profile(&state.pool, &gateway_id)
        .await
        .map_err(catalog_error("Failed to remove gateway profile"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn list_compute_preferences(
    State(state): State<AppState>,
    Path(gateway_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let prefs = queries::get_all_compute_resource_preferences(&state.pool, &gateway_id)
        .await
        .map_err(catalog_error("Failed to list compute preferences"))?;

    Ok(Json(prefs))
}

#[instrument(skip(state, pref), fields(compute_resource_id = %pref.compute_resource_id))]
async fn add_compute_preference(
    State(state): State<AppState>,
    Path(gateway_id): Path<String>,
    Json(pref): Json<ComputeResourcePreference>,
) -> ApiResult<impl IntoResponse> {
    queries::add_gateway_compute_resource_preference(&state.pool, &gateway_id, &pref)
        .await
        .map_err(catalog_error("Failed to add compute preference"))?;

    Ok((StatusCode::CREATED, Json(pref)))
}

#[instrument(skip(state))]
async fn get_compute_preference(
    State(state): State<AppState>,
    Path((gateway_id, compute_resource_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let pref = queries::get_gateway_compute_resource_preference(&state.pool, &gateway_id, &compute_resource_id)
        .await
        .map_err(catalog_error("Failed to get compute preference"))?;

    Ok(Json(pref))
}

#[instrument(skip(state, pref))]
async fn update_compute_preference(
    State(state): State<AppState>,
    Path((gateway_id, compute_resource_id)): Path<(String, String)>,
    Json(pref): Json<ComputeResourcePreference>,
) -> ApiResult<impl IntoResponse> {
    queries::update_gateway_compute_resource_preference(&state.pool, &gateway_id, &compute_resource_id, &pref)
        .await
        .map_err(catalog_error("Failed to update compute preference"))?;

    Ok(Json(json!({ "updated": true })))
}

#[instrument(skip(state))]
async fn remove_compute_preference(
    State(state): State<AppState>,
    Path((gateway_id, compute_resource_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    queries::remove_gateway_compute_resource_preference(&state.pool, &gateway_id, &compute_resource_id)
        .await
        .map_err(catalog_error("Failed to remove compute preference"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn list_storage_preferences(
    State(state): State<AppState>,
    Path(gateway_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let prefs = queries::get_all_storage_preferences(&state.pool, &gateway_id)
        .await
        .map_err(catalog_error("Failed to list storage preferences"))?;

    Ok(Json(prefs))
}

#[instrument(skip(state, pref), fields(storage_resource_id = %pref.storage_resource_id))]
async fn add_storage_preference(
    State(state): State<AppState>,
    Path(gateway_id): Path<String>,
    Json(pref): Json<StoragePreference>,
) -> ApiResult<impl IntoResponse> {
    queries::add_gateway_storage_preference(&state.pool, &gateway_id, &pref)
        .await
        .map_err(catalog_error("Failed to add storage preference"))?;

    Ok((StatusCode::CREATED, Json(pref)))
}

#[instrument(skip(state))]
async fn get_storage_preference(
    State(state): State<AppState>,
    Path((gateway_id, storage_resource_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let pref = queries::get_gateway_storage_preference(&state.pool, &gateway_id, &storage_resource_id)
        .await
        .map_err(catalog_error("Failed to get storage preference"))?;

    Ok(Json(pref))
}

#[instrument(skip(state, pref))]
async fn update_storage_preference(
    State(state): State<AppState>,
    Path((gateway_id, storage_resource_id)): Path<(String, String)>,
    Json(pref): Json<StoragePreference>,
) -> ApiResult<impl IntoResponse> {
    queries::update_gateway_storage_preference(&state.pool, &gateway_id, &storage_resource_id, &pref)
        .await
        .map_err(catalog_error("Failed to update storage preference"))?;

    Ok(Json(json!({ "updated": true })))
}

#[instrument(skip(state))]
async fn remove_storage_preference(
    State(state): State<AppState>,
    Path((gateway_id, storage_resource_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    queries::remove_gateway_storage_preference(&state.pool, &gateway_id, &storage_resource_id)
        .await
        .map_err(catalog_error("Failed to remove storage preference"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::api::test_support::{app, send};

    #[tokio::test]
    async fn test_gateway_profile_preferences() {
        let app = app().await;

        let (_, body) = send(&app, Method::POST, "/api/v1/compute-resources", Some(json!({ "host_name": "bridges.psc.edu" }))).await;
        let host_id = body["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/gateway-profiles",
            Some(json!({ "gateway_id": "seagrid", "credential_store_token": "tok" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], "seagrid");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/gateway-profiles/seagrid/compute-preferences",
            Some(json!({
                "compute_resource_id": host_id,
                "login_user_name": "gw-user",
                "preferred_job_submission_protocol": "SSH"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/v1/gateway-profiles/seagrid/compute-preferences/{}", host_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["login_user_name"], "gw-user");
        assert_eq!(body["preferred_job_submission_protocol"], "SSH");

        let (_, body) = send(&app, Method::GET, "/api/v1/gateway-profiles/seagrid", None).await;
        assert_eq!(body["compute_resource_preferences"].as_array().unwrap().len(), 1);

        let (status, _) = send(&app, Method::DELETE, "/api/v1/gateway-profiles/seagrid", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, "/api/v1/gateway-profiles/seagrid", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_gateway_profile_requires_id() {
        let app = app().await;
        let (status, body) = send(&app, Method::POST, "/api/v1/gateway-profiles", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }
}
