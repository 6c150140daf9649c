//! Group resource profile endpoints
//!
//! Profiles are listed per gateway and filtered to the ids the caller may
//! see, passed as `?gateway_id=seagrid&accessible_ids=a,b`. Policies are
//! addressed on their own under `/group-policies`.

use appcatalog_core::GroupResourceProfile;
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
        .route("/{id}", get(get_profile).put(update_profile).delete(remove_profile))
        .route("/{id}/compute-preferences", get(list_compute_preferences))
        .route(
            "/{id}/compute-preferences/{compute_resource_id}",
            get(get_compute_preference).delete(remove_compute_preference),
        )
        .route("/{id}/compute-policies", get(list_compute_policies))
        .route("/{id}/batch-queue-policies", get(list_batch_queue_policies))
}

pub fn policy_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/compute/{policy_id}",
            get(get_compute_policy).delete(remove_compute_policy),
        )
        .route(
            "/batch-queue/{policy_id}",
            get(get_batch_queue_policy).delete(remove_batch_queue_policy),
        )
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    gateway_id: String,
    #[serde(default)]
    accessible_ids: String,
}

impl ListQuery {
    fn accessible_ids(&self) -> Vec<String> {
        self.accessible_ids
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .collect()
    }
}

#[instrument(skip(state))]
async fn list_profiles(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let profiles = queries::get_all_group_resource_profiles(&state.pool, &query.gateway_id, &query.accessible_ids())
        .await
        .map_err(catalog_error("Failed to list group profiles"))?;

    Ok(Json(json!({ "group_profiles": profiles })))
}

#[instrument(skip(state, profile), fields(gateway_id = %profile.gateway_id))]
async fn add_profile(
    State(state): State<AppState>,
    Json(profile): Json<GroupResourceProfile>,
) -> ApiResult<impl IntoResponse> {
    let id = queries::add_group_resource_profile(&state.pool, &profile)
        .await
        .map_err(catalog_error("Failed to add group profile"))?;

    info!(group_resource_profile_id = %id, "Group profile registered");
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[instrument(skip(state))]
async fn get_profile(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let profile = queries::get_group_resource_profile(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get group profile"))?;

    Ok(Json(profile))
}

#[instrument(skip(state, profile))]
async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut profile): Json<GroupResourceProfile>,
) -> ApiResult<impl IntoResponse> {
    profile.group_resource_profile_id = id.clone();
    queries::update_group_resource_profile(&state.pool, &profile)
        .await
        .map_err(catalog_error("Failed to update group profile"))?;

    Ok(Json(json!({ "id": id, "updated": true })))
}

#[instrument(skip(state))]
async fn remove_profile(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    queries::remove_group_resource_profile(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to remove group profile"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn list_compute_preferences(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let prefs = queries::get_all_group_compute_resource_preferences(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to list group compute preferences"))?;

    Ok(Json(prefs))
}

#[instrument(skip(state))]
async fn get_compute_preference(
    State(state): State<AppState>,
    Path((id, compute_resource_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let pref = queries::get_group_compute_resource_preference(&state.pool, &compute_resource_id, &id)
        .await
        .map_err(catalog_error("Failed to get group compute preference"))?;

    Ok(Json(pref))
}

#[instrument(skip(state))]
async fn remove_compute_preference(
    State(state): State<AppState>,
    Path((id, compute_resource_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    queries::remove_group_compute_resource_preference(&state.pool, &compute_resource_id, &id)
        .await
        .map_err(catalog_error("Failed to remove group compute preference"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn list_compute_policies(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let policies = queries::get_all_group_compute_resource_policies(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to list compute resource policies"))?;

    Ok(Json(policies))
}

#[instrument(skip(state))]
async fn list_batch_queue_policies(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let policies = queries::get_all_group_batch_queue_resource_policies(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to list batch queue policies"))?;

    Ok(Json(policies))
}

#[instrument(skip(state))]
async fn get_compute_policy(
    State(state): State<AppState>,
    Path(policy_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let policy = queries::get_compute_resource_policy(&state.pool, &policy_id)
        .await
        .map_err(catalog_error("Failed to get compute resource policy"))?;

    Ok(Json(policy))
}

#[instrument(skip(state))]
async fn remove_compute_policy(
    State(state): State<AppState>,
    Path(policy_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    queries::remove_compute_resource_policy(&state.pool, &policy_id)
        .await
        .map_err(catalog_error("Failed to remove compute resource policy"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn get_batch_queue_policy(
    State(state): State<AppState>,
    Path(policy_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let policy = queries::get_batch_queue_resource_policy(&state.pool, &policy_id)
        .await
        .map_err(catalog_error("Failed to get batch queue policy"))?;

    Ok(Json(policy))
}

#[instrument(skip(state))]
async fn remove_batch_queue_policy(
    State(state): State<AppState>,
    Path(policy_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    queries::remove_batch_queue_resource_policy(&state.pool, &policy_id)
        .await
        .map_err(catalog_error("Failed to remove batch queue policy"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::api::test_support::{app, send};

    #[tokio::test]
    async fn test_group_profile_with_slurm_preference() {
        let app = app().await;

        let (_, body) = send(
            &app,
            Method::POST,
            "/api/v1/compute-resources",
            Some(json!({ "host_name": "expanse.sdsc.edu", "batch_queues": [{ "queue_name": "shared" }] })),
        )
        .await;
        let host_id = body["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/group-profiles",
            Some(json!({
                "gateway_id": "seagrid",
                "group_resource_profile_name": "Default",
                "compute_preferences": [{
                    "compute_resource_id": host_id,
                    "login_user_name": "grp",
                    "specific_preferences": {
                        "resource_type": "SLURM",
                        "allocation_project_number": "TG-123",
                        "preferred_batch_queue": "shared"
                    }
                }],
                "compute_resource_policies": [{
                    "resource_policy_id": "policy-1",
                    "compute_resource_id": host_id,
                    "allowed_batch_queues": ["shared"]
                }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let profile_id = body["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/v1/group-profiles/{}/compute-preferences/{}", profile_id, host_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["specific_preferences"]["resource_type"], "SLURM");
        assert_eq!(body["specific_preferences"]["allocation_project_number"], "TG-123");

        let (status, body) = send(&app, Method::GET, "/api/v1/group-policies/compute/policy-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["allowed_batch_queues"], json!(["shared"]));

        let (_, body) = send(
            &app,
            Method::GET,
            &format!("/api/v1/group-profiles?gateway_id=seagrid&accessible_ids={}", profile_id),
            None,
        )
        .await;
        assert_eq!(body["group_profiles"].as_array().unwrap().len(), 1);

        let (_, body) = send(&app, Method::GET, "/api/v1/group-profiles?gateway_id=seagrid", None).await;
        assert!(body["group_profiles"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_group_profile() {
        let app = app().await;
        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/v1/group-profiles/no-such-profile",
            Some(json!({ "gateway_id": "seagrid", "group_resource_profile_name": "X" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
