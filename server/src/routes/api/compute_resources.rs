//! Compute resource API endpoints

use std::collections::BTreeMap;

use appcatalog_core::{BatchQueue, ComputeResourceDescription, DataMovementInterface, JobSubmissionInterface};
use appcatalog_database::queries;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use super::{catalog_error, ApiResult};
use crate::state::AppState;

/// Create compute resource router
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_compute_resources).post(add_compute_resource))
        .route("/names", get(compute_resource_names))
        .route(
            "/{id}",
            get(get_compute_resource)
                .put(update_compute_resource)
                .delete(remove_compute_resource),
        )
        .route("/{id}/batch-queues", post(add_batch_queue))
        .route(
            "/{id}/batch-queues/{queue_name}",
            put(update_batch_queue).delete(remove_batch_queue),
        )
        .route("/{id}/job-submission-interfaces", post(add_job_submission_interface))
        .route(
            "/{id}/job-submission-interfaces/{jsi_id}",
            delete(remove_job_submission_interface),
        )
        .route("/{id}/data-movement-interfaces", post(add_data_movement_interface))
        .route(
            "/{id}/data-movement-interfaces/{dmi_id}",
            delete(remove_data_movement_interface),
        )
        .route("/job-submission-priorities", put(change_job_submission_priorities))
        .route(
            "/job-submission-interfaces/{jsi_id}/priority",
            put(change_job_submission_priority),
        )
        .route(
            "/data-movement-interfaces/{dmi_id}/priority",
            put(change_data_movement_priority),
        )
}

/// Body of the single-interface priority endpoints
#[derive(Debug, Deserialize)]
pub struct PriorityInput {
    pub priority_order: i32,
}

#[instrument(skip(state))]
async fn list_compute_resources(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let resources = queries::list_compute_resources(&state.pool)
        .await
        .map_err(catalog_error("Failed to list compute resources"))?;

    Ok(Json(json!({ "compute_resources": resources })))
}

#[instrument(skip(state))]
async fn compute_resource_names(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let names = queries::get_all_compute_resource_id_names(&state.pool)
        .await
        .map_err(catalog_error("Failed to list compute resource names"))?;

    Ok(Json(names))
}

#[instrument(skip(state, desc), fields(host = %desc.host_name))]
async fn add_compute_resource(
    State(state): State<AppState>,
    Json(desc): Json<ComputeResourceDescription>,
) -> ApiResult<impl IntoResponse> {
    let id = queries::add_compute_resource(&state.pool, &desc)
        .await
        .map_err(catalog_error("Failed to add compute resource"))?;

    info!(compute_resource_id = %id, "Compute resource registered");
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[instrument(skip(state))]
async fn get_compute_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let desc = queries::get_compute_resource(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get compute resource"))?;

    Ok(Json(desc))
}

#[instrument(skip(state, desc))]
async fn update_compute_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(desc): Json<ComputeResourceDescription>,
) -> ApiResult<impl IntoResponse> {
    queries::update_compute_resource(&state.pool, &id, &desc)
        .await
        .map_err(catalog_error("Failed to update compute resource"))?;

    Ok(Json(json!({ "id": id, "updated": true })))
}

#[instrument(skip(state))]
async fn remove_compute_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    queries::remove_compute_resource(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to remove compute resource"))?;

    info!(compute_resource_id = %id, "Compute resource removed");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, queue))]
async fn add_batch_queue(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(queue): Json<BatchQueue>,
) -> ApiResult<impl IntoResponse> {
    queries::add_batch_queue(&state.pool, &id, &queue)
        .await
        .map_err(catalog_error("Failed to add batch queue"))?;

    Ok((StatusCode::CREATED, Json(json!({ "queue_name": queue.queue_name }))))
}

#[instrument(skip(state, queue))]
async fn update_batch_queue(
    State(state): State<AppState>,
    Path((id, queue_name)): Path<(String, String)>,
    Json(mut queue): Json<BatchQueue>,
) -> ApiResult<impl IntoResponse> {
    queue.queue_name = queue_name;
    queries::update_batch_queue(&state.pool, &id, &queue)
        .await
        .map_err(catalog_error("Failed to update batch queue"))?;

    Ok(Json(queue))
}

#[instrument(skip(state))]
async fn remove_batch_queue(
    State(state): State<AppState>,
    Path((id, queue_name)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    queries::remove_batch_queue(&state.pool, &id, &queue_name)
        .await
        .map_err(catalog_error("Failed to remove batch queue"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, jsi))]
async fn add_job_submission_interface(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(jsi): Json<JobSubmissionInterface>,
) -> ApiResult<impl IntoResponse> {
    let jsi_id = queries::add_job_submission_interface(&state.pool, &id, &jsi)
        .await
        .map_err(catalog_error("Failed to add job submission interface"))?;

    Ok((StatusCode::CREATED, Json(json!({ "id": jsi_id }))))
}

#[instrument(skip(state))]
async fn remove_job_submission_interface(
    State(state): State<AppState>,
    Path((id, jsi_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    queries::remove_job_submission_interface(&state.pool, &id, &jsi_id)
        .await
        .map_err(catalog_error("Failed to remove job submission interface"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, dmi))]
async fn add_data_movement_interface(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(dmi): Json<DataMovementInterface>,
) -> ApiResult<impl IntoResponse> {
    let dmi_id = queries::add_data_movement_interface(&state.pool, &id, &dmi)
        .await
        .map_err(catalog_error("Failed to add data movement interface"))?;

    Ok((StatusCode::CREATED, Json(json!({ "id": dmi_id }))))
}

#[instrument(skip(state))]
async fn remove_data_movement_interface(
    State(state): State<AppState>,
    Path((id, dmi_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    queries::remove_data_movement_interface(&state.pool, &id, &dmi_id)
        .await
        .map_err(catalog_error("Failed to remove data movement interface"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn change_job_submission_priority(
    State(state): State<AppState>,
    Path(jsi_id): Path<String>,
    Json(input): Json<PriorityInput>,
) -> ApiResult<impl IntoResponse> {
    queries::change_job_submission_priority(&state.pool, &jsi_id, input.priority_order)
        .await
        .map_err(catalog_error("Failed to change job submission priority"))?;

    Ok(Json(json!({ "id": jsi_id, "priority_order": input.priority_order })))
}

#[instrument(skip(state, priorities))]
async fn change_job_submission_priorities(
    State(state): State<AppState>,
    Json(priorities): Json<BTreeMap<String, i32>>,
) -> ApiResult<impl IntoResponse> {
    queries::change_job_submission_priorities(&state.pool, &priorities)
        .await
        .map_err(catalog_error("Failed to change job submission priorities"))?;

    Ok(Json(json!({ "updated": priorities.len() })))
}

#[instrument(skip(state))]
async fn change_data_movement_priority(
    State(state): State<AppState>,
    Path(dmi_id): Path<String>,
    Json(input): Json<PriorityInput>,
) -> ApiResult<impl IntoResponse> {
    queries::change_data_movement_priority(&state.pool, &dmi_id, input.priority_order)
        .await
        .map_err(catalog_error("Failed to change data movement priority"))?;

    Ok(Json(json!({ "id": dmi_id, "priority_order": input.priority_order })))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::api::test_support::{app, send};

    #[tokio::test]
    async fn test_compute_resource_lifecycle() {
        let app = app().await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/compute-resources",
            Some(json!({
                "host_name": "stampede.tacc.xsede.org",
                "enabled": true,
                "batch_queues": [{ "queue_name": "normal", "max_nodes": 256 }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();
        assert!(id.starts_with("stampede_tacc_xsede_org_"));

        let (status, body) = send(&app, Method::GET, &format!("/api/v1/compute-resources/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["host_name"], "stampede.tacc.xsede.org");
        assert_eq!(body["batch_queues"][0]["queue_name"], "normal");

        let (status, body) = send(&app, Method::GET, "/api/v1/compute-resources/names", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[&id], "stampede.tacc.xsede.org");

        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/api/v1/compute-resources/{}/batch-queues/normal", id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/compute-resources/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, Method::GET, &format!("/api/v1/compute-resources/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_malformed_body_rejected() {
        let app = app().await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/compute-resources",
            Some(json!({ "batch_queues": "not-a-list" })),
        )
        .await;
        assert!(status.is_client_error());
    }
}
