//! Storage resource API endpoints

use appcatalog_core::{DataMovementInterface, StorageResourceDescription};
use appcatalog_database::queries;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument};

use super::{catalog_error, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_storage_resources).post(add_storage_resource))
        .route("/names", get(storage_resource_names))
        .route(
            "/{id}",
            get(get_storage_resource)
                .put(update_storage_resource)
                .delete(remove_storage_resource),
        )
        .route("/{id}/data-movement-interfaces", post(add_data_movement_interface))
}

#[instrument(skip(state))]
async fn list_storage_resources(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let resources = queries::list_storage_resources(&state.pool)
        .await
        .map_err(catalog_error("Failed to list storage resources"))?;

    Ok(Json(json!({ "storage_resources": resources })))
}

#[instrument(skip(state))]
async fn storage_resource_names(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let names = queries::get_all_storage_resource_id_names(&state.pool)
        .await
        .map_err(catalog_error("Failed to list storage resource names"))?;

    Ok(Json(names))
}

#[instrument(skip(state, desc), fields(host = %desc.host_name))]
async fn add_storage_resource(
    State(state): State<AppState>,
    Json(desc): Json<StorageResourceDescription>,
) -> ApiResult<impl IntoResponse> {
    let id = queries::add_storage_resource(&state.pool, &desc)
        .await
        .map_err(catalog_error("Failed to add storage resource"))?;

    info!(storage_resource_id = %id, "Storage resource registered");
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[instrument(skip(state))]
async fn get_storage_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let desc = queries::get_storage_resource(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get storage resource"))?;

    Ok(Json(desc))
}

#[instrument(skip(state, desc))]
async fn update_storage_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(desc): Json<StorageResourceDescription>,
) -> ApiResult<impl IntoResponse> {
    queries::update_storage_resource(&state.pool, &id, &desc)
        .await
        .map_err(catalog_error("Failed to update storage resource"))?;

    Ok(Json(json!({ "id": id, "updated": true })))
}

#[instrument(skip(state))]
async fn remove_storage_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    queries::remove_storage_resource(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to remove storage resource"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, dmi))]
async fn add_data_movement_interface(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(dmi): Json<DataMovementInterface>,
) -> ApiResult<impl IntoResponse> {
    let dmi_id = queries::add_storage_data_movement_interface(&state.pool, &id, &dmi)
        .await
        .map_err(catalog_error("Failed to add storage data movement interface"))?;

    Ok((StatusCode::CREATED, Json(json!({ "id": dmi_id }))))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::api::test_support::{app, send};

    #[tokio::test]
    async fn test_storage_resource_crud() {
        let app = app().await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/storage-resources",
            Some(json!({ "host_name": "data.iu.edu", "enabled": true })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/api/v1/storage-resources/{}", id),
            Some(json!({ "host_name": "data.iu.edu", "enabled": false })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], true);

        let (_, body) = send(&app, Method::GET, "/api/v1/storage-resources", None).await;
        let list = body["storage_resources"].as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["enabled"], false);

        let (status, _) = send(&app, Method::GET, "/api/v1/storage-resources/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
