//! Application module, interface and deployment endpoints
//!
//! Modules, interfaces and deployments are owned by a gateway. Creating one
//! or listing them takes the owner as `?gateway_id=`.

use appcatalog_core::{ApplicationDeploymentDescription, ApplicationInterfaceDescription, ApplicationModule};
use appcatalog_database::queries;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument};

use super::{catalog_error, ApiResult, GatewayQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        // Modules
        .route("/app-modules", get(list_modules).post(add_module))
        .route(
            "/app-modules/{id}",
            get(get_module).put(update_module).delete(remove_module),
        )
        .route("/app-modules/{id}/deployments", get(list_module_deployments))
        .route("/app-modules/{id}/deployed-resources", get(module_deployed_resources))
        // Interfaces
        .route("/app-interfaces", get(list_interfaces).post(add_interface))
        .route("/app-interfaces/names", get(interface_names))
        .route(
            "/app-interfaces/{id}",
            get(get_interface).put(update_interface).delete(remove_interface),
        )
        .route("/app-interfaces/{id}/inputs", get(interface_inputs))
        .route("/app-interfaces/{id}/outputs", get(interface_outputs))
        .route("/app-interfaces/{id}/compute-resources", get(interface_compute_resources))
        .route("/app-interfaces/{id}/modules/{module_id}", post(add_module_mapping))
        // Deployments
        .route("/app-deployments", get(list_deployments).post(add_deployment))
        .route(
            "/app-deployments/{id}",
            get(get_deployment).put(update_deployment).delete(remove_deployment),
        )
}

// ============================================================================
// Modules
// ============================================================================

#[instrument(skip(state))]
async fn list_modules(
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
) -> ApiResult<impl IntoResponse> {
    let modules = queries::get_all_application_modules(&state.pool, &query.gateway_id)
        .await
        .map_err(catalog_error("Failed to list application modules"))?;

    Ok(Json(json!({ "app_modules": modules })))
}

#[instrument(skip(state, module), fields(name = %module.app_module_name))]
async fn add_module(
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
    Json(module): Json<ApplicationModule>,
) -> ApiResult<impl IntoResponse> {
    let id = queries::add_application_module(&state.pool, &module, &query.gateway_id)
        .await
        .map_err(catalog_error("Failed to add application module"))?;

    info!(app_module_id = %id, gateway_id = %query.gateway_id, "Application module registered");
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[instrument(skip(state))]
async fn get_module(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let module = queries::get_application_module(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get application module"))?;

    Ok(Json(module))
}

#[instrument(skip(state, module))]
async fn update_module(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(module): Json<ApplicationModule>,
) -> ApiResult<impl IntoResponse> {
    queries::update_application_module(&state.pool, &id, &module)
        .await
        .map_err(catalog_error("Failed to update application module"))?;

    Ok(Json(json!({ "id": id, "updated": true })))
}

#[instrument(skip(state))]
async fn remove_module(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    queries::remove_application_module(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to remove application module"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn list_module_deployments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let deployments = queries::get_application_deployments(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to list module deployments"))?;

    Ok(Json(json!({ "app_deployments": deployments })))
}

#[instrument(skip(state))]
async fn module_deployed_resources(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let hosts = queries::get_app_module_deployed_resources(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to list deployed resources"))?;

    Ok(Json(json!({ "compute_host_ids": hosts })))
}

// ============================================================================
// Interfaces
// ============================================================================

#[instrument(skip(state))]
async fn list_interfaces(
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
) -> ApiResult<impl IntoResponse> {
    let interfaces = queries::get_all_application_interfaces(&state.pool, &query.gateway_id)
        .await
        .map_err(catalog_error("Failed to list application interfaces"))?;

    Ok(Json(json!({ "app_interfaces": interfaces })))
}

#[instrument(skip(state))]
async fn interface_names(
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
) -> ApiResult<impl IntoResponse> {
    let names = queries::get_all_application_interface_names(&state.pool, &query.gateway_id)
        .await
        .map_err(catalog_error("Failed to list application interface names"))?;

    Ok(Json(names))
}

#[instrument(skip(state, iface), fields(name = %iface.application_name))]
async fn add_interface(
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
    Json(iface): Json<ApplicationInterfaceDescription>,
) -> ApiResult<impl IntoResponse> {
    let id = queries::add_application_interface(&state.pool, &iface, &query.gateway_id)
        .await
        .map_err(catalog_error("Failed to add application interface"))?;

    info!(application_interface_id = %id, "Application interface registered");
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[instrument(skip(state))]
async fn get_interface(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let iface = queries::get_application_interface(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get application interface"))?;

    Ok(Json(iface))
}

#[instrument(skip(state, iface))]
async fn update_interface(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(iface): Json<ApplicationInterfaceDescription>,
) -> ApiResult<impl IntoResponse> {
    queries::update_application_interface(&state.pool, &id, &iface)
        .await
        .map_err(catalog_error("Failed to update application interface"))?;

    Ok(Json(json!({ "id": id, "updated": true })))
}

#[instrument(skip(state))]
async fn remove_interface(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    queries::remove_application_interface(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to remove application interface"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn interface_inputs(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let inputs = queries::get_application_inputs(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get application inputs"))?;

    Ok(Json(inputs))
}

#[instrument(skip(state))]
async fn interface_outputs(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let outputs = queries::get_application_outputs(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get application outputs"))?;

    Ok(Json(outputs))
}

#[instrument(skip(state))]
async fn interface_compute_resources(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let resources = queries::get_available_app_interface_compute_resources(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to list interface compute resources"))?;

    Ok(Json(resources))
}

#[instrument(skip(state))]
async fn add_module_mapping(
    State(state): State<AppState>,
    Path((id, module_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    queries::add_application_module_mapping(&state.pool, &module_id, &id)
        .await
        .map_err(catalog_error("Failed to map application module"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "application_interface_id": id, "app_module_id": module_id })),
    ))
}

// ============================================================================
// Deployments
// ============================================================================

#[instrument(skip(state))]
async fn list_deployments(
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
) -> ApiResult<impl IntoResponse> {
    let deployments = queries::get_all_application_deployments(&state.pool, &query.gateway_id)
        .await
        .map_err(catalog_error("Failed to list application deployments"))?;

    Ok(Json(json!({ "app_deployments": deployments })))
}

#[instrument(skip(state, desc), fields(module = %desc.app_module_id, host = %desc.compute_host_id))]
async fn add_deployment(
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
    Json(desc): Json<ApplicationDeploymentDescription>,
) -> ApiResult<impl IntoResponse> {
    let id = queries::add_application_deployment(&state.pool, &desc, &query.gateway_id)
        .await
        .map_err(catalog_error("Failed to add application deployment"))?;

    info!(app_deployment_id = %id, "Application deployment registered");
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[instrument(skip(state))]
async fn get_deployment(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let desc = queries::get_application_deployment(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get application deployment"))?;

    Ok(Json(desc))
}

#[instrument(skip(state, desc))]
async fn update_deployment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(desc): Json<ApplicationDeploymentDescription>,
) -> ApiResult<impl IntoResponse> {
    queries::update_application_deployment(&state.pool, &id, &desc)
        .await
        .map_err(catalog_error("Failed to update application deployment"))?;

    Ok(Json(json!({ "id": id, "updated": true })))
}

#[instrument(skip(state))]
async fn remove_deployment(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    queries::remove_application_deployment(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to remove application deployment"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::api::test_support::{app, send};

    #[tokio::test]
    async fn test_module_interface_deployment_flow() {
        let app = app().await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/app-modules?gateway_id=seagrid",
            Some(json!({ "app_module_name": "Gaussian", "app_module_version": "16" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let module_id = body["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/app-interfaces?gateway_id=seagrid",
            Some(json!({
                "application_name": "Gaussian",
                "application_modules": [module_id],
                "application_inputs": [{ "name": "Input-File", "data_type": "URI", "input_order": 1 }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let iface_id = body["id"].as_str().unwrap().to_string();

        let (_, body) = send(&app, Method::POST, "/api/v1/compute-resources", Some(json!({ "host_name": "comet.sdsc.edu" }))).await;
        let host_id = body["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/app-deployments?gateway_id=seagrid",
            Some(json!({
                "app_module_id": module_id,
                "compute_host_id": host_id,
                "executable_path": "/opt/g16/g16",
                "parallelism": "SERIAL",
                "module_load_cmds": [{ "command": "module load gaussian", "command_order": 1 }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], format!("comet.sdsc.edu_{}", module_id));

        let (_, body) = send(
            &app,
            Method::GET,
            &format!("/api/v1/app-interfaces/{}/compute-resources", iface_id),
            None,
        )
        .await;
        assert_eq!(body[&host_id], "comet.sdsc.edu");

        let (_, body) = send(&app, Method::GET, &format!("/api/v1/app-interfaces/{}/inputs", iface_id), None).await;
        assert_eq!(body[0]["name"], "Input-File");

        let (_, body) = send(&app, Method::GET, "/api/v1/app-deployments?gateway_id=seagrid", None).await;
        assert_eq!(body["app_deployments"].as_array().unwrap().len(), 1);

        let (_, body) = send(&app, Method::GET, "/api/v1/app-modules?gateway_id=other", None).await;
        assert!(body["app_modules"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deployment_with_unknown_host_rejected() {
        let app = app().await;

        let (_, body) = send(
            &app,
            Method::POST,
            "/api/v1/app-modules?gateway_id=seagrid",
            Some(json!({ "app_module_name": "NAMD" })),
        )
        .await;
        let module_id = body["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/app-deployments?gateway_id=seagrid",
            Some(json!({
                "app_module_id": module_id,
                "compute_host_id": "no-such-host",
                "executable_path": "/usr/bin/namd2"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Compute host does not exist"));
    }

    #[tokio::test]
    async fn test_missing_gateway_query_rejected() {
        let app = app().await;
        let (status, _) = send(&app, Method::GET, "/api/v1/app-modules", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
