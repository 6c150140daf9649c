//! Output parser and parsing template endpoints
//!
//! Saving is an upsert. Removal is scoped by `?gateway_id=` and refused for
//! entries another gateway owns.

use appcatalog_core::{Parser, ParserInput, ParserOutput, ParsingTemplate};
use appcatalog_database::queries;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use super::{catalog_error, ApiError, ApiResult, GatewayQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/parsers", get(list_parsers).post(save_parser))
        .route("/parsers/{id}", get(get_parser).delete(remove_parser))
        .route("/parser-inputs", post(save_parser_input))
        .route("/parser-inputs/{id}", get(get_parser_input).delete(remove_parser_input))
        .route("/parser-outputs", post(save_parser_output))
        .route("/parser-outputs/{id}", get(get_parser_output).delete(remove_parser_output))
        .route("/parsing-templates", get(list_parsing_templates).post(save_parsing_template))
        .route(
            "/parsing-templates/{id}",
            get(get_parsing_template).delete(remove_parsing_template),
        )
}

#[derive(Debug, Deserialize)]
struct TemplateQuery {
    gateway_id: Option<String>,
    application_interface_id: Option<String>,
}

// ============================================================================
// Parsers
// ============================================================================

#[instrument(skip(state))]
async fn list_parsers(
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
) -> ApiResult<impl IntoResponse> {
    let parsers = queries::list_all_parsers(&state.pool, &query.gateway_id)
        .await
        .map_err(catalog_error("Failed to list parsers"))?;

    Ok(Json(json!({ "parsers": parsers })))
}

#[instrument(skip(state, parser), fields(image = %parser.image_name))]
async fn save_parser(State(state): State<AppState>, Json(parser): Json<Parser>) -> ApiResult<impl IntoResponse> {
    let id = queries::save_parser(&state.pool, &parser)
        .await
        .map_err(catalog_error("Failed to save parser"))?;

    info!(parser_id = %id, "Parser saved");
    Ok(Json(json!({ "id": id })))
}

#[instrument(skip(state))]
async fn get_parser(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let parser = queries::get_parser(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get parser"))?;

    Ok(Json(parser))
}

#[instrument(skip(state))]
async fn remove_parser(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<GatewayQuery>,
) -> ApiResult<impl IntoResponse> {
    queries::remove_parser(&state.pool, &id, &query.gateway_id)
        .await
        .map_err(catalog_error("Failed to remove parser"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, input), fields(parser_id = %input.parser_id))]
async fn save_parser_input(
    State(state): State<AppState>,
    Json(input): Json<ParserInput>,
) -> ApiResult<impl IntoResponse> {
    let id = queries::save_parser_input(&state.pool, &input)
        .await
        .map_err(catalog_error("Failed to save parser input"))?;

    Ok(Json(json!({ "id": id })))
}

#[instrument(skip(state))]
async fn get_parser_input(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let input = queries::get_parser_input(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get parser input"))?;

    Ok(Json(input))
}

#[instrument(skip(state))]
async fn remove_parser_input(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<GatewayQuery>,
) -> ApiResult<impl IntoResponse> {
    queries::remove_parser_input(&state.pool, &id, &query.gateway_id)
        .await
        .map_err(catalog_error("Failed to remove parser input"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, output), fields(parser_id = %output.parser_id))]
async fn save_parser_output(
    State(state): State<AppState>,
    Json(output): Json<ParserOutput>,
) -> ApiResult<impl IntoResponse> {
    let id = queries::save_parser_output(&state.pool, &output)
        .await
        .map_err(catalog_error("Failed to save parser output"))?;

    Ok(Json(json!({ "id": id })))
}

#[instrument(skip(state))]
async fn get_parser_output(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let output = queries::get_parser_output(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get parser output"))?;

    Ok(Json(output))
}

#[instrument(skip(state))]
async fn remove_parser_output(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<GatewayQuery>,
) -> ApiResult<impl IntoResponse> {
    queries::remove_parser_output(&state.pool, &id, &query.gateway_id)
        .await
        .map_err(catalog_error("Failed to remove parser output"))?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Parsing templates
// ============================================================================

/// Templates of a gateway, or those attached to one application interface
#[instrument(skip(state))]
async fn list_parsing_templates(
    State(state): State<AppState>,
    Query(query): Query<TemplateQuery>,
) -> ApiResult<impl IntoResponse> {
    let templates = match (query.application_interface_id, query.gateway_id) {
        (Some(iface_id), _) => queries::get_parsing_templates_for_application(&state.pool, &iface_id).await,
        (None, Some(gateway_id)) => queries::list_all_parsing_templates(&state.pool, &gateway_id).await,
        (None, None) => {
            return Err(ApiError::bad_request(
                "Either gateway_id or application_interface_id is required",
            ))
        }
    }
    .map_err(catalog_error("Failed to list parsing templates"))?;

    Ok(Json(json!({ "parsing_templates": templates })))
}

#[instrument(skip(state, template), fields(interface = %template.application_interface))]
async fn save_parsing_template(
    State(state): State<AppState>,
    Json(template): Json<ParsingTemplate>,
) -> ApiResult<impl IntoResponse> {
    let id = queries::save_parsing_template(&state.pool, &template)
        .await
        .map_err(catalog_error("Failed to save parsing template"))?;

    info!(parsing_template_id = %id, "Parsing template saved");
    Ok(Json(json!({ "id": id })))
}

#[instrument(skip(state))]
async fn get_parsing_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let template = queries::get_parsing_template(&state.pool, &id)
        .await
        .map_err(catalog_error("Failed to get parsing template"))?;

    Ok(Json(template))
}

#[instrument(skip(state))]
async fn remove_parsing_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<GatewayQuery>,
) -> ApiResult<impl IntoResponse> {
    queries::remove_parsing_template(&state.pool, &id, &query.gateway_id)
        .await
        .map_err(catalog_error("Failed to remove parsing template"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::api::test_support::{app, send};

    fn parser_body() -> serde_json::Value {
        json!({
            "image_name": "parsers/gaussian:latest",
            "output_dir_path": "/out",
            "input_dir_path": "/in",
            "execution_command": "parse.sh",
            "gateway_id": "seagrid",
            "input_files": [{ "name": "log", "required_input": true }],
            "output_files": [{ "name": "result.json" }]
        })
    }

    #[tokio::test]
    async fn test_parser_ownership_on_remove() {
        let app = app().await;

        let (status, body) = send(&app, Method::POST, "/api/v1/parsers", Some(parser_body())).await;
        assert_eq!(status, StatusCode::OK);
        let id = body["id"].as_str().unwrap().to_string();

        let (_, body) = send(&app, Method::GET, &format!("/api/v1/parsers/{}", id), None).await;
        assert_eq!(body["input_files"][0]["name"], "log");
        assert_eq!(body["input_files"][0]["type"], "FILE");

        let (status, body) = send(
            &app,
            Method::DELETE,
            &format!("/api/v1/parsers/{}?gateway_id=other", id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("does not belong to gateway other"));

        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/api/v1/parsers/{}?gateway_id=seagrid", id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(&app, Method::GET, "/api/v1/parsers?gateway_id=seagrid", None).await;
        assert!(body["parsers"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_parsing_template_listing() {
        let app = app().await;

        let (_, body) = send(&app, Method::POST, "/api/v1/parsers", Some(parser_body())).await;
        let parser_id = body["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/parsing-templates",
            Some(json!({
                "application_interface": "Gaussian_iface",
                "gateway_id": "seagrid",
                "initial_inputs": [{ "target_input_id": "in-1", "application_output_name": "log" }],
                "parser_connections": [{ "parent_parser_id": parser_id, "child_parser_id": parser_id }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let template_id = body["id"].as_str().unwrap().to_string();

        let (_, body) = send(
            &app,
            Method::GET,
            "/api/v1/parsing-templates?application_interface_id=Gaussian_iface",
            None,
        )
        .await;
        let templates = body["parsing_templates"].as_array().unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0]["id"], template_id.as_str());
        assert_eq!(templates[0]["parser_connections"].as_array().unwrap().len(), 1);

        let (status, _) = send(&app, Method::GET, "/api/v1/parsing-templates", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
