//! The HTTP surface (§6.2): a thin `axum::Router` translation of
//! [`crate::handler::OrchestratorHandler`]'s RPC methods, with a
//! configurable CORS allow-list.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::dtos::{ChatRequest, ExecutionIdRequest, StartWorkflowRequest, TaskRequest};
use crate::error::ProtocolError;
use crate::handler::OrchestratorHandler;

impl IntoResponse for ProtocolError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_http_body())).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckAgentQuery {
    #[serde(default)]
    pub force: bool,
}

/// Builds the full HTTP application, wiring every route onto a shared
/// [`OrchestratorHandler`] and applying CORS for the given allow-list.
/// `cors_origins` of `["*"]` allows any origin.
pub fn build_router(handler: OrchestratorHandler, cors_origins: &[String]) -> Router {
    let cors = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(AllowOrigin::any())
    } else {
        let origins: Vec<_> = cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    };

    Router::new()
        .route("/api/health", get(get_health))
        .route("/api/agents/status", get(get_agents_status))
        .route("/api/agents/:agent_id", get(get_agent))
        .route("/api/agents/:agent_id/health", get(get_agent_health))
        .route("/api/chat", post(post_chat))
        .layer(cors.allow_methods(tower_http::cors::Any).allow_headers(tower_http::cors::Any))
        .with_state(handler)
}

async fn get_health(State(handler): State<OrchestratorHandler>) -> Result<Json<serde_json::Value>, ProtocolError> {
    let doc = handler.health().await?;
    Ok(Json(serde_json::to_value(doc).unwrap_or_else(|_| json!({}))))
}

async fn get_agents_status(
    State(handler): State<OrchestratorHandler>,
) -> Result<Json<serde_json::Value>, ProtocolError> {
    let agents = handler.agents_list().await?;
    Ok(Json(json!({ "agents": agents })))
}

async fn get_agent(
    State(handler): State<OrchestratorHandler>,
    Path(agent_id): Path<String>,
) -> Result<Json<serde_json::Value>, ProtocolError> {
    let agent = handler.agents_get(&agent_id).await?;
    Ok(Json(serde_json::to_value(agent).unwrap_or_else(|_| json!({}))))
}

async fn get_agent_health(
    State(handler): State<OrchestratorHandler>,
    Path(agent_id): Path<String>,
    Query(query): Query<CheckAgentQuery>,
) -> Result<Json<serde_json::Value>, ProtocolError> {
    let doc = handler.agents_health(&agent_id, query.force).await?;
    Ok(Json(serde_json::to_value(doc).unwrap_or_else(|_| json!({}))))
}

async fn post_chat(
    State(handler): State<OrchestratorHandler>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<crate::dtos::ChatResponse>, ProtocolError> {
    Ok(Json(handler.chat(request).await?))
}

/// Unused in the HTTP surface (exposed only over RPC per §6.1) but kept as
/// thin wrappers so the translation is symmetric and testable directly.
pub async fn rpc_tasks_route(
    handler: &OrchestratorHandler,
    request: TaskRequest,
) -> Result<serde_json::Value, ProtocolError> {
    let decision = handler.tasks_route(request).await?;
    Ok(serde_json::to_value(decision).unwrap_or_else(|_| json!({})))
}

pub async fn rpc_tasks_execute(
    handler: &OrchestratorHandler,
    request: TaskRequest,
) -> Result<serde_json::Value, ProtocolError> {
    let result = handler.tasks_execute(request).await?;
    Ok(serde_json::to_value(result).unwrap_or_else(|_| json!({})))
}

pub async fn rpc_workflows_start(
    handler: &OrchestratorHandler,
    request: StartWorkflowRequest,
) -> Result<serde_json::Value, ProtocolError> {
    let execution = handler
        .workflows_start(request.definition, request.context)
        .await?;
    Ok(serde_json::to_value(execution).unwrap_or_else(|_| json!({})))
}

pub async fn rpc_workflows_advance(
    handler: &OrchestratorHandler,
    request: ExecutionIdRequest,
) -> Result<serde_json::Value, ProtocolError> {
    let execution = handler.workflows_advance(&request.execution_id).await?;
    Ok(serde_json::to_value(execution).unwrap_or_else(|_| json!({})))
}

pub async fn rpc_workflows_cancel(
    handler: &OrchestratorHandler,
    request: ExecutionIdRequest,
) -> Result<serde_json::Value, ProtocolError> {
    let execution = handler.workflows_cancel(&request.execution_id).await?;
    Ok(serde_json::to_value(execution).unwrap_or_else(|_| json!({})))
}

pub async fn rpc_workflows_get(
    handler: &OrchestratorHandler,
    request: ExecutionIdRequest,
) -> Result<serde_json::Value, ProtocolError> {
    let execution = handler.workflows_get(&request.execution_id).await?;
    Ok(serde_json::to_value(execution).unwrap_or_else(|_| json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use orchestrator_core::orchestrator::OrchestratorConfig;
    use orchestrator_core::persistence::test_support::InMemoryStore;
    use orchestrator_core::Orchestrator;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn app() -> Router {
        let orchestrator = Orchestrator::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryStore::new()),
            OrchestratorConfig::default(),
        );
        orchestrator.initialize().await.unwrap();
        let handler = OrchestratorHandler::new(Arc::new(orchestrator));
        build_router(handler, &["*".to_string()])
    }

    #[tokio::test]
    async fn health_endpoint_reports_seeded_agents() {
        let response = app()
            .await
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_unknown_agent_is_404() {
        let response = app()
            .await
            .oneshot(
                Request::builder()
                    .uri("/api/agents/nonexistent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_known_agent_is_200() {
        let response = app()
            .await
            .oneshot(
                Request::builder()
                    .uri("/api/agents/cmdb-agent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn chat_with_empty_message_is_422() {
        let body = serde_json::to_vec(&json!({ "message": "   " })).unwrap();
        let response = app()
            .await
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
