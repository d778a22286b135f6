//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        CreateSessionPayload, CreateSessionResponse, ErrorResponse, ScoreView,
        SendMessagePayload, SendMessageResponse, SessionView,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_session,
        handlers::get_session,
        handlers::send_message,
        handlers::reset_session,
        handlers::delete_session,
        handlers::list_topics,
    ),
    components(
        schemas(
            CreateSessionPayload,
            CreateSessionResponse,
            SendMessagePayload,
            SendMessageResponse,
            SessionView,
            ScoreView,
            ErrorResponse
        )
    ),
    tags(
        (name = "Tutor API", description = "Adaptive tutoring sessions for primary school math")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/{id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/sessions/{id}/messages", post(handlers::send_message))
        .route("/sessions/{id}/reset", post(handlers::reset_session))
        .route("/topics", get(handlers::list_topics))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
