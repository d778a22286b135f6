//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests for tutoring
//! sessions. It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::info;
use tutor_core::Stage;
use uuid::Uuid;

use crate::{
    models::{
        CreateSessionPayload, CreateSessionResponse, ErrorResponse, SendMessagePayload,
        SendMessageResponse, SessionView,
    },
    state::AppState,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    fn session_not_found(id: Uuid) -> Self {
        Self::NotFound(format!("Session with id '{}' not found", id))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        let message = self.to_string();
        (status, Json(ErrorResponse { message })).into_response()
    }
}

/// Create a new tutoring session.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = CreateSessionPayload,
    responses(
        (status = 201, description = "Session created successfully", body = CreateSessionResponse),
        (status = 400, description = "Bad request", body = ErrorResponse)
    )
)]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<CreateSessionPayload>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    let (session_id, message) = state.tutor.create_session(payload.topic.as_deref()).await;

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id,
            stage: Stage::Welcome.to_string(),
            message,
        }),
    ))
}

/// Get the progress of a session.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    responses(
        (status = 200, description = "Session details", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state
        .tutor
        .snapshot(id)
        .await
        .ok_or_else(|| ApiError::session_not_found(id))?;
    Ok(Json(SessionView::from(&session)))
}

/// Send one student message and receive the tutor's reply.
///
/// An unknown session id starts a new session on the default topic.
#[utoipa::path(
    post,
    path = "/sessions/{id}/messages",
    request_body = SendMessagePayload,
    responses(
        (status = 200, description = "Tutor reply", body = SendMessageResponse),
        (status = 400, description = "Empty message", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let turn = state.tutor.respond(id, &payload.message).await;

    Ok(Json(SendMessageResponse {
        session_id: id,
        stage: turn.stage.to_string(),
        response: turn.reply,
    }))
}

/// Restart a session from the welcome stage on its current topic.
#[utoipa::path(
    post,
    path = "/sessions/{id}/reset",
    responses(
        (status = 200, description = "Session reset", body = CreateSessionResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CreateSessionResponse>, ApiError> {
    let message = state
        .tutor
        .reset(id)
        .await
        .ok_or_else(|| ApiError::session_not_found(id))?;

    Ok(Json(CreateSessionResponse {
        session_id: id,
        stage: Stage::Welcome.to_string(),
        message,
    }))
}

/// Delete a session.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.tutor.remove(id).await {
        info!(session_id = %id, "Session deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::session_not_found(id))
    }
}

/// List the topics with prewritten content.
#[utoipa::path(
    get,
    path = "/topics",
    responses(
        (status = 200, description = "Known topics", body = [String])
    )
)]
pub async fn list_topics(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.tutor.topics())
}
