//! API Models
//!
//! Request and response bodies for the REST API, annotated for OpenAPI
//! generation with `utoipa`. Answer keys never appear in these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tutor_core::Session;
use tutor_core::score::Tally;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Deserialize, ToSchema, Default)]
pub struct CreateSessionPayload {
    /// Topic to study; the server default is used when absent.
    #[schema(example = "Fractions")]
    pub topic: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct CreateSessionResponse {
    #[schema(value_type = String, format = Uuid)]
    pub session_id: Uuid,
    #[schema(example = "WELCOME")]
    pub stage: String,
    pub message: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SendMessagePayload {
    #[schema(example = "B")]
    pub message: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct SendMessageResponse {
    #[schema(value_type = String, format = Uuid)]
    pub session_id: Uuid,
    #[schema(example = "QUIZ")]
    pub stage: String,
    pub response: String,
}

/// Correct answers out of answered questions.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreView {
    pub correct: usize,
    pub total: usize,
}

impl From<Tally> for ScoreView {
    fn from(tally: Tally) -> Self {
        Self {
            correct: tally.correct,
            total: tally.total,
        }
    }
}

/// Read-only progress view of a session.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct SessionView {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    pub topic: String,
    #[schema(example = "TESTING")]
    pub stage: String,
    pub test_cursor: usize,
    pub test_total: usize,
    pub lesson_cursor: usize,
    pub lesson_steps: Vec<String>,
    pub test_score: ScoreView,
    pub quiz_score: ScoreView,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            topic: session.topic.clone(),
            stage: session.stage().to_string(),
            test_cursor: session.test_cursor(),
            test_total: session.test_questions().len(),
            lesson_cursor: session.lesson_cursor(),
            lesson_steps: session
                .lesson_plan()
                .map(|plan| plan.steps.clone())
                .unwrap_or_default(),
            test_score: session.test_score().into(),
            quiz_score: session.quiz_score().into(),
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}
