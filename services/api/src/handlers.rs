//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests for debate
//! sessions. It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use debate_core::model::{Argument, Debate, DebateConfig, DebateResult};
use debate_core::{CompletionOutcome, DebateError, DebateUpdate, SubmissionOutcome};
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    models::{ErrorResponse, SubmitArgumentPayload, TimerState},
    state::AppState,
};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    BadGateway(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, Json(ErrorResponse { message })).into_response()
            }
            ApiError::BadGateway(message) => {
                warn!("Evaluator failure: {}", message);
                (StatusCode::BAD_GATEWAY, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl From<DebateError> for ApiError {
    fn from(err: DebateError) -> Self {
        match err {
            DebateError::Validation(_) => Self::BadRequest(err.to_string()),
            DebateError::NotFound(_) | DebateError::ResultNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            DebateError::NotActive(_) | DebateError::NoNextPhase { .. } => {
                Self::Conflict(err.to_string())
            }
            DebateError::Evaluator(_) => Self::BadGateway(err.to_string()),
            DebateError::Store(_) => Self::InternalServerError(err.into()),
        }
    }
}

/// Create a new debate.
#[utoipa::path(
    post,
    path = "/debates",
    request_body = DebateConfig,
    responses(
        (status = 201, description = "Debate created and active", body = Debate),
        (status = 400, description = "Invalid configuration", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_debate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DebateConfig>,
) -> Result<impl IntoResponse, ApiError> {
    let debate = state.engine.create(payload).await?;
    Ok((StatusCode::CREATED, Json(debate)))
}

/// List all debates, newest first.
#[utoipa::path(
    get,
    path = "/debates",
    responses(
        (status = 200, description = "List of debates", body = [Debate]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_debates(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Debate>>, ApiError> {
    Ok(Json(state.engine.list().await?))
}

/// Get a specific debate by its ID.
#[utoipa::path(
    get,
    path = "/debates/{id}",
    responses(
        (status = 200, description = "Debate details", body = Debate),
        (status = 404, description = "Debate not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Debate ID")
    )
)]
pub async fn get_debate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Debate>, ApiError> {
    Ok(Json(state.engine.get(id).await?))
}

/// Update fields of an active debate.
///
/// Changing `currentPhase` or `timeRemaining` halts the phase countdown and
/// re-arms it from the new values.
#[utoipa::path(
    patch,
    path = "/debates/{id}",
    request_body = DebateUpdate,
    responses(
        (status = 200, description = "Debate updated", body = Debate),
        (status = 400, description = "Invalid field value", body = ErrorResponse),
        (status = 404, description = "Debate not found", body = ErrorResponse),
        (status = 409, description = "Debate is not active", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Debate ID")
    )
)]
pub async fn update_debate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DebateUpdate>,
) -> Result<Json<Debate>, ApiError> {
    let debate = state.timers.update(id, payload).await?;
    Ok(Json(debate))
}

/// Submit a user argument and receive the AI's reply.
///
/// When the evaluator is unavailable the argument is still recorded and the
/// response carries an `error` message instead of `aiArgument`.
#[utoipa::path(
    post,
    path = "/debates/{id}/arguments",
    request_body = SubmitArgumentPayload,
    responses(
        (status = 201, description = "Argument recorded", body = SubmissionOutcome),
        (status = 400, description = "Empty argument", body = ErrorResponse),
        (status = 404, description = "Debate not found", body = ErrorResponse),
        (status = 409, description = "Debate is not active", body = ErrorResponse),
        (status = 502, description = "Evaluator failed", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Debate ID")
    )
)]
pub async fn submit_argument(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitArgumentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .engine
        .submit_user_argument(id, &payload.content)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// List a debate's arguments in submission order.
#[utoipa::path(
    get,
    path = "/debates/{id}/arguments",
    responses(
        (status = 200, description = "Debate transcript", body = [Argument]),
        (status = 404, description = "Debate not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Debate ID")
    )
)]
pub async fn list_arguments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Argument>>, ApiError> {
    Ok(Json(state.engine.arguments(id).await?))
}

/// Move the debate to the next phase of its format.
#[utoipa::path(
    post,
    path = "/debates/{id}/advance",
    responses(
        (status = 200, description = "Phase advanced", body = Debate),
        (status = 404, description = "Debate not found", body = ErrorResponse),
        (status = 409, description = "No next phase or debate not active", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Debate ID")
    )
)]
pub async fn advance_phase(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Debate>, ApiError> {
    let debate = state.timers.advance_phase(id).await?;
    Ok(Json(debate))
}

/// Complete the debate and record its result.
///
/// Calling this again returns the stored result.
#[utoipa::path(
    post,
    path = "/debates/{id}/complete",
    responses(
        (status = 200, description = "Debate result", body = CompletionOutcome),
        (status = 404, description = "Debate not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Debate ID")
    )
)]
pub async fn complete_debate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompletionOutcome>, ApiError> {
    let outcome = state.engine.complete(id).await?;
    state.timers.remove(id);
    Ok(Json(outcome))
}

/// Get the result of a completed debate.
#[utoipa::path(
    get,
    path = "/debates/{id}/result",
    responses(
        (status = 200, description = "Debate result", body = DebateResult),
        (status = 404, description = "Debate or result not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Debate ID")
    )
)]
pub async fn get_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DebateResult>, ApiError> {
    Ok(Json(state.engine.result(id).await?))
}

/// Start or resume the phase countdown.
#[utoipa::path(
    post,
    path = "/debates/{id}/timer/start",
    responses(
        (status = 200, description = "Timer state", body = TimerState),
        (status = 404, description = "Debate not found", body = ErrorResponse),
        (status = 409, description = "Debate is not active", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Debate ID")
    )
)]
pub async fn start_timer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TimerState>, ApiError> {
    Ok(Json(state.timers.start(id).await?))
}

/// Pause the phase countdown.
#[utoipa::path(
    post,
    path = "/debates/{id}/timer/pause",
    responses(
        (status = 200, description = "Timer state", body = TimerState),
        (status = 404, description = "Debate not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Debate ID")
    )
)]
pub async fn pause_timer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TimerState>, ApiError> {
    Ok(Json(state.timers.pause(id).await?))
}

/// Stop the phase countdown and restore the full allotment.
#[utoipa::path(
    post,
    path = "/debates/{id}/timer/stop",
    responses(
        (status = 200, description = "Timer state", body = TimerState),
        (status = 404, description = "Debate not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Debate ID")
    )
)]
pub async fn stop_timer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TimerState>, ApiError> {
    Ok(Json(state.timers.stop(id).await?))
}

/// Get the phase countdown state.
#[utoipa::path(
    get,
    path = "/debates/{id}/timer",
    responses(
        (status = 200, description = "Timer state", body = TimerState),
        (status = 404, description = "Debate not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Debate ID")
    )
)]
pub async fn get_timer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TimerState>, ApiError> {
    Ok(Json(state.timers.state(id).await?))
}
