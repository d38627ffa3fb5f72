//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API and OpenAPI documentation.

use crate::{
    handlers,
    models::{ErrorResponse, SubmitArgumentPayload, TimerState},
    state::AppState,
};
use debate_core::model::{
    Argument, Debate, DebateConfig, DebateResult, DebateStatus, Difficulty, Feedback, Format,
    Phase, Position, Score, Speaker, Winner,
};
use debate_core::{CompletionOutcome, DebateUpdate, SubmissionOutcome};

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
        handlers::create_debate,
        handlers::list_debates,
        handlers::get_debate,
        handlers::update_debate,
        handlers::submit_argument,
        handlers::list_arguments,
        handlers::advance_phase,
        handlers::complete_debate,
        handlers::get_result,
        handlers::start_timer,
        handlers::pause_timer,
        handlers::stop_timer,
        handlers::get_timer,
    ),
    components(
        schemas(
            Debate, DebateConfig, DebateUpdate, Argument, Feedback, DebateResult, Score,
            SubmissionOutcome, CompletionOutcome, SubmitArgumentPayload, TimerState, ErrorResponse,
            Format, Position, Difficulty, DebateStatus, Phase, Speaker, Winner
        )
    ),
    tags(
        (name = "Debate API", description = "Debate practice sessions against an AI opponent")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route(
            "/debates",
            get(handlers::list_debates).post(handlers::create_debate),
        )
        .route(
            "/debates/{id}",
            get(handlers::get_debate).patch(handlers::update_debate),
        )
        .route(
            "/debates/{id}/arguments",
            get(handlers::list_arguments).post(handlers::submit_argument),
        )
        .route("/debates/{id}/advance", post(handlers::advance_phase))
        .route("/debates/{id}/complete", post(handlers::complete_debate))
        .route("/debates/{id}/result", get(handlers::get_result))
        .route("/debates/{id}/timer", get(handlers::get_timer))
        .route("/debates/{id}/timer/start", post(handlers::start_timer))
        .route("/debates/{id}/timer/pause", post(handlers::pause_timer))
        .route("/debates/{id}/timer/stop", post(handlers::stop_timer))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
