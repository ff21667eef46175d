use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::error::Error;
use crate::scheduler::Scheduler;

#[derive(Clone)]
pub struct ApiState {
    pub scheduler: Arc<Scheduler>,
}

pub fn app_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/sets", get(list_sets).post(register_set))
        .route("/api/problems", post(register_problem))
        .route("/api/problems/:id/history", get(problem_history))
        .route("/api/submit", post(submit_outcome))
        .route("/api/due", get(due_problems))
        .route("/api/schedule", get(schedule_overview))
        .route("/api/reset", post(reset))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error_response(err: Error) -> (StatusCode, String) {
    let status = match &err {
        Error::SetNotFound(_) | Error::ProblemNotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        log::error!("request failed: {err}");
    }
    (status, err.to_string())
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Deserialize)]
struct RegisterSetRequest {
    title: String,
}

async fn register_set(
    State(state): State<ApiState>,
    Json(payload): Json<RegisterSetRequest>,
) -> impl IntoResponse {
    match state.scheduler.register_set(&payload.title).await {
        Ok(set) => (StatusCode::CREATED, Json(set)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn list_sets(State(state): State<ApiState>) -> impl IntoResponse {
    match state.scheduler.sets().await {
        Ok(sets) => Json(sets).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Deserialize)]
struct RegisterProblemRequest {
    set_id: i64,
    label: String,
    first_correct: Option<bool>,
}

async fn register_problem(
    State(state): State<ApiState>,
    Json(payload): Json<RegisterProblemRequest>,
) -> impl IntoResponse {
    match state
        .scheduler
        .register_problem(payload.set_id, &payload.label, payload.first_correct, today())
        .await
    {
        Ok(problem) => (StatusCode::CREATED, Json(problem)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Deserialize)]
struct SubmitRequest {
    problem_id: i64,
    correct: bool,
    date: Option<NaiveDate>,
}

#[derive(Serialize)]
struct SubmitResponse {
    next_review_date: NaiveDate,
}

async fn submit_outcome(
    State(state): State<ApiState>,
    Json(payload): Json<SubmitRequest>,
) -> impl IntoResponse {
    let on = payload.date.unwrap_or_else(today);
    match state
        .scheduler
        .submit_outcome(payload.problem_id, payload.correct, on)
        .await
    {
        Ok(next_review_date) => Json(SubmitResponse { next_review_date }).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Deserialize)]
struct DueQuery {
    date: Option<NaiveDate>,
}

async fn due_problems(
    State(state): State<ApiState>,
    Query(query): Query<DueQuery>,
) -> impl IntoResponse {
    let on = query.date.unwrap_or_else(today);
    match state.scheduler.due_problems(on).await {
        Ok(due) => Json(due).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn problem_history(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.scheduler.history(id).await {
        Ok(events) => Json(events).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn schedule_overview(State(state): State<ApiState>) -> impl IntoResponse {
    match state.scheduler.overview().await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn reset(State(state): State<ApiState>) -> impl IntoResponse {
    match state.scheduler.reset().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
