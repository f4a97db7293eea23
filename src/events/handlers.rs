use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::ApiError,
    events::{dto::EventPayload, repo::Event},
    state::AppState,
};

pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/:id", put(update_event).delete(delete_event))
}

const EVENT_NOT_FOUND: &str = "event not found or no permission";

fn validate_payload(payload: &EventPayload) -> Result<(), ApiError> {
    lazy_static! {
        static ref DATE_RE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
        static ref TIME_RE: Regex = Regex::new(r"^\d{2}:\d{2}$").unwrap();
    }

    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("title is required".into()));
    }
    if !DATE_RE.is_match(&payload.date) {
        return Err(ApiError::Validation(
            "date must be a YYYY-MM-DD string".into(),
        ));
    }
    for time in [&payload.start_time, &payload.end_time].into_iter().flatten() {
        if !TIME_RE.is_match(time) {
            return Err(ApiError::Validation("times must be HH:MM strings".into()));
        }
    }
    // The UI treats these as mutually exclusive; the server rejects the
    // combination too so other clients cannot store it.
    if payload.is_all_day && payload.is_no_duration {
        return Err(ApiError::Validation(
            "an event cannot be both all-day and without a fixed time".into(),
        ));
    }
    Ok(())
}

#[instrument(skip(state, user))]
pub async fn list_events(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Event>>, ApiError> {
    let events = Event::list_by_user(&state.db, user.0.id).await?;
    Ok(Json(events))
}

#[instrument(skip(state, user, payload))]
pub async fn create_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<EventPayload>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    validate_payload(&payload)?;
    let event = Event::create(&state.db, user.0.id, &payload).await?;
    info!(user_id = %user.0.id, event_id = %event.id, "event created");
    Ok((StatusCode::CREATED, Json(event)))
}

#[instrument(skip(state, user, payload))]
pub async fn update_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<EventPayload>,
) -> Result<Json<Event>, ApiError> {
    validate_payload(&payload)?;
    let event = Event::update(&state.db, user.0.id, id, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound(EVENT_NOT_FOUND.into()))?;
    info!(user_id = %user.0.id, event_id = %event.id, "event updated");
    Ok(Json(event))
}

#[instrument(skip(state, user))]
pub async fn delete_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !Event::delete(&state.db, user.0.id, id).await? {
        return Err(ApiError::NotFound(EVENT_NOT_FOUND.into()));
    }
    info!(user_id = %user.0.id, event_id = %id, "event deleted");
    Ok(Json(json!({ "success": true, "message": "event deleted" })))
}
