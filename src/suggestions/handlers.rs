use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::ApiError,
    suggestions::{
        dto::ResolveRequest,
        repo::{ResolveOutcome, Suggestion},
    },
    state::AppState,
};

pub fn suggestion_routes() -> Router<AppState> {
    Router::new()
        .route("/suggestions", get(list_suggestions))
        .route("/suggestions/:id", put(resolve_suggestion))
}

const SUGGESTION_NOT_FOUND: &str = "suggestion not found or no permission";

/// GET /suggestions: the caller's suggestions, newest first. Pending rows
/// older than the configured TTL are moved to `expired` before the read so
/// the client never sees actionable buttons on a stale suggestion.
#[instrument(skip(state, user))]
pub async fn list_suggestions(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Suggestion>>, ApiError> {
    let cutoff = OffsetDateTime::now_utc() - Duration::hours(state.config.suggestion_ttl_hours);
    let expired = Suggestion::expire_stale(&state.db, user.0.id, cutoff).await?;
    if expired > 0 {
        debug!(user_id = %user.0.id, expired, "expired stale suggestions");
    }

    let suggestions = Suggestion::list_by_user(&state.db, user.0.id).await?;
    Ok(Json(suggestions))
}

/// PUT /suggestions/{id}: accept or reject a pending suggestion.
#[instrument(skip(state, user, payload))]
pub async fn resolve_suggestion(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResolveRequest>,
) -> Result<Json<Suggestion>, ApiError> {
    let target = payload.target_status()?;
    match Suggestion::resolve(&state.db, user.0.id, id, target).await? {
        ResolveOutcome::Resolved(suggestion) => {
            info!(user_id = %user.0.id, suggestion_id = %id, status = ?target, "suggestion resolved");
            Ok(Json(*suggestion))
        }
        ResolveOutcome::AlreadyResolved(status) => {
            debug_assert!(status.is_terminal());
            Err(ApiError::Conflict(format!(
                "suggestion was already {}",
                status.as_str()
            )))
        }
        ResolveOutcome::NotFound => Err(ApiError::NotFound(SUGGESTION_NOT_FOUND.into())),
    }
}
