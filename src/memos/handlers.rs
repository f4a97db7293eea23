use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::ApiError,
    memos::{dto::MemoPayload, repo::Memo},
    state::AppState,
};

pub fn memo_routes() -> Router<AppState> {
    Router::new()
        .route("/memos", get(list_memos).post(create_memo))
        .route("/memos/:id", put(update_memo).delete(delete_memo))
}

// One message for "does not exist" and "belongs to someone else" so the
// response does not reveal which ids are taken.
const MEMO_NOT_FOUND: &str = "memo not found or no permission";

fn validated_content(payload: &MemoPayload) -> Result<&str, ApiError> {
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation("memo content is required".into()));
    }
    Ok(content)
}

#[instrument(skip(state, user))]
pub async fn list_memos(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Memo>>, ApiError> {
    let memos = Memo::list_by_user(&state.db, user.0.id).await?;
    Ok(Json(memos))
}

#[instrument(skip(state, user, payload))]
pub async fn create_memo(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<MemoPayload>,
) -> Result<(StatusCode, Json<Memo>), ApiError> {
    let content = validated_content(&payload)?;
    let memo = Memo::create(
        &state.db,
        user.0.id,
        content,
        &payload.category,
        &payload.tags,
    )
    .await?;
    info!(user_id = %user.0.id, memo_id = %memo.id, "memo created");
    Ok((StatusCode::CREATED, Json(memo)))
}

#[instrument(skip(state, user, payload))]
pub async fn update_memo(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<MemoPayload>,
) -> Result<Json<Memo>, ApiError> {
    let content = validated_content(&payload)?;
    let memo = Memo::update(
        &state.db,
        user.0.id,
        id,
        content,
        &payload.category,
        &payload.tags,
    )
    .await?
    .ok_or_else(|| ApiError::NotFound(MEMO_NOT_FOUND.into()))?;
    info!(user_id = %user.0.id, memo_id = %memo.id, "memo updated");
    Ok(Json(memo))
}

#[instrument(skip(state, user))]
pub async fn delete_memo(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !Memo::delete(&state.db, user.0.id, id).await? {
        return Err(ApiError::NotFound(MEMO_NOT_FOUND.into()));
    }
    info!(user_id = %user.0.id, memo_id = %id, "memo deleted");
    Ok(Json(json!({ "success": true, "message": "memo deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_trimmed() {
        let payload = MemoPayload {
            content: "  buy milk  ".into(),
            category: "general".into(),
            tags: vec![],
        };
        assert_eq!(validated_content(&payload).unwrap(), "buy milk");
    }

    #[test]
    fn whitespace_only_content_is_rejected() {
        let payload = MemoPayload {
            content: "   \n\t".into(),
            category: "general".into(),
            tags: vec![],
        };
        assert!(validated_content(&payload).is_err());
    }
}
