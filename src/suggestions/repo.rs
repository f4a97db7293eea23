use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use std::collections::BTreeMap;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "suggestion_kind", rename_all = "lowercase")]
pub enum SuggestionKind {
    Universal,
    Train,
    Task,
    Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "suggestion_status", rename_all = "lowercase")]
pub enum SuggestionStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
}

impl SuggestionStatus {
    /// `pending` is the only state a suggestion can leave; accepted,
    /// rejected and expired are all terminal.
    pub fn is_terminal(self) -> bool {
        self != SuggestionStatus::Pending
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SuggestionStatus::Pending => "pending",
            SuggestionStatus::Accepted => "accepted",
            SuggestionStatus::Rejected => "rejected",
            SuggestionStatus::Expired => "expired",
        }
    }
}

/// Where the suggestion came from: source tags, a confidence score and the
/// moment the producing signal was observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionContext {
    #[serde(default)]
    pub source: Vec<String>,
    pub confidence: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl SuggestionContext {
    pub fn new(
        source: Vec<String>,
        confidence: f64,
        timestamp: OffsetDateTime,
    ) -> anyhow::Result<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            anyhow::bail!("confidence must be within [0, 1], got {confidence}");
        }
        Ok(Self {
            source,
            confidence,
            timestamp,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub content: String,
    pub context: Json<SuggestionContext>,
    pub status: SuggestionStatus,
    pub metadata: Json<BTreeMap<String, serde_json::Value>>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Result of trying to resolve a pending suggestion.
#[derive(Debug)]
pub enum ResolveOutcome {
    Resolved(Box<Suggestion>),
    /// The suggestion exists and is owned by the caller but already left
    /// the pending state.
    AlreadyResolved(SuggestionStatus),
    NotFound,
}

impl Suggestion {
    /// Insert a new pending suggestion. Called by the extraction pipeline
    /// once it exists; until then only tests exercise it.
    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        kind: SuggestionKind,
        content: &str,
        context: &SuggestionContext,
        metadata: &BTreeMap<String, serde_json::Value>,
    ) -> sqlx::Result<Suggestion> {
        sqlx::query_as::<_, Suggestion>(
            r#"
            INSERT INTO suggestions (user_id, kind, content, context, metadata)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, kind, content, context, status, metadata,
                      created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(content)
        .bind(Json(context.clone()))
        .bind(Json(metadata.clone()))
        .fetch_one(db)
        .await
    }

    /// All suggestions of one user, newest first.
    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<Suggestion>> {
        sqlx::query_as::<_, Suggestion>(
            r#"
            SELECT id, user_id, kind, content, context, status, metadata,
                   created_at, updated_at
            FROM suggestions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    /// Move the user's stale pending suggestions to `expired`. Returns how
    /// many rows transitioned.
    pub async fn expire_stale(
        db: &PgPool,
        user_id: Uuid,
        cutoff: OffsetDateTime,
    ) -> sqlx::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE suggestions
            SET status = 'expired', updated_at = now()
            WHERE user_id = $1 AND status = 'pending' AND created_at < $2
            "#,
        )
        .bind(user_id)
        .bind(cutoff)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }

    /// Transition a pending suggestion to `accepted` or `rejected`, scoped
    /// to the owner.
    pub async fn resolve(
        db: &PgPool,
        user_id: Uuid,
        suggestion_id: Uuid,
        status: SuggestionStatus,
    ) -> sqlx::Result<ResolveOutcome> {
        debug_assert!(matches!(
            status,
            SuggestionStatus::Accepted | SuggestionStatus::Rejected
        ));

        let updated = sqlx::query_as::<_, Suggestion>(
            r#"
            UPDATE suggestions
            SET status = $3, updated_at = now()
            WHERE id = $1 AND user_id = $2 AND status = 'pending'
            RETURNING id, user_id, kind, content, context, status, metadata,
                      created_at, updated_at
            "#,
        )
        .bind(suggestion_id)
        .bind(user_id)
        .bind(status)
        .fetch_optional(db)
        .await?;

        if let Some(suggestion) = updated {
            return Ok(ResolveOutcome::Resolved(Box::new(suggestion)));
        }

        // Distinguish "gone" from "already terminal", still owner-scoped.
        let current = sqlx::query_scalar::<_, SuggestionStatus>(
            r#"
            SELECT status FROM suggestions
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(suggestion_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;

        Ok(match current {
            Some(status) => ResolveOutcome::AlreadyResolved(status),
            None => ResolveOutcome::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!SuggestionStatus::Pending.is_terminal());
        assert!(SuggestionStatus::Accepted.is_terminal());
        assert!(SuggestionStatus::Rejected.is_terminal());
        assert!(SuggestionStatus::Expired.is_terminal());
    }

    #[test]
    fn context_rejects_out_of_range_confidence() {
        let now = OffsetDateTime::UNIX_EPOCH;
        assert!(SuggestionContext::new(vec![], -0.1, now).is_err());
        assert!(SuggestionContext::new(vec![], 1.5, now).is_err());
        assert!(SuggestionContext::new(vec![], 0.0, now).is_ok());
        assert!(SuggestionContext::new(vec![], 1.0, now).is_ok());
    }

    #[test]
    fn suggestion_serializes_kind_as_type() {
        let context =
            SuggestionContext::new(vec!["memo".into()], 0.8, OffsetDateTime::UNIX_EPOCH).unwrap();
        let suggestion = Suggestion {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            kind: SuggestionKind::Train,
            content: "Leave by 08:12 for the 08:30 train".into(),
            context: Json(context),
            status: SuggestionStatus::Pending,
            metadata: Json(BTreeMap::new()),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_value(&suggestion).unwrap();
        assert_eq!(json["type"], "train");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["context"]["confidence"], 0.8);
        assert_eq!(json["context"]["source"][0], "memo");
    }
}
