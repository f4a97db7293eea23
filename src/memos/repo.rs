use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use std::collections::BTreeMap;
use time::OffsetDateTime;
use uuid::Uuid;

/// Structured data a future extraction pipeline would pull out of the memo
/// text. Written nowhere yet; stored so existing rows survive that pipeline
/// landing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedInfo {
    #[serde(default)]
    pub tasks: Vec<String>,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub preferences: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Memo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub is_processed: bool,
    pub extracted_info: Json<ExtractedInfo>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Memo {
    /// All memos of one user, newest first.
    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<Memo>> {
        sqlx::query_as::<_, Memo>(
            r#"
            SELECT id, user_id, content, category, tags, is_processed, extracted_info,
                   created_at, updated_at
            FROM memos
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        content: &str,
        category: &str,
        tags: &[String],
    ) -> sqlx::Result<Memo> {
        sqlx::query_as::<_, Memo>(
            r#"
            INSERT INTO memos (user_id, content, category, tags)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, content, category, tags, is_processed, extracted_info,
                      created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(content)
        .bind(category)
        .bind(tags)
        .fetch_one(db)
        .await
    }

    /// Rewrite content, category and tags, scoped to the owner. `None`
    /// covers both a missing id and one owned by somebody else.
    pub async fn update(
        db: &PgPool,
        user_id: Uuid,
        memo_id: Uuid,
        content: &str,
        category: &str,
        tags: &[String],
    ) -> sqlx::Result<Option<Memo>> {
        sqlx::query_as::<_, Memo>(
            r#"
            UPDATE memos
            SET content = $3, category = $4, tags = $5, updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, content, category, tags, is_processed, extracted_info,
                      created_at, updated_at
            "#,
        )
        .bind(memo_id)
        .bind(user_id)
        .bind(content)
        .bind(category)
        .bind(tags)
        .fetch_optional(db)
        .await
    }

    /// Delete a memo, scoped to the owner. Returns whether a row went away.
    pub async fn delete(db: &PgPool, user_id: Uuid, memo_id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM memos
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(memo_id)
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memo_serializes_camel_case() {
        let memo = Memo {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            content: "buy milk".into(),
            category: "general".into(),
            tags: vec!["errand".into()],
            is_processed: false,
            extracted_info: Json(ExtractedInfo::default()),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_value(&memo).unwrap();
        assert_eq!(json["isProcessed"], false);
        assert!(json["extractedInfo"].is_object());
        assert_eq!(json["tags"][0], "errand");
    }

    #[test]
    fn extracted_info_tolerates_empty_object() {
        let info: ExtractedInfo = serde_json::from_str("{}").unwrap();
        assert!(info.tasks.is_empty());
        assert!(info.events.is_empty());
        assert!(info.preferences.is_empty());
    }
}
