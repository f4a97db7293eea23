use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::events::dto::EventPayload;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "importance", rename_all = "lowercase")]
pub enum Importance {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// Stored but inert: no code path expands recurring events yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "recurrence", rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    /// Calendar date as a date-only `YYYY-MM-DD` string, preserved as the
    /// client sent it.
    pub date: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub is_all_day: bool,
    pub is_no_duration: bool,
    pub importance: Importance,
    pub location: Option<String>,
    pub recurrence: Recurrence,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Event {
    /// All events of one user, ordered by date then start time ascending.
    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<Event>> {
        sqlx::query_as::<_, Event>(
            r#"
            SELECT id, user_id, title, date, start_time, end_time, is_all_day,
                   is_no_duration, importance, location, recurrence, created_at, updated_at
            FROM events
            WHERE user_id = $1
            ORDER BY date ASC, start_time ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    pub async fn create(db: &PgPool, user_id: Uuid, payload: &EventPayload) -> sqlx::Result<Event> {
        sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (user_id, title, date, start_time, end_time, is_all_day,
                                is_no_duration, importance, location, recurrence)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, user_id, title, date, start_time, end_time, is_all_day,
                      is_no_duration, importance, location, recurrence, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(payload.title.trim())
        .bind(&payload.date)
        .bind(&payload.start_time)
        .bind(&payload.end_time)
        .bind(payload.is_all_day)
        .bind(payload.is_no_duration)
        .bind(payload.importance)
        .bind(&payload.location)
        .bind(payload.recurrence)
        .fetch_one(db)
        .await
    }

    /// Replace an event, scoped to its owner. `None` covers both a missing
    /// id and one owned by somebody else.
    pub async fn update(
        db: &PgPool,
        user_id: Uuid,
        event_id: Uuid,
        payload: &EventPayload,
    ) -> sqlx::Result<Option<Event>> {
        sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
            SET title = $3, date = $4, start_time = $5, end_time = $6, is_all_day = $7,
                is_no_duration = $8, importance = $9, location = $10, recurrence = $11,
                updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, date, start_time, end_time, is_all_day,
                      is_no_duration, importance, location, recurrence, created_at, updated_at
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .bind(payload.title.trim())
        .bind(&payload.date)
        .bind(&payload.start_time)
        .bind(&payload.end_time)
        .bind(payload.is_all_day)
        .bind(payload.is_no_duration)
        .bind(payload.importance)
        .bind(&payload.location)
        .bind(payload.recurrence)
        .fetch_optional(db)
        .await
    }

    /// Delete an event, scoped to its owner. Returns whether a row went away.
    pub async fn delete(db: &PgPool, user_id: Uuid, event_id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM events
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(event_id)
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
    fn event_serializes_camel_case() {
        let event = Event {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Meeting".into(),
            date: "2025-01-10".into(),
            start_time: Some("09:30".into()),
            end_time: None,
            is_all_day: false,
            is_no_duration: false,
            importance: Importance::High,
            location: None,
            recurrence: Recurrence::None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["startTime"], "09:30");
        assert_eq!(json["isAllDay"], false);
        assert_eq!(json["importance"], "high");
        assert_eq!(json["recurrence"], "none");
    }
}
