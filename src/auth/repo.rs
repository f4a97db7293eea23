use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use std::collections::BTreeMap;
use time::OffsetDateTime;
use uuid::Uuid;

/// Free-form per-user settings. Open-ended maps are kept as JSON values so
/// that whatever the client stores round-trips unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    #[serde(default)]
    pub preferences: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub daily_routine: Vec<String>,
    #[serde(default)]
    pub locations: Locations,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Locations {
    pub home: Option<String>,
    pub work: Option<String>,
    #[serde(default)]
    pub frequent_places: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub personal_info: Json<PersonalInfo>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// The identity attached to a request once the session cookie resolves.
/// Never carries the password hash.
#[derive(Debug, Clone, FromRow)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl User {
    /// Find a user by (already lowercased) email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, personal_info, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    /// Create a new user with an already-hashed password and an empty
    /// personal-info bag.
    pub async fn create(
        db: &PgPool,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password_hash, personal_info)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, name, password_hash, personal_info, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .bind(Json(PersonalInfo::default()))
        .fetch_one(db)
        .await
    }

    /// Replace the personal-info bag. No route exposes this yet; profile
    /// updates go through it once the profile surface lands.
    pub async fn update_personal_info(
        db: &PgPool,
        user_id: Uuid,
        info: &PersonalInfo,
    ) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET personal_info = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, email, name, password_hash, personal_info, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(Json(info.clone()))
        .fetch_optional(db)
        .await
    }
}

impl AuthenticatedUser {
    /// Session lookup: resolves a user id to its identity, leaving the
    /// password column out of the query entirely.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<AuthenticatedUser>> {
        sqlx::query_as::<_, AuthenticatedUser>(
            r#"
            SELECT id, email, name
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_never_serializes_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@b.cd".into(),
            name: "A".into(),
            password_hash: "$argon2id$secret".into(),
            personal_info: Json(PersonalInfo::default()),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password_hash"));
    }

    #[test]
    fn personal_info_round_trips_open_ended_values() {
        let mut info = PersonalInfo::default();
        info.preferences
            .insert("wakeUp".into(), serde_json::json!("06:30"));
        info.preferences
            .insert("trainBufferMin".into(), serde_json::json!(10));
        info.daily_routine.push("gym".into());
        info.locations.home = Some("Shibuya".into());

        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("dailyRoutine"));
        assert!(json.contains("frequentPlaces"));

        let back: PersonalInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back.preferences["trainBufferMin"], serde_json::json!(10));
        assert_eq!(back.locations.home.as_deref(), Some("Shibuya"));
    }

    #[test]
    fn personal_info_tolerates_empty_object() {
        let info: PersonalInfo = serde_json::from_str("{}").unwrap();
        assert!(info.preferences.is_empty());
        assert!(info.daily_routine.is_empty());
        assert!(info.locations.frequent_places.is_empty());
    }
}
