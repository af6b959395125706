//! Ownership checks run before any profile or event is read or written.
//!
//! A resource owned by someone else is reported exactly like a missing one,
//! so callers cannot probe for other users' ids.

use sqlx::any::AnyRow;
use sqlx::Row;
use uuid::Uuid;

use crate::db::{uuid_column, Db};
use crate::error::{AppError, Result};
use crate::models::{Event, Profile};

/// Path ids that are not UUIDs cannot name anything the caller owns.
pub fn parse_id(raw: &str, resource: &'static str) -> Result<Uuid> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::validation(format!("{resource} id not provided")));
    }
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(resource))
}

pub(crate) fn profile_from_row(row: &AnyRow) -> Result<Profile> {
    Ok(Profile {
        id: uuid_column(row, "id")?,
        name: row.try_get("name")?,
        user_id: uuid_column(row, "user_id")?,
    })
}

pub(crate) fn event_from_row(row: &AnyRow) -> Result<Event> {
    Ok(Event {
        id: uuid_column(row, "id")?,
        profile_id: uuid_column(row, "profile_id")?,
        name: row.try_get("name")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        notes: row.try_get("notes")?,
    })
}

impl Db {
    /// The profile, if it exists and belongs to `user_id`.
    pub async fn owned_profile(&self, user_id: Uuid, profile_id: Uuid) -> Result<Profile> {
        let row = sqlx::query("SELECT id, name, user_id FROM profiles WHERE id = $1 AND user_id = $2")
            .bind(profile_id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(self.pool())
            .await?;

        match row {
            Some(row) => profile_from_row(&row),
            None => Err(AppError::NotFound("Profile")),
        }
    }

    /// The event, if it lives under `profile_id` and that profile belongs to
    /// `user_id`.
    pub async fn owned_event(&self, user_id: Uuid, profile_id: Uuid, event_id: Uuid) -> Result<Event> {
        let row = sqlx::query(
            "SELECT e.id, e.profile_id, e.name, e.start_time, e.end_time, e.notes
             FROM events e
             JOIN profiles p ON p.id = e.profile_id
             WHERE e.id = $1 AND e.profile_id = $2 AND p.user_id = $3",
        )
        .bind(event_id.to_string())
        .bind(profile_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => event_from_row(&row),
            None => Err(AppError::NotFound("Event")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Assertion;
    use crate::models::EventInput;

    #[test]
    fn parse_id_distinguishes_missing_from_unknown() {
        assert!(matches!(parse_id("  ", "Profile"), Err(AppError::Validation(_))));
        assert!(matches!(parse_id("nope", "Profile"), Err(AppError::NotFound("Profile"))));
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "Profile").unwrap(), id);
    }

    #[tokio::test]
    async fn other_users_profile_is_not_found() {
        let db = Db::in_memory().await.unwrap();
        let owner = db.reconcile_identity(&Assertion::new("owner@example.com", None)).await.unwrap();
        let other = db.reconcile_identity(&Assertion::new("other@example.com", None)).await.unwrap();
        let profile = db.create_profile(owner.id, Some("Work")).await.unwrap();

        assert_eq!(db.owned_profile(owner.id, profile.id).await.unwrap(), profile);
        assert!(matches!(
            db.owned_profile(other.id, profile.id).await,
            Err(AppError::NotFound("Profile"))
        ));
        assert!(matches!(
            db.owned_profile(owner.id, Uuid::new_v4()).await,
            Err(AppError::NotFound("Profile"))
        ));
    }

    #[tokio::test]
    async fn event_must_match_profile() {
        let db = Db::in_memory().await.unwrap();
        let user = db.reconcile_identity(&Assertion::new("u@example.com", None)).await.unwrap();
        let work = db.create_profile(user.id, Some("Work")).await.unwrap();
        let home = db.create_profile(user.id, Some("Home")).await.unwrap();

        let input = EventInput {
            name: Some("Standup".into()),
            start_time: Some("2024-01-02T09:00".into()),
            end_time: Some("2024-01-02T09:15".into()),
            notes: None,
        };
        let event = db.create_event(user.id, work.id, &input).await.unwrap();

        assert!(db.owned_event(user.id, work.id, event.id).await.is_ok());
        assert!(matches!(
            db.owned_event(user.id, home.id, event.id).await,
            Err(AppError::NotFound("Event"))
        ));
    }
}
