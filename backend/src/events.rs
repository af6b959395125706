use uuid::Uuid;

use crate::db::Db;
use crate::error::{AppError, Result};
use crate::guard::event_from_row;
use crate::models::{Event, EventInput};
use crate::validation::event_draft;

const EVENT_COLUMNS: &str = "e.id, e.profile_id, e.name, e.start_time, e.end_time, e.notes";

impl Db {
    /// Events of an owned profile, earliest start first.
    pub async fn list_events(&self, user_id: Uuid, profile_id: Uuid) -> Result<Vec<Event>> {
        self.owned_profile(user_id, profile_id).await?;

        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM events e
             WHERE e.profile_id = $1
             ORDER BY e.start_time ASC, e.id ASC"
        ))
        .bind(profile_id.to_string())
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(event_from_row).collect()
    }

    /// Events across every profile the user owns, earliest start first.
    pub async fn list_all_events(&self, user_id: Uuid) -> Result<Vec<Event>> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM events e
             JOIN profiles p ON p.id = e.profile_id
             WHERE p.user_id = $1
             ORDER BY e.start_time ASC, e.id ASC"
        ))
        .bind(user_id.to_string())
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(event_from_row).collect()
    }

    pub async fn create_event(&self, user_id: Uuid, profile_id: Uuid, input: &EventInput) -> Result<Event> {
        let draft = event_draft(input)?;
        let event = Event {
            id: Uuid::new_v4(),
            profile_id,
            name: draft.name,
            start_time: draft.start_time,
            end_time: draft.end_time,
            notes: draft.notes,
        };

        // Ownership check and insert are one statement, so a concurrent
        // profile delete cannot leave an orphaned event behind.
        let inserted = sqlx::query(
            "INSERT INTO events (id, profile_id, name, start_time, end_time, notes)
             SELECT $1, $2, $3, $4, $5, $6
             WHERE EXISTS (SELECT 1 FROM profiles WHERE id = $7 AND user_id = $8)",
        )
        .bind(event.id.to_string())
        .bind(profile_id.to_string())
        .bind(&event.name)
        .bind(&event.start_time)
        .bind(&event.end_time)
        .bind(&event.notes)
        .bind(profile_id.to_string())
        .bind(user_id.to_string())
        .execute(self.pool())
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(AppError::NotFound("Profile"));
        }

        log::info!("event created: profile={} event={}", profile_id, event.id);
        Ok(event)
    }

    /// Replaces every field of an event. Concurrent updates to the same
    /// event are last-write-wins.
    pub async fn update_event(
        &self,
        user_id: Uuid,
        profile_id: Uuid,
        event_id: Uuid,
        input: &EventInput,
    ) -> Result<Event> {
        let draft = event_draft(input)?;

        let updated = sqlx::query(
            "UPDATE events SET name = $1, start_time = $2, end_time = $3, notes = $4
             WHERE id = $5 AND profile_id = $6
               AND EXISTS (SELECT 1 FROM profiles WHERE id = $7 AND user_id = $8)",
        )
        .bind(&draft.name)
        .bind(&draft.start_time)
        .bind(&draft.end_time)
        .bind(&draft.notes)
        .bind(event_id.to_string())
        .bind(profile_id.to_string())
        .bind(profile_id.to_string())
        .bind(user_id.to_string())
        .execute(self.pool())
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::NotFound("Event"));
        }

        log::info!("event updated: profile={} event={}", profile_id, event_id);
        Ok(Event {
            id: event_id,
            profile_id,
            name: draft.name,
            start_time: draft.start_time,
            end_time: draft.end_time,
            notes: draft.notes,
        })
    }

    pub async fn delete_event(&self, user_id: Uuid, profile_id: Uuid, event_id: Uuid) -> Result<()> {
        let deleted = sqlx::query(
            "DELETE FROM events
             WHERE id = $1 AND profile_id = $2
               AND EXISTS (SELECT 1 FROM profiles WHERE id = $3 AND user_id = $4)",
        )
        .bind(event_id.to_string())
        .bind(profile_id.to_string())
        .bind(profile_id.to_string())
        .bind(user_id.to_string())
        .execute(self.pool())
        .await?
        .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotFound("Event"));
        }

        log::info!("event deleted: profile={} event={}", profile_id, event_id);
        Ok(())
    }
}
