use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

use crate::db::{optional_uuid_column, Db};
use crate::error::{AppError, Result};
use crate::guard::profile_from_row;
use crate::models::Profile;
use crate::validation::profile_name;

impl Db {
    /// Profiles owned by `user_id`, oldest first.
    pub async fn list_profiles(&self, user_id: Uuid) -> Result<Vec<Profile>> {
        let rows = sqlx::query(
            "SELECT id, name, user_id FROM profiles WHERE user_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(user_id.to_string())
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(profile_from_row).collect()
    }

    pub async fn create_profile(&self, user_id: Uuid, name: Option<&str>) -> Result<Profile> {
        let name = profile_name(name)?;
        let profile = Profile {
            id: Uuid::new_v4(),
            name,
            user_id,
        };

        sqlx::query("INSERT INTO profiles (id, user_id, name, created_at) VALUES ($1, $2, $3, $4)")
            .bind(profile.id.to_string())
            .bind(user_id.to_string())
            .bind(&profile.name)
            .bind(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
            .execute(self.pool())
            .await?;

        log::info!("profile created: user={} profile={}", user_id, profile.id);
        Ok(profile)
    }

    /// Deletes the profile and all of its events in one transaction.
    /// Returns the number of events removed.
    ///
    /// Deleting a user's last profile is allowed here; keeping one around is
    /// up to the client.
    pub async fn delete_profile(&self, user_id: Uuid, profile_id: Uuid) -> Result<u64> {
        let mut tx = self.pool().begin().await?;

        let owned = sqlx::query("SELECT id FROM profiles WHERE id = $1 AND user_id = $2")
            .bind(profile_id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        if owned.is_none() {
            tx.rollback().await?;
            return Err(AppError::NotFound("Profile"));
        }

        let events = sqlx::query("DELETE FROM events WHERE profile_id = $1")
            .bind(profile_id.to_string())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("UPDATE users SET default_profile_id = NULL WHERE id = $1 AND default_profile_id = $2")
            .bind(user_id.to_string())
            .bind(profile_id.to_string())
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(profile_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        log::info!(
            "profile deleted: user={} profile={} events_removed={}",
            user_id,
            profile_id,
            events
        );
        Ok(events)
    }

    pub async fn default_profile_id(&self, user_id: Uuid) -> Result<Option<Uuid>> {
        let row = sqlx::query("SELECT default_profile_id FROM users WHERE id = $1")
            .bind(user_id.to_string())
            .fetch_optional(self.pool())
            .await?;

        match row {
            Some(row) => optional_uuid_column(&row, "default_profile_id"),
            None => Ok(None),
        }
    }

    /// Marks an owned profile as the user's default.
    pub async fn set_default_profile(&self, user_id: Uuid, profile_id: Uuid) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE users SET default_profile_id = $1
             WHERE id = $2 AND EXISTS (SELECT 1 FROM profiles WHERE id = $3 AND user_id = $4)",
        )
        .bind(profile_id.to_string())
        .bind(user_id.to_string())
        .bind(profile_id.to_string())
        .bind(user_id.to_string())
        .execute(self.pool())
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::NotFound("Profile"));
        }
        Ok(())
    }
}
