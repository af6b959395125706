//! Identity reconciliation.
//!
//! An external sign-in produces an assertion (email, optional display name).
//! The assertion is mapped onto a durable local [`User`] by upserting on the
//! email address, so any provider that vouches for the same address resolves
//! to the same user id.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use sqlx::any::AnyRow;
use sqlx::Row;
use uuid::Uuid;

use crate::db::{uuid_column, Db};
use crate::error::{AppError, IdentityError, Result};
use crate::models::User;
use crate::validation::validate_input_string;

const EMAIL_MAX: usize = 320;
const DISPLAY_NAME_MAX: usize = 200;

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("static email pattern"));

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Assertion {
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Assertion {
    pub fn new(email: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            email: Some(email.into()),
            name: name.map(str::to_string),
        }
    }
}

/// Emails are compared case-insensitively after trimming.
fn normalize_email(raw: Option<&str>) -> Result<String, IdentityError> {
    let email = raw
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or(IdentityError::MissingAttribute("email"))?;

    if email.chars().count() > EMAIL_MAX || !EMAIL_SHAPE.is_match(email) {
        return Err(IdentityError::InvalidAttribute {
            attribute: "email",
            reason: "not an email address".to_string(),
        });
    }
    Ok(email.to_lowercase())
}

fn normalize_name(raw: Option<&str>) -> Result<Option<String>, IdentityError> {
    let Some(name) = raw.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    validate_input_string(name, Some(DISPLAY_NAME_MAX), false).map_err(|reason| {
        IdentityError::InvalidAttribute {
            attribute: "name",
            reason,
        }
    })?;
    Ok(Some(name.to_string()))
}

fn user_from_row(row: &AnyRow) -> Result<User> {
    Ok(User {
        id: uuid_column(row, "id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
    })
}

impl Db {
    /// Creates the user on first sign-in, otherwise refreshes the stored
    /// display name. An assertion without a name keeps the stored one.
    pub async fn reconcile_identity(&self, assertion: &Assertion) -> Result<User, IdentityError> {
        let email = normalize_email(assertion.email.as_deref())?;
        let name = normalize_name(assertion.name.as_deref())?;

        sqlx::query(
            "INSERT INTO users (id, email, name) VALUES ($1, $2, $3)
             ON CONFLICT (email) DO UPDATE SET name = COALESCE(EXCLUDED.name, users.name)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&email)
        .bind(name)
        .execute(self.pool())
        .await
        .map_err(|e| IdentityError::Lookup(e.to_string()))?;

        // The durable id is whatever the store holds for this email, which
        // is not the id generated above when the user already existed.
        let user = sqlx::query("SELECT id, email, name FROM users WHERE email = $1")
            .bind(&email)
            .fetch_one(self.pool())
            .await
            .map_err(AppError::from)
            .and_then(|row| user_from_row(&row))
            .map_err(|e| IdentityError::Lookup(e.to_string()))?;

        log::info!("identity reconciled: user={}", user.id);
        Ok(user)
    }

    pub async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, email, name FROM users WHERE id = $1")
            .bind(user_id.to_string())
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn user_count(db: &Db) -> i64 {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(db.pool())
            .await
            .unwrap();
        row.try_get("n").unwrap()
    }

    #[tokio::test]
    async fn repeated_sign_in_keeps_durable_id() {
        let db = Db::in_memory().await.unwrap();

        let first = db
            .reconcile_identity(&Assertion::new("ada@example.com", Some("Ada")))
            .await
            .unwrap();
        let second = db
            .reconcile_identity(&Assertion::new("ada@example.com", Some("Ada")))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(user_count(&db).await, 1);
    }

    #[tokio::test]
    async fn latest_name_wins() {
        let db = Db::in_memory().await.unwrap();

        let first = db
            .reconcile_identity(&Assertion::new("ada@example.com", Some("Ada")))
            .await
            .unwrap();
        let renamed = db
            .reconcile_identity(&Assertion::new(" ADA@example.com ", Some("Ada Lovelace")))
            .await
            .unwrap();

        assert_eq!(first.id, renamed.id);
        assert_eq!(renamed.name.as_deref(), Some("Ada Lovelace"));

        // No name in the assertion leaves the stored one alone.
        let unnamed = db
            .reconcile_identity(&Assertion::new("ada@example.com", None))
            .await
            .unwrap();
        assert_eq!(unnamed.name.as_deref(), Some("Ada Lovelace"));

        let stored = db.find_user(first.id).await.unwrap().unwrap();
        assert_eq!(stored, unnamed);
    }

    #[tokio::test]
    async fn missing_email_aborts_sign_in() {
        let db = Db::in_memory().await.unwrap();

        let err = db
            .reconcile_identity(&Assertion {
                email: None,
                name: Some("Nobody".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::MissingAttribute("email")));

        let err = db
            .reconcile_identity(&Assertion::new("   ", None))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::MissingAttribute("email")));
        assert_eq!(user_count(&db).await, 0);
    }

    #[tokio::test]
    async fn malformed_email_is_rejected() {
        let db = Db::in_memory().await.unwrap();
        let err = db
            .reconcile_identity(&Assertion::new("not-an-email", None))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidAttribute { attribute: "email", .. }));
    }

    #[tokio::test]
    async fn distinct_emails_get_distinct_users() {
        let db = Db::in_memory().await.unwrap();
        let a = db.reconcile_identity(&Assertion::new("a@example.com", None)).await.unwrap();
        let b = db.reconcile_identity(&Assertion::new("b@example.com", None)).await.unwrap();
        assert_ne!(a.id, b.id);
        assert!(a.name.is_none());
    }

    #[tokio::test]
    async fn broken_store_fails_with_lookup_error() {
        let db = Db::in_memory().await.unwrap();
        sqlx::query("DROP TABLE users").execute(db.pool()).await.unwrap();

        let err = db
            .reconcile_identity(&Assertion::new("ada@example.com", Some("Ada")))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Lookup(_)), "{err:?}");
    }
}
