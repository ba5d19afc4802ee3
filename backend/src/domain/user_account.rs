//! Registered user accounts.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::storage::{Document, DocumentError, EntityKind, FieldValue, Record};

/// Identity anchor for every owned entity.
///
/// `email` and `username` are unique across all accounts. The password hash
/// is produced by the calling layer; this crate stores it verbatim and never
/// serialises it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAccount {
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Record for UserAccount {
    const KIND: EntityKind = EntityKind::Users;

    fn to_document(&self) -> Document {
        Document::new()
            .with("email", self.email.as_str())
            .with("username", self.username.as_str())
            .with("full_name", FieldValue::from(self.full_name.clone()))
            .with("password_hash", self.password_hash.as_str())
            .with("is_active", self.is_active)
            .with("created_at", self.created_at)
    }

    fn from_document(document: &Document) -> Result<Self, DocumentError> {
        Ok(Self {
            email: document.require_text("email")?,
            username: document.require_text("username")?,
            full_name: document.optional_text("full_name")?,
            password_hash: document.require_text("password_hash")?,
            is_active: document.require_bool("is_active")?,
            created_at: document.require_timestamp("created_at")?,
        })
    }
}

/// Lower-case and trim an email address so uniqueness checks are case
/// insensitive.
///
/// # Examples
///
/// ```
/// # use aqi_backend::domain::normalise_email;
/// assert_eq!(normalise_email("  Asha@Example.COM "), "asha@example.com");
/// ```
pub fn normalise_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
