//! Account registration and profile maintenance.

use std::sync::Arc;

use mockable::Clock;
use tracing::{debug, info};

use super::ports::StorageGateway;
use super::storage::{
    Document, Filter, Record, RecordId, Stored, find_record, insert_record, storage_now,
};
use super::{DomainError, UserAccount, UserSettings, normalise_email};

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 50;

/// Registration payload. The password arrives already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub password_hash: String,
}

/// Profile change; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub is_active: Option<bool>,
}

/// Account lifecycle over the storage gateway.
#[derive(Clone)]
pub struct AccountsService {
    gateway: Arc<dyn StorageGateway>,
    clock: Arc<dyn Clock>,
}

impl AccountsService {
    /// Build the service over the active gateway.
    pub fn new(gateway: Arc<dyn StorageGateway>, clock: Arc<dyn Clock>) -> Self {
        Self { gateway, clock }
    }

    /// Register a new account and store its default settings.
    ///
    /// The email and username pre-checks give friendly errors, but the unique
    /// indexes are authoritative: a concurrent registration that slips past
    /// them still fails with [`super::ErrorCode::Conflict`].
    pub async fn register(&self, request: NewAccount) -> Result<Stored<UserAccount>, DomainError> {
        let email = normalise_email(&request.email);
        let username = request.username.trim().to_owned();
        validate_email(&email)?;
        validate_username(&username)?;
        if request.password_hash.trim().is_empty() {
            return Err(DomainError::invalid_request("password hash must not be empty"));
        }

        self.ensure_email_free(&email, None).await?;
        self.ensure_username_free(&username, None).await?;

        let now = storage_now(self.clock.utc());
        let account = insert_record(
            self.gateway.as_ref(),
            UserAccount {
                email,
                username,
                full_name: request.full_name.filter(|name| !name.trim().is_empty()),
                password_hash: request.password_hash,
                is_active: true,
                created_at: now,
            },
        )
        .await?;
        insert_record(
            self.gateway.as_ref(),
            UserSettings::defaults_for(account.id, now),
        )
        .await?;

        info!(user_id = %account.id, "registered account");
        Ok(account)
    }

    /// Fetch one account; unknown identifiers are `NotFound`.
    pub async fn find_by_id(&self, id: RecordId) -> Result<Stored<UserAccount>, DomainError> {
        find_record(self.gateway.as_ref(), &Filter::by_id(id))
            .await?
            .ok_or_else(|| DomainError::not_found(format!("user {id} not found")))
    }

    /// Look an account up by its normalised email address.
    pub async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Stored<UserAccount>>, DomainError> {
        let filter = Filter::new().eq("email", normalise_email(email));
        Ok(find_record(self.gateway.as_ref(), &filter).await?)
    }

    /// Apply a profile change. Uniqueness is only re-checked for values that
    /// actually change.
    pub async fn update_profile(
        &self,
        id: RecordId,
        update: ProfileUpdate,
    ) -> Result<Stored<UserAccount>, DomainError> {
        let mut current = self.find_by_id(id).await?;
        let mut changes = Document::new();

        if let Some(raw) = update.email {
            let email = normalise_email(&raw);
            if email != current.record.email {
                validate_email(&email)?;
                self.ensure_email_free(&email, Some(id)).await?;
                changes.insert("email", email.as_str());
                current.record.email = email;
            }
        }
        if let Some(raw) = update.username {
            let username = raw.trim().to_owned();
            if username != current.record.username {
                validate_username(&username)?;
                self.ensure_username_free(&username, Some(id)).await?;
                changes.insert("username", username.as_str());
                current.record.username = username;
            }
        }
        if let Some(full_name) = update.full_name {
            let full_name = Some(full_name).filter(|name| !name.trim().is_empty());
            changes.insert("full_name", full_name.clone());
            current.record.full_name = full_name;
        }
        if let Some(active) = update.is_active {
            changes.insert("is_active", active);
            current.record.is_active = active;
        }

        if changes.is_empty() {
            debug!(user_id = %id, "profile update carried no changes");
            return Ok(current);
        }

        let matched = self
            .gateway
            .update_one(UserAccount::KIND, &Filter::by_id(id), changes)
            .await?;
        if matched == 0 {
            return Err(DomainError::not_found(format!("user {id} not found")));
        }
        Ok(current)
    }

    /// Delete the account record only. Locations, notifications, and
    /// settings owned by the user are left in place.
    pub async fn delete_account(&self, id: RecordId) -> Result<(), DomainError> {
        let deleted = self
            .gateway
            .delete_one(UserAccount::KIND, &Filter::by_id(id))
            .await?;
        if deleted == 0 {
            return Err(DomainError::not_found(format!("user {id} not found")));
        }
        info!(user_id = %id, "deleted account");
        Ok(())
    }

    async fn ensure_email_free(
        &self,
        email: &str,
        owner: Option<RecordId>,
    ) -> Result<(), DomainError> {
        let filter = Filter::new().eq("email", email);
        let existing: Option<Stored<UserAccount>> =
            find_record(self.gateway.as_ref(), &filter).await?;
        match existing {
            Some(found) if Some(found.id) != owner => {
                Err(DomainError::conflict("email already registered"))
            }
            _ => Ok(()),
        }
    }

    async fn ensure_username_free(
        &self,
        username: &str,
        owner: Option<RecordId>,
    ) -> Result<(), DomainError> {
        let filter = Filter::new().eq("username", username);
        let existing: Option<Stored<UserAccount>> =
            find_record(self.gateway.as_ref(), &filter).await?;
        match existing {
            Some(found) if Some(found.id) != owner => {
                Err(DomainError::conflict("username already taken"))
            }
            _ => Ok(()),
        }
    }
}

fn validate_email(email: &str) -> Result<(), DomainError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(())
    } else {
        Err(DomainError::invalid_request(format!(
            "'{email}' is not a valid email address"
        )))
    }
}

fn validate_username(username: &str) -> Result<(), DomainError> {
    let length = username.chars().count();
    if (MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&length) {
        Ok(())
    } else {
        Err(DomainError::invalid_request(format!(
            "username must be between {MIN_USERNAME_LEN} and {MAX_USERNAME_LEN} characters"
        )))
    }
}

#[cfg(test)]
#[path = "accounts_service_tests.rs"]
mod tests;
