/// Login accounts
///
/// An account is a credential row (email + Argon2id hash) paired with a
/// user row of the same email. Sign-up writes the credential first and then
/// the user row with privilege off; if the second write fails the credential
/// is removed again.
///
/// Emails are stored trimmed and lowercased, see [`normalize_email`].

use sqlx::PgPool;
use tracing::{info, warn};

use super::password::{
    hash_password, validate_password_strength, verify_password, PasswordError, WeakPassword,
};
use super::session::Identity;
use crate::models::credential::Credential;
use crate::models::user::{NewUser, User};
use crate::services::UserService;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("User already registered")]
    EmailTaken,

    #[error("No user record found for this email.")]
    UnknownUser,

    #[error("New passwords don't match")]
    PasswordMismatch,

    #[error("Current password is incorrect")]
    IncorrectPassword,

    #[error(transparent)]
    WeakPassword(#[from] WeakPassword),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Sign-up form
#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub address: String,
}

/// Password change form from the settings page
#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordChange {
    /// Checks that need no stored state: confirmation first, then strength
    pub fn check(&self) -> Result<(), AccountError> {
        if self.new_password != self.confirm_password {
            return Err(AccountError::PasswordMismatch);
        }
        validate_password_strength(&self.new_password)?;
        Ok(())
    }
}

/// Canonical form of an email address: trimmed and lowercased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[derive(Clone)]
pub struct AccountService {
    pool: PgPool,
    users: UserService,
}

impl AccountService {
    pub fn new(users: UserService) -> Self {
        Self {
            pool: users.pool().clone(),
            users,
        }
    }

    pub async fn sign_up(&self, form: SignUp) -> Result<User, AccountError> {
        validate_password_strength(&form.password)?;
        let hash = hash_password(&form.password)?;
        let email = normalize_email(&form.email);

        Credential::create(&self.pool, &email, &hash)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AccountError::EmailTaken
                } else {
                    AccountError::Database(e)
                }
            })?;

        let created = self
            .users
            .create(NewUser {
                email: email.clone(),
                address: form.address,
            })
            .await;

        match created {
            Ok(user) => {
                info!(user_id = user.id, "Account created");
                Ok(user)
            }
            Err(e) => {
                if let Err(cleanup) = Credential::delete(&self.pool, &email).await {
                    warn!(error = %cleanup, "Failed to remove credential after sign-up failure");
                }
                if e.constraint() == Some("users_email_key") {
                    Err(AccountError::EmailTaken)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AccountError> {
        let email = normalize_email(email);
        let credential = Credential::find_by_email(&self.pool, &email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !verify_password(password, &credential.password_hash)? {
            return Err(AccountError::InvalidCredentials);
        }

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AccountError::UnknownUser)?;

        Credential::record_login(&self.pool, &email).await?;
        info!(user_id = user.id, "Signed in");

        Ok(Identity { user })
    }

    pub async fn change_password(
        &self,
        email: &str,
        change: &PasswordChange,
    ) -> Result<(), AccountError> {
        change.check()?;

        let credential = Credential::find_by_email(&self.pool, email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !verify_password(&change.current_password, &credential.password_hash)? {
            return Err(AccountError::IncorrectPassword);
        }

        let hash = hash_password(&change.new_password)?;
        Credential::update_password(&self.pool, email, &hash).await?;
        info!(email = %email, "Password changed");

        Ok(())
    }

    /// Moves the login to a new email; false if `old_email` has no login
    ///
    /// Both addresses are used as given. Callers normalize the new one.
    pub async fn move_login(&self, old_email: &str, new_email: &str) -> Result<bool, AccountError> {
        match Credential::change_email(&self.pool, old_email, new_email).await {
            Ok(moved) => Ok(moved),
            Err(e) if is_unique_violation(&e) => Err(AccountError::EmailTaken),
            Err(e) => Err(e.into()),
        }
    }

    /// Drops the login; true if one existed
    pub async fn remove_login(&self, email: &str) -> Result<bool, AccountError> {
        Ok(Credential::delete(&self.pool, email).await?)
    }
}
