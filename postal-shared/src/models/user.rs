/// User model
///
/// A user row is the domain-side identity of a login. The email matches the
/// credential email; the privilege flag decides between the user and the
/// admin dashboards.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     email TEXT NOT NULL UNIQUE,
///     address TEXT NOT NULL DEFAULT '',
///     privileged BOOLEAN NOT NULL DEFAULT FALSE
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{FieldSet, FieldValue, Fields, Record};

/// User record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,

    pub created_at: DateTime<Utc>,

    /// Login email, unique across users
    pub email: String,

    /// Free-text postal address
    pub address: String,

    /// True for admins
    pub privileged: bool,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.privileged
    }
}

/// Input for creating a user at sign-up
///
/// There is no privilege field: new users always start unprivileged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub address: String,
}

/// Input for updating a user. Only `Some` fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPatch {
    pub email: Option<String>,
    pub address: Option<String>,
    pub privileged: Option<bool>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.address.is_none() && self.privileged.is_none()
    }
}

impl Fields for NewUser {
    fn into_fields(self) -> Vec<(&'static str, FieldValue)> {
        FieldSet::new()
            .set("email", self.email)
            .set("address", self.address)
            .set("privileged", false)
            .finish()
    }
}

impl Fields for UserPatch {
    fn into_fields(self) -> Vec<(&'static str, FieldValue)> {
        FieldSet::new()
            .set_opt("email", self.email)
            .set_opt("address", self.address)
            .set_opt("privileged", self.privileged)
            .finish()
    }
}

impl Record for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static str = "id, created_at, email, address, privileged";

    type New = NewUser;
    type Patch = UserPatch;
}
