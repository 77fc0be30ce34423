use std::ops::Deref;

use sqlx::PgPool;

use crate::models::user::User;
use crate::store::{FieldValue, Gateway, StoreError};

/// Users table access
#[derive(Clone)]
pub struct UserService {
    gateway: Gateway<User>,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            gateway: Gateway::new(pool),
        }
    }

    /// Exact-match lookup with single-row semantics
    ///
    /// `Ok(None)` when nobody has the email; an error if more than one row
    /// matches.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.gateway.find_one("email", FieldValue::from(email)).await
    }

    /// Users with the given privilege flag, newest first
    pub async fn get_by_privilege(&self, privileged: bool) -> Result<Vec<User>, StoreError> {
        self.gateway
            .find_many("privileged", FieldValue::Bool(privileged))
            .await
    }
}

impl Deref for UserService {
    type Target = Gateway<User>;

    fn deref(&self) -> &Self::Target {
        &self.gateway
    }
}
