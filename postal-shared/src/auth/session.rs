/// Session to user resolution
///
/// A session names a login email. Pages need the domain [`User`] behind it
/// plus a privilege check:
///
/// | Situation | Result |
/// |---|---|
/// | no or invalid session | [`SessionError::NoSession`], go to `/` |
/// | no user row for the email | [`SessionError::UnknownUser`], fatal for the page |
/// | admin page, unprivileged user | [`SessionError::NotAdmin`], go to `/user` |
///
/// Admins may open user pages.

use tracing::{debug, warn};

use super::middleware::AuthContext;
use crate::models::user::User;
use crate::services::UserService;
use crate::store::StoreError;

/// Access level a page requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

/// Resolved caller
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub user: User,
}

impl Identity {
    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }

    /// Dashboard the caller lands on after login
    pub fn landing(&self) -> &'static str {
        if self.user.is_admin() {
            "/admin"
        } else {
            "/user"
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Not signed in")]
    NoSession,

    #[error("No user record found for this email.")]
    UnknownUser(String),

    #[error("Admin access required")]
    NotAdmin,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl SessionError {
    /// Page the client should be sent to, if any
    pub fn redirect_to(&self) -> Option<&'static str> {
        match self {
            SessionError::NoSession => Some("/"),
            SessionError::NotAdmin => Some("/user"),
            SessionError::UnknownUser(_) | SessionError::Storage(_) => None,
        }
    }
}

/// Applies the role rule to an already loaded user
pub fn authorize(user: User, role: Role) -> Result<Identity, SessionError> {
    match role {
        Role::Admin if !user.is_admin() => Err(SessionError::NotAdmin),
        _ => Ok(Identity { user }),
    }
}

#[derive(Clone)]
pub struct SessionResolver {
    users: UserService,
}

impl SessionResolver {
    pub fn new(users: UserService) -> Self {
        Self { users }
    }

    pub async fn resolve(
        &self,
        session: Option<&AuthContext>,
        role: Role,
    ) -> Result<Identity, SessionError> {
        let session = session.ok_or(SessionError::NoSession)?;

        let user = self
            .users
            .get_by_email(&session.email)
            .await?
            .ok_or_else(|| {
                warn!(email = %session.email, "Session has no matching user row");
                SessionError::UnknownUser(session.email.clone())
            })?;

        let identity = authorize(user, role)?;
        debug!(user_id = identity.user_id(), role = ?role, "Session resolved");

        Ok(identity)
    }
}
