/// Dashboard controllers
///
/// Each controller loads the data a page shows, keeps it in a
/// [`ViewState`], and applies the page's actions to both the database and
/// the loaded copy:
///
/// - [`admin::AdminDashboard`] and [`admin::AdminSettings`] for privileged users
/// - [`user::UserDashboard`] and [`user::UserSettings`] for everyone signed in
///
/// A failed action replaces the view with its error message; `reload`
/// fetches everything again.
///
/// # Example
///
/// ```no_run
/// use postal_shared::auth::Identity;
/// use postal_shared::dashboard::filter::LifecycleBucket;
/// use postal_shared::dashboard::user::UserDashboard;
/// use postal_shared::services::Services;
///
/// # async fn example(services: Services, identity: Identity) -> Result<(), Box<dyn std::error::Error>> {
/// let mut dashboard = UserDashboard::new(services, identity);
/// let view = dashboard.load().await?;
///
/// for shipment in view.bucket(Some(LifecycleBucket::Active)) {
///     println!("#{} {}", shipment.id, shipment.status_label());
/// }
/// # Ok(())
/// # }
/// ```

pub mod admin;
pub mod filter;
pub mod form;
pub mod stats;
pub mod user;

use crate::auth::account::AccountError;
use crate::auth::SessionError;
use crate::store::StoreError;

/// Shown after a profile update
pub const PROFILE_UPDATED: &str = "Profile updated successfully!";

/// Shown after a password change
pub const PASSWORD_UPDATED: &str = "Password updated successfully!";

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Account(#[from] AccountError),

    /// Form rule failed before anything was sent
    #[error("{0}")]
    Validation(String),

    #[error("Shipment not found")]
    TrackingNotFound,

    #[error("No shipment is awaiting cancellation")]
    NoPendingCancel,

    #[error("Dashboard data has not been loaded")]
    NotLoaded,
}

impl DashboardError {
    pub(crate) fn validation(message: &str) -> Self {
        DashboardError::Validation(message.to_string())
    }
}

/// What a page currently shows
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Loading,
    Ready(T),
    Error(String),
}

impl<T> ViewState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            ViewState::Ready(view) => Some(view),
            _ => None,
        }
    }

    pub fn ready_mut(&mut self) -> Option<&mut T> {
        match self {
            ViewState::Ready(view) => Some(view),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ViewState::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Replaces the view with the error message and hands the error back
    pub fn fail(&mut self, err: DashboardError) -> DashboardError {
        *self = ViewState::Error(err.to_string());
        err
    }

    /// Passes `result` through, replacing the view with the error message on failure
    pub fn record<R>(&mut self, result: Result<R, DashboardError>) -> Result<R, DashboardError> {
        result.map_err(|e| self.fail(e))
    }
}

/// Overwrites the first element `same` picks out; false if none matched
pub(crate) fn replace_where<T>(items: &mut [T], item: T, same: impl Fn(&T) -> bool) -> bool {
    match items.iter_mut().find(|existing| same(existing)) {
        Some(slot) => {
            *slot = item;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_error_replaces_earlier() {
        let mut state: ViewState<Vec<i64>> = ViewState::Ready(vec![1, 2]);

        let _ = state.record::<()>(Err(DashboardError::validation("Please select a sender")));
        assert_eq!(state.error(), Some("Please select a sender"));

        let _ = state.record::<()>(Err(DashboardError::TrackingNotFound));
        assert_eq!(state.error(), Some("Shipment not found"));
        assert!(state.ready().is_none());
    }

    #[test]
    fn test_success_keeps_view() {
        let mut state: ViewState<Vec<i64>> = ViewState::Ready(vec![1]);
        assert_eq!(state.record(Ok(5)).unwrap(), 5);
        assert_eq!(state.ready(), Some(&vec![1]));
        assert!(!state.is_loading());
    }

    #[test]
    fn test_replace_where() {
        let mut items = vec![(1, "a"), (2, "b")];
        assert!(replace_where(&mut items, (2, "z"), |i| i.0 == 2));
        assert_eq!(items, vec![(1, "a"), (2, "z")]);
        assert!(!replace_where(&mut items, (3, "c"), |i| i.0 == 3));
        assert_eq!(items.len(), 2);
    }
}
