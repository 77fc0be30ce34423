/// Admin pages
///
/// [`AdminDashboard`] shows every shipment with users, methods and the
/// overview cards. [`AdminSettings`] manages users and shipping methods.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::filter::ShipmentFilter;
use super::form::{validate_method_patch, MethodForm, NewShipmentForm};
use super::stats::DashboardStats;
use super::{replace_where, DashboardError, ViewState};
use crate::auth::account::{normalize_email, AccountService};
use crate::events::ShipmentNotification;
use crate::models::shipment::{Shipment, ShipmentStatus};
use crate::models::shipping_method::{ShippingMethod, ShippingMethodPatch};
use crate::models::user::{User, UserPatch};
use crate::services::Services;
use crate::store::{Action, StoreError};

/// Admin dashboard sections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminTab {
    #[default]
    Dashboard,
    Shipments,
    Users,
    Settings,
}

impl AdminTab {
    /// Tabs that are separate pages rather than panels
    pub fn link(&self) -> Option<&'static str> {
        match self {
            AdminTab::Settings => Some("/admin/settings"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdminView {
    pub shipments: Vec<Shipment>,
    pub users: Vec<User>,
    pub methods: Vec<ShippingMethod>,
    /// Newest first
    pub notifications: Vec<String>,
}

impl AdminView {
    pub fn stats(&self) -> DashboardStats {
        DashboardStats::compute(&self.shipments, self.users.len(), &self.methods)
    }

    pub fn filtered(&self, filter: &ShipmentFilter) -> Vec<&Shipment> {
        filter.apply(&self.shipments)
    }

    /// Merges a pushed change: note first, then the row swap
    pub fn apply_change(&mut self, notification: ShipmentNotification) {
        self.notifications.insert(0, notification.message);
        let id = notification.shipment.id;
        replace_where(&mut self.shipments, notification.shipment, |s| s.id == id);
    }
}

pub struct AdminDashboard {
    services: Services,
    state: ViewState<AdminView>,
}

impl AdminDashboard {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            state: ViewState::Loading,
        }
    }

    pub fn state(&self) -> &ViewState<AdminView> {
        &self.state
    }

    pub fn view(&self) -> Result<&AdminView, DashboardError> {
        self.state.ready().ok_or(DashboardError::NotLoaded)
    }

    /// Fetches shipments, users and methods together; the first failure wins
    pub async fn load(&mut self) -> Result<&AdminView, DashboardError> {
        self.state = ViewState::Loading;

        let fetched = tokio::try_join!(
            self.services.shipments.list_all(),
            self.services.users.list_all(),
            self.services.methods.list_all(),
        );

        match fetched {
            Ok((shipments, users, methods)) => {
                self.state = ViewState::Ready(AdminView {
                    shipments,
                    users,
                    methods,
                    notifications: Vec::new(),
                });
                self.view()
            }
            Err(e) => {
                warn!(error = %e, "Admin dashboard load failed");
                Err(self.state.fail(e.into()))
            }
        }
    }

    pub async fn reload(&mut self) -> Result<&AdminView, DashboardError> {
        self.load().await
    }

    /// Creates a shipment for any sender; the row is placed first
    pub async fn create_shipment(&mut self, form: &NewShipmentForm) -> Result<Shipment, DashboardError> {
        let result = match form.validate() {
            Ok(new) => self.services.shipments.create(new).await.map_err(Into::into),
            Err(e) => Err(e),
        };
        let shipment = self.state.record(result)?;

        info!(shipment_id = shipment.id, sender_id = ?shipment.sender_id, "Shipment created by admin");
        if let Some(view) = self.state.ready_mut() {
            view.shipments.insert(0, shipment.clone());
        }

        Ok(shipment)
    }

    /// Moves a shipment to `status`; the returned row replaces the local one
    pub async fn update_status(
        &mut self,
        id: i64,
        status: ShipmentStatus,
    ) -> Result<Shipment, DashboardError> {
        let result = self
            .services
            .shipments
            .update_status(id, status)
            .await
            .map_err(Into::into);
        let shipment = self.state.record(result)?;

        if let Some(view) = self.state.ready_mut() {
            replace_where(&mut view.shipments, shipment.clone(), |s| s.id == id);
        }

        Ok(shipment)
    }

    pub async fn update_method(
        &mut self,
        id: i64,
        patch: ShippingMethodPatch,
    ) -> Result<ShippingMethod, DashboardError> {
        let method = save_method(&self.services, &mut self.state, id, patch).await?;

        if let Some(view) = self.state.ready_mut() {
            replace_where(&mut view.methods, method.clone(), |m| m.id == id);
        }

        Ok(method)
    }

    pub fn apply_change(&mut self, notification: ShipmentNotification) {
        if let Some(view) = self.state.ready_mut() {
            view.apply_change(notification);
        }
    }
}

async fn save_method<T>(
    services: &Services,
    state: &mut ViewState<T>,
    id: i64,
    patch: ShippingMethodPatch,
) -> Result<ShippingMethod, DashboardError> {
    let result = match validate_method_patch(patch) {
        Ok(patch) => services.methods.update(id, patch).await.map_err(Into::into),
        Err(e) => Err(e),
    };
    state.record(result)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdminSettingsView {
    pub users: Vec<User>,
    pub methods: Vec<ShippingMethod>,
}

pub struct AdminSettings {
    services: Services,
    accounts: AccountService,
    state: ViewState<AdminSettingsView>,
}

impl AdminSettings {
    pub fn new(services: Services) -> Self {
        Self {
            accounts: AccountService::new(services.users.clone()),
            services,
            state: ViewState::Loading,
        }
    }

    pub fn state(&self) -> &ViewState<AdminSettingsView> {
        &self.state
    }

    pub async fn load(&mut self) -> Result<&AdminSettingsView, DashboardError> {
        self.state = ViewState::Loading;

        let fetched = tokio::try_join!(
            self.services.users.list_all(),
            self.services.methods.list_all(),
        );

        match fetched {
            Ok((users, methods)) => {
                self.state = ViewState::Ready(AdminSettingsView { users, methods });
                self.state.ready().ok_or(DashboardError::NotLoaded)
            }
            Err(e) => Err(self.state.fail(e.into())),
        }
    }

    /// Edits email, address or privilege; an email change also moves the login
    pub async fn update_user(&mut self, id: i64, patch: UserPatch) -> Result<User, DashboardError> {
        let result = self.apply_user_patch(id, patch).await;
        let user = self.state.record(result)?;

        info!(user_id = id, privileged = user.privileged, "User updated by admin");
        if let Some(view) = self.state.ready_mut() {
            replace_where(&mut view.users, user.clone(), |u| u.id == id);
        }

        Ok(user)
    }

    async fn apply_user_patch(
        &self,
        id: i64,
        mut patch: UserPatch,
    ) -> Result<User, DashboardError> {
        patch.email = patch.email.map(|email| normalize_email(&email));
        let current = self.services.users.get_by_id(id).await?.ok_or(StoreError::NotFound {
            table: "users",
            action: Action::Updating,
            id,
        })?;

        let new_email = patch
            .email
            .clone()
            .filter(|email| *email != current.email);

        let moved = match &new_email {
            Some(email) => self.accounts.move_login(&current.email, email).await?,
            None => false,
        };

        match self.services.users.update(id, patch).await {
            Ok(user) => Ok(user),
            Err(e) => {
                if let (true, Some(email)) = (moved, &new_email) {
                    if let Err(undo) = self.accounts.move_login(email, &current.email).await {
                        warn!(user_id = id, error = %undo, "Failed to restore login email");
                    }
                }
                Err(e.into())
            }
        }
    }

    /// Removes the user row and its login
    pub async fn delete_user(&mut self, id: i64) -> Result<(), DashboardError> {
        let result = self.remove_user(id).await;
        self.state.record(result)?;

        info!(user_id = id, "User deleted by admin");
        if let Some(view) = self.state.ready_mut() {
            view.users.retain(|u| u.id != id);
        }

        Ok(())
    }

    async fn remove_user(&self, id: i64) -> Result<(), DashboardError> {
        let user = self.services.users.get_by_id(id).await?;
        self.services.users.delete(id).await?;

        if let Some(user) = user {
            self.accounts.remove_login(&user.email).await?;
        }

        Ok(())
    }

    /// Adds a method at the end of the list
    pub async fn create_method(&mut self, form: &MethodForm) -> Result<ShippingMethod, DashboardError> {
        let result = match form.validate() {
            Ok(new) => self.services.methods.create(new).await.map_err(Into::into),
            Err(e) => Err(e),
        };
        let method = self.state.record(result)?;

        if let Some(view) = self.state.ready_mut() {
            view.methods.push(method.clone());
        }

        Ok(method)
    }

    pub async fn update_method(
        &mut self,
        id: i64,
        patch: ShippingMethodPatch,
    ) -> Result<ShippingMethod, DashboardError> {
        let method = save_method(&self.services, &mut self.state, id, patch).await?;

        if let Some(view) = self.state.ready_mut() {
            replace_where(&mut view.methods, method.clone(), |m| m.id == id);
        }

        Ok(method)
    }

    /// Shipments that used the method keep their rows and show "Unknown"
    pub async fn delete_method(&mut self, id: i64) -> Result<(), DashboardError> {
        let result = self.services.methods.delete(id).await.map_err(Into::into);
        self.state.record(result)?;

        if let Some(view) = self.state.ready_mut() {
            view.methods.retain(|m| m.id != id);
        }

        Ok(())
    }
}
