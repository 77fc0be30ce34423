/// Admin endpoints
///
/// Reachable only by privileged users; the session layer answers 403 with a
/// redirect to `/user` for everyone else.

use super::{rows, ShipmentRow};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use postal_shared::{
    auth::account::normalize_email,
    dashboard::{
        admin::{AdminDashboard, AdminSettings, AdminSettingsView, AdminTab},
        filter::{DateRange, ShipmentFilter},
        form::{MethodForm, NewShipmentForm},
        stats::DashboardStats,
    },
    models::{
        shipment::ShipmentStatus,
        shipping_method::{ShippingMethod, ShippingMethodPatch},
        user::{User, UserPatch},
    },
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Filters for the shipments table; blank values are ignored
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub tab: Option<AdminTab>,
    pub status: Option<String>,
    pub search: Option<String>,

    /// `YYYY-MM-DD`, inclusive
    pub from: Option<String>,

    /// `YYYY-MM-DD`, inclusive of the whole day
    pub to: Option<String>,
}

impl DashboardQuery {
    pub fn filter(&self) -> ApiResult<ShipmentFilter> {
        let status = match non_blank(&self.status) {
            Some(raw) => Some(
                raw.parse::<ShipmentStatus>()
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?,
            ),
            None => None,
        };

        Ok(ShipmentFilter {
            status,
            search: non_blank(&self.search).map(str::to_string),
            dates: DateRange::new(parse_date(&self.from)?, parse_date(&self.to)?),
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(value: &Option<String>) -> ApiResult<Option<NaiveDate>> {
    non_blank(value)
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| ApiError::BadRequest(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))
        })
        .transpose()
}

#[derive(Debug, Serialize)]
pub struct AdminDashboardResponse {
    pub tab: AdminTab,

    /// Set when the tab is its own page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<&'static str>,

    pub stats: DashboardStats,

    /// Rows matching the filter
    pub shipments: Vec<ShipmentRow>,

    pub users: Vec<User>,
    pub methods: Vec<ShippingMethod>,
    pub notifications: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ShipmentStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    pub privileged: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CostRangeQuery {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UserUpdateRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub address: Option<String>,
    pub privileged: Option<bool>,
}

impl UserUpdateRequest {
    fn normalized(mut self) -> Self {
        self.email = self.email.map(|email| normalize_email(&email));
        self
    }
}

impl From<UserUpdateRequest> for UserPatch {
    fn from(req: UserUpdateRequest) -> Self {
        UserPatch {
            email: req.email,
            address: req.address,
            privileged: req.privileged,
        }
    }
}

/// `GET /v1/admin/dashboard?tab=&status=&search=&from=&to=`
pub async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<AdminDashboardResponse>> {
    let filter = query.filter()?;
    let tab = query.tab.unwrap_or_default();

    let mut dashboard = AdminDashboard::new(state.services.clone());
    let view = dashboard.load().await?;

    Ok(Json(AdminDashboardResponse {
        tab,
        link: tab.link(),
        stats: view.stats(),
        shipments: rows(view.filtered(&filter)),
        users: view.users.clone(),
        methods: view.methods.clone(),
        notifications: view.notifications.clone(),
    }))
}

/// `GET /v1/admin/shipments/status/:status`
pub async fn shipments_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> ApiResult<Json<Vec<ShipmentRow>>> {
    let status = status
        .parse::<ShipmentStatus>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let shipments = state.services.shipments.get_by_status(status).await?;
    Ok(Json(rows(&shipments)))
}

/// `POST /v1/admin/shipments` on behalf of any sender
pub async fn create_shipment(
    State(state): State<AppState>,
    Json(form): Json<NewShipmentForm>,
) -> ApiResult<(StatusCode, Json<ShipmentRow>)> {
    let mut dashboard = AdminDashboard::new(state.services.clone());
    let shipment = dashboard.create_shipment(&form).await?;

    Ok((StatusCode::CREATED, Json(ShipmentRow::from(shipment))))
}

/// `PUT /v1/admin/shipments/:id/status`
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Json<ShipmentRow>> {
    let mut dashboard = AdminDashboard::new(state.services.clone());
    let shipment = dashboard.update_status(id, req.status).await?;

    tracing::info!(shipment_id = id, status = %req.status, "Shipment status updated");

    Ok(Json(ShipmentRow::from(shipment)))
}

/// `GET /v1/admin/users?privileged=true`
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UsersQuery>,
) -> ApiResult<Json<Vec<User>>> {
    let users = match query.privileged {
        Some(privileged) => state.services.users.get_by_privilege(privileged).await?,
        None => state.services.users.list_all().await?,
    };

    Ok(Json(users))
}

/// `GET /v1/admin/methods/cost-range?min=&max=`; an inverted range is empty
pub async fn methods_by_cost(
    State(state): State<AppState>,
    Query(query): Query<CostRangeQuery>,
) -> ApiResult<Json<Vec<ShippingMethod>>> {
    let methods = state
        .services
        .methods
        .get_by_cost_range(query.min, query.max)
        .await?;

    Ok(Json(methods))
}

/// `PATCH /v1/admin/methods/:id`
pub async fn update_method(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<ShippingMethodPatch>,
) -> ApiResult<Json<ShippingMethod>> {
    let mut dashboard = AdminDashboard::new(state.services.clone());
    Ok(Json(dashboard.update_method(id, patch).await?))
}

/// `GET /v1/admin/settings`
pub async fn settings(State(state): State<AppState>) -> ApiResult<Json<AdminSettingsView>> {
    let mut settings = AdminSettings::new(state.services.clone());
    let view = settings.load().await?;

    Ok(Json(view.clone()))
}

/// `PATCH /v1/admin/users/:id`
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UserUpdateRequest>,
) -> ApiResult<Json<User>> {
    let req = req.normalized();
    req.validate()?;

    let mut settings = AdminSettings::new(state.services.clone());
    Ok(Json(settings.update_user(id, req.into()).await?))
}

/// `DELETE /v1/admin/users/:id`; their shipments remain with an unknown sender
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let mut settings = AdminSettings::new(state.services.clone());
    settings.delete_user(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// `POST /v1/admin/methods`
pub async fn create_method(
    State(state): State<AppState>,
    Json(form): Json<MethodForm>,
) -> ApiResult<(StatusCode, Json<ShippingMethod>)> {
    let mut settings = AdminSettings::new(state.services.clone());
    let method = settings.create_method(&form).await?;

    Ok((StatusCode::CREATED, Json(method)))
}

/// `DELETE /v1/admin/methods/:id`
pub async fn delete_method(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let mut settings = AdminSettings::new(state.services.clone());
    settings.delete_method(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
