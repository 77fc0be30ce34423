/// Signed-in user endpoints
///
/// Every handler runs after the session layer, so the caller's
/// [`Identity`] is in the request extensions.

use super::{rows, ShipmentRow};
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use postal_shared::{
    auth::{
        account::{normalize_email, PasswordChange},
        jwt::TokenPair,
        Identity,
    },
    dashboard::{
        filter::LifecycleBucket,
        form::NewShipmentForm,
        stats::UserStats,
        user::{ProfileUpdate, UserDashboard, UserSettings},
        PASSWORD_UPDATED, PROFILE_UPDATED,
    },
    models::{shipping_method::ShippingMethod, user::User},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// `active`, `history` or `canceled`; all shipments when absent
    pub bucket: Option<LifecycleBucket>,
}

#[derive(Debug, Serialize)]
pub struct UserDashboardResponse {
    pub user: User,
    pub stats: UserStats,
    pub shipments: Vec<ShipmentRow>,
    pub methods: Vec<ShippingMethod>,
    pub notifications: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    /// `false` backs out without touching the shipment
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipment: Option<ShipmentRow>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub user: User,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub address: Option<String>,
}

impl ProfileRequest {
    fn normalized(mut self) -> Self {
        self.email = self.email.map(|email| normalize_email(&email));
        self
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub message: String,
    pub user: User,

    /// Fresh tokens when the email, and so the token subject, changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenPair>,
}

#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `GET /v1/user/dashboard?bucket=active`
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<UserDashboardResponse>> {
    let mut dashboard = UserDashboard::new(state.services.clone(), identity);
    let view = dashboard.load().await?;

    Ok(Json(UserDashboardResponse {
        user: view.user.clone(),
        stats: view.stats(),
        shipments: rows(view.bucket(query.bucket)),
        methods: view.methods.clone(),
        notifications: view.notifications.clone(),
    }))
}

/// `POST /v1/user/shipments`; the sender is always the caller
pub async fn create_shipment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(form): Json<NewShipmentForm>,
) -> ApiResult<(StatusCode, Json<ShipmentRow>)> {
    let mut dashboard = UserDashboard::new(state.services.clone(), identity);
    let shipment = dashboard.create_shipment(&form).await?;

    Ok((StatusCode::CREATED, Json(ShipmentRow::from(shipment))))
}

/// `POST /v1/user/shipments/:id/cancel` with `{"confirm": true}`
///
/// Only the caller's own shipments can be cancelled.
pub async fn cancel_shipment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Json(req): Json<CancelRequest>,
) -> ApiResult<Json<CancelResponse>> {
    let mut dashboard = UserDashboard::new(state.services.clone(), identity);
    dashboard.load().await?;
    dashboard.request_cancel(id)?;

    if !req.confirm {
        dashboard.dismiss_cancel();
        return Ok(Json(CancelResponse {
            cancelled: false,
            shipment: None,
            notification: None,
        }));
    }

    let shipment = dashboard.confirm_cancel().await?;
    let notification = dashboard
        .view()
        .ok()
        .and_then(|view| view.notifications.first().cloned());

    Ok(Json(CancelResponse {
        cancelled: true,
        shipment: Some(ShipmentRow::from(shipment)),
        notification,
    }))
}

/// `GET /v1/user/track/:id`; any shipment, whoever sent it
pub async fn track_shipment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ShipmentRow>> {
    let mut dashboard = UserDashboard::new(state.services.clone(), identity);
    let shipment = dashboard.track(id).await?;

    Ok(Json(ShipmentRow::from(shipment)))
}

pub async fn list_methods(State(state): State<AppState>) -> ApiResult<Json<Vec<ShippingMethod>>> {
    Ok(Json(state.services.methods.list_all().await?))
}

pub async fn settings(Extension(identity): Extension<Identity>) -> Json<SettingsResponse> {
    Json(SettingsResponse {
        user: identity.user,
    })
}

/// `PATCH /v1/user/settings`
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<ProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    let req = req.normalized();
    req.validate()?;

    let previous_email = identity.user.email.clone();
    let mut settings = UserSettings::new(state.services.clone(), identity);
    let user = settings
        .update_profile(ProfileUpdate {
            email: req.email,
            address: req.address,
        })
        .await?
        .clone();

    let tokens = if user.email != previous_email {
        Some(TokenPair::issue(&user.email, state.jwt_secret())?)
    } else {
        None
    };

    Ok(Json(ProfileResponse {
        message: PROFILE_UPDATED.to_string(),
        user,
        tokens,
    }))
}

/// `POST /v1/user/settings/password`
pub async fn change_password(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<PasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let settings = UserSettings::new(state.services.clone(), identity);
    settings
        .change_password(&PasswordChange {
            current_password: req.current_password,
            new_password: req.new_password,
            confirm_password: req.confirm_password,
        })
        .await?;

    Ok(Json(MessageResponse {
        message: PASSWORD_UPDATED.to_string(),
    }))
}
