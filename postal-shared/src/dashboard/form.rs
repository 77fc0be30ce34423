/// Form checks that run before anything is sent to the database
///
/// Rules are checked in order and the first failure is the one reported.

use serde::Deserialize;

use super::DashboardError;
use crate::models::shipment::NewShipment;
use crate::models::shipping_method::{NewShippingMethod, ShippingMethodPatch};

pub const SELECT_SENDER: &str = "Please select a sender";
pub const ENTER_ADDRESS: &str = "Please enter a delivery address";
pub const ENTER_WEIGHT: &str = "Please enter a valid weight";
pub const SELECT_METHOD: &str = "Please select a shipping method";
pub const METHOD_FIELDS_REQUIRED: &str =
    "Please fill in all required fields for the new shipping method.";
pub const METHOD_COST_NEGATIVE: &str = "Shipping method cost cannot be negative";
pub const METHOD_NAME_BLANK: &str = "Shipping method name cannot be blank";

/// Create-shipment form as submitted
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewShipmentForm {
    pub sender_id: Option<i64>,
    #[serde(default)]
    pub to_address: String,
    pub weight: Option<f64>,
    pub method_id: Option<i64>,
}

impl NewShipmentForm {
    pub fn validate(&self) -> Result<NewShipment, DashboardError> {
        let sender_id = self
            .sender_id
            .filter(|id| *id > 0)
            .ok_or_else(|| DashboardError::validation(SELECT_SENDER))?;

        let to_address = self.to_address.trim();
        if to_address.is_empty() {
            return Err(DashboardError::validation(ENTER_ADDRESS));
        }

        let weight = self
            .weight
            .filter(|w| w.is_finite() && *w > 0.0)
            .ok_or_else(|| DashboardError::validation(ENTER_WEIGHT))?;

        let method_id = self
            .method_id
            .filter(|id| *id > 0)
            .ok_or_else(|| DashboardError::validation(SELECT_METHOD))?;

        Ok(NewShipment {
            sender_id,
            to_address: to_address.to_string(),
            weight,
            method_id,
        })
    }
}

/// New shipping method form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MethodForm {
    #[serde(default)]
    pub name: String,
    pub cost: Option<f64>,
}

impl MethodForm {
    pub fn validate(&self) -> Result<NewShippingMethod, DashboardError> {
        let name = self.name.trim();
        let cost = match self.cost {
            Some(cost) if !name.is_empty() && cost.is_finite() => cost,
            _ => return Err(DashboardError::validation(METHOD_FIELDS_REQUIRED)),
        };
        if cost < 0.0 {
            return Err(DashboardError::validation(METHOD_COST_NEGATIVE));
        }

        Ok(NewShippingMethod {
            name: name.to_string(),
            cost,
        })
    }
}

/// Checks an edit to an existing method
pub fn validate_method_patch(patch: ShippingMethodPatch) -> Result<ShippingMethodPatch, DashboardError> {
    let name = match patch.name {
        Some(name) if name.trim().is_empty() => {
            return Err(DashboardError::validation(METHOD_NAME_BLANK))
        }
        Some(name) => Some(name.trim().to_string()),
        None => None,
    };

    if let Some(cost) = patch.cost {
        if !cost.is_finite() || cost < 0.0 {
            return Err(DashboardError::validation(METHOD_COST_NEGATIVE));
        }
    }

    Ok(ShippingMethodPatch {
        name,
        cost: patch.cost,
    })
}
