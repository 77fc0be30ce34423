use serde::Serialize;

use crate::models::shipment::{Shipment, ShipmentStatus};
use crate::models::shipping_method::ShippingMethod;

/// Cost of the method a shipment uses, looked up in the loaded method list
///
/// Shipments without a resolvable method count as 0.
pub fn method_cost(methods: &[ShippingMethod], method_id: Option<i64>) -> f64 {
    method_id
        .and_then(|id| methods.iter().find(|m| m.id == id))
        .map_or(0.0, |m| m.cost)
}

fn revenue(shipments: &[Shipment], methods: &[ShippingMethod]) -> f64 {
    shipments
        .iter()
        .map(|s| method_cost(methods, s.method_id))
        .sum()
}

fn count(shipments: &[Shipment], status: ShipmentStatus) -> usize {
    shipments
        .iter()
        .filter(|s| s.status == status.as_str())
        .count()
}

/// Admin overview cards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_shipments: usize,
    pub pending_shipments: usize,
    pub delivered_shipments: usize,
    pub total_users: usize,
    pub total_revenue: f64,
}

impl DashboardStats {
    pub fn compute(shipments: &[Shipment], total_users: usize, methods: &[ShippingMethod]) -> Self {
        Self {
            total_shipments: shipments.len(),
            pending_shipments: count(shipments, ShipmentStatus::Pending),
            delivered_shipments: count(shipments, ShipmentStatus::Delivered),
            total_users,
            total_revenue: revenue(shipments, methods),
        }
    }
}

/// User overview cards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub total_shipments: usize,
    pub pending_shipments: usize,
    pub total_spent: f64,
}

impl UserStats {
    pub fn compute(shipments: &[Shipment], methods: &[ShippingMethod]) -> Self {
        Self {
            total_shipments: shipments.len(),
            pending_shipments: count(shipments, ShipmentStatus::Pending),
            total_spent: revenue(shipments, methods),
        }
    }
}
