/// Database models
///
/// - `user`: domain user records (address, privilege flag)
/// - `credential`: login credentials keyed by email
/// - `shipping_method`: shipping methods and their cost
/// - `shipment`: shipments, their status vocabulary and joined summaries

pub mod credential;
pub mod shipment;
pub mod shipping_method;
pub mod user;
