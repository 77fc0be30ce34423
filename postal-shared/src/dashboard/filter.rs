/// Client-side views over loaded shipments
///
/// The admin table narrows rows with a [`ShipmentFilter`]; the user
/// dashboard splits them into [`LifecycleBucket`] tabs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::shipment::{Shipment, ShipmentStatus};

/// Creation-date window, inclusive at both ends
///
/// Only applied when both ends are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => {
                let day = at.date_naive();
                day >= start && day <= end
            }
            _ => true,
        }
    }
}

/// Admin table filter; all set criteria must hold
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipmentFilter {
    pub status: Option<ShipmentStatus>,
    pub search: Option<String>,
    pub dates: DateRange,
}

impl ShipmentFilter {
    pub fn matches(&self, shipment: &Shipment) -> bool {
        if let Some(status) = self.status {
            if shipment.status != status.as_str() {
                return false;
            }
        }

        if let Some(term) = self.search.as_deref().filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            let sender = shipment
                .sender
                .as_ref()
                .map(|s| s.email.to_lowercase())
                .unwrap_or_default();

            let hit = shipment.id.to_string().contains(&term)
                || sender.contains(&term)
                || shipment.to_address.to_lowercase().contains(&term)
                || shipment.status.to_lowercase().contains(&term);
            if !hit {
                return false;
            }
        }

        self.dates.contains(shipment.created_at)
    }

    pub fn apply<'a>(&self, shipments: &'a [Shipment]) -> Vec<&'a Shipment> {
        shipments.iter().filter(|s| self.matches(s)).collect()
    }
}

/// User dashboard tabs
///
/// `out_for_delivery` and `failed_delivery` belong to no tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleBucket {
    Active,
    History,
    Canceled,
}

impl LifecycleBucket {
    pub fn statuses(&self) -> &'static [ShipmentStatus] {
        match self {
            LifecycleBucket::Active => &[
                ShipmentStatus::Pending,
                ShipmentStatus::PickedUp,
                ShipmentStatus::InTransit,
            ],
            LifecycleBucket::History => &[ShipmentStatus::Delivered, ShipmentStatus::Returned],
            LifecycleBucket::Canceled => &[ShipmentStatus::Cancelled],
        }
    }

    pub fn contains(&self, status: &str) -> bool {
        self.statuses().iter().any(|s| s.as_str() == status)
    }
}

/// Rows in `bucket`, or every row when no bucket is chosen
pub fn in_bucket(shipments: &[Shipment], bucket: Option<LifecycleBucket>) -> Vec<&Shipment> {
    shipments
        .iter()
        .filter(|s| bucket.map_or(true, |b| b.contains(&s.status)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::shipment::tests::sample;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_status_is_exact_match() {
        let rows = vec![sample(1, "delivered"), sample(2, "failed_delivery")];
        let filter = ShipmentFilter {
            status: Some(ShipmentStatus::Delivered),
            ..Default::default()
        };

        let ids: Vec<i64> = filter.apply(&rows).iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_search_is_case_insensitive_over_fields() {
        let mut other = sample(42, "in_transit");
        other.to_address = "9 Mill Lane".to_string();
        other.sender = None;
        let rows = vec![sample(7, "pending"), other];

        let search = |term: &str| -> Vec<i64> {
            let filter = ShipmentFilter {
                search: Some(term.to_string()),
                ..Default::default()
            };
            filter.apply(&rows).iter().map(|s| s.id).collect()
        };

        assert_eq!(search("SENDER@"), vec![7]);
        assert_eq!(search("mill"), vec![42]);
        assert_eq!(search("42"), vec![42]);
        assert_eq!(search("TRANSIT"), vec![42]);
        assert_eq!(search(""), vec![7, 42]);
        assert!(search("nowhere").is_empty());
    }

    #[test]
    fn test_date_range_needs_both_ends() {
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();

        assert!(DateRange::new(day(2024, 4, 1), None).contains(at));
        assert!(DateRange::new(None, day(2024, 1, 1)).contains(at));
        assert!(!DateRange::new(day(2024, 4, 1), day(2024, 4, 30)).contains(at));
    }

    #[test]
    fn test_date_range_end_covers_whole_day() {
        let late = Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59).unwrap();
        let range = DateRange::new(day(2024, 3, 1), day(2024, 3, 10));

        assert!(range.contains(late));
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_criteria_are_anded() {
        let rows = vec![sample(1, "pending"), sample(2, "delivered")];
        let filter = |status, term: &str| ShipmentFilter {
            status: Some(status),
            search: Some(term.to_string()),
            dates: DateRange::new(day(2024, 3, 1), day(2024, 3, 31)),
        };

        let ids = |f: ShipmentFilter| -> Vec<i64> { f.apply(&rows).iter().map(|s| s.id).collect() };
        assert_eq!(ids(filter(ShipmentStatus::Pending, "harbour")), vec![1]);
        assert!(ids(filter(ShipmentStatus::Delivered, "mill")).is_empty());
    }

    #[test]
    fn test_buckets() {
        let rows: Vec<Shipment> = ShipmentStatus::ALL
            .iter()
            .enumerate()
            .map(|(i, s)| sample(i as i64 + 1, s.as_str()))
            .collect();

        let statuses = |bucket| -> Vec<String> {
            in_bucket(&rows, bucket)
                .iter()
                .map(|s| s.status.clone())
                .collect()
        };

        assert_eq!(
            statuses(Some(LifecycleBucket::Active)),
            vec!["pending", "picked_up", "in_transit"]
        );
        assert_eq!(
            statuses(Some(LifecycleBucket::History)),
            vec!["delivered", "returned"]
        );
        assert_eq!(statuses(Some(LifecycleBucket::Canceled)), vec!["cancelled"]);
        assert_eq!(statuses(None).len(), 8);
    }

    #[test]
    fn test_unbucketed_statuses() {
        for bucket in [
            LifecycleBucket::Active,
            LifecycleBucket::History,
            LifecycleBucket::Canceled,
        ] {
            assert!(!bucket.contains("out_for_delivery"));
            assert!(!bucket.contains("failed_delivery"));
        }
    }
}
