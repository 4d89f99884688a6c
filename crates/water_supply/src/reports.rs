//! Aggregates for the reports page.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use itertools::Itertools;
use model::{
    location::{Location, ServiceTier},
    view::{LocationPerformance, ReportSummary},
};

use crate::joins::Index;

pub const DEFAULT_REPORT_DAYS: i64 = 7;

impl<'a> Index<'a> {
    /// Figures over the current snapshot. `today` and `days` bound the window
    /// refill rates are measured over; `tier` narrows the per-location rows.
    pub fn report(
        &self,
        today: NaiveDate,
        days: i64,
        tier: Option<ServiceTier>,
    ) -> ReportSummary {
        let collections = self.collections();
        let days = days.max(1);
        let active = collections.active_deployments().collect_vec();

        let maintenance = &collections.maintenance;
        let completed = maintenance.iter().filter(|record| !record.is_due()).count();
        let maintenance_completion_percent = if maintenance.is_empty() {
            0
        } else {
            (completed as f64 / maintenance.len() as f64 * 100.0).round() as u8
        };

        let water_supplied_litres = active
            .iter()
            .filter_map(|deployment| {
                let bowser = self.bowser(&deployment.bowser_id)?;
                let supply = deployment.supply_percent(Some(bowser)).unwrap_or(0.0);
                Some(bowser.capacity * (100.0 - supply) / 100.0)
            })
            .fold(0.0, |sum, litres| sum + litres)
            .round();

        let utilization = collections
            .bowsers
            .iter()
            .map(|bowser| {
                bowser
                    .status
                    .as_ref()
                    .map_or("unknown", |status| status.as_str())
                    .to_owned()
            })
            .counts()
            .into_iter()
            .collect();

        let mut distribution: BTreeMap<ServiceTier, usize> =
            ServiceTier::ALL.iter().map(|tier| (*tier, 0)).collect();
        for location in collections
            .deployments
            .iter()
            .filter_map(|deployment| self.location(&deployment.location_id))
        {
            *distribution.entry(location.tier()).or_default() += 1;
        }

        let maintenance_by_type = maintenance
            .iter()
            .filter(|record| record.is_due())
            .map(|record| record.kind.clone().unwrap_or_else(|| "unknown".to_owned()))
            .counts()
            .into_iter()
            .collect();

        let locations = collections
            .locations
            .iter()
            .filter(|location| tier.map_or(true, |tier| location.tier() == tier))
            .map(|location| self.location_performance(location, today, days))
            .collect();

        ReportSummary {
            days,
            bowsers_in_service: active.iter().map(|d| d.bowser_id.as_str()).unique().count(),
            locations_served: active.iter().map(|d| d.location_id.as_str()).unique().count(),
            maintenance_completion_percent,
            water_supplied_litres,
            utilization,
            distribution,
            maintenance_by_type,
            locations,
        }
    }

    fn location_performance(
        &self,
        location: &Location,
        today: NaiveDate,
        days: i64,
    ) -> LocationPerformance {
        let collections = self.collections();
        let here = collections
            .deployments
            .iter()
            .filter(|deployment| deployment.location_id == location.id)
            .collect_vec();

        let active = here.iter().filter(|deployment| deployment.is_active()).collect_vec();
        let supply_percent = if active.is_empty() {
            0
        } else {
            let total = active
                .iter()
                .map(|deployment| {
                    deployment
                        .supply_percent(self.bowser(&deployment.bowser_id))
                        .unwrap_or(0.0)
                })
                .fold(0.0, |sum, supply| sum + supply);
            (total / active.len() as f64).round() as u8
        };

        // every deployment started in the window is one delivery of water
        let since = today - Duration::days(days);
        let started = here
            .iter()
            .filter_map(|deployment| deployment.start_date)
            .filter(|start| start.date() > since && start.date() <= today)
            .count();
        let refills_per_day = (started as f64 / days as f64 * 10.0).round() / 10.0;

        let open_alerts = collections
            .alerts
            .iter()
            .filter(|alert| alert.location_id.as_ref() == Some(&location.id))
            .filter(|alert| !alert.is_resolved())
            .count();

        LocationPerformance {
            location_id: location.id.clone(),
            name: location.name.clone(),
            kind: location.kind.clone(),
            tier: location.tier(),
            active_deployments: active.len(),
            supply_percent,
            refills_per_day,
            open_alerts,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::collections::Collections;

    fn collections() -> Collections {
        Collections {
            locations: serde_json::from_value(json!([
                {"id": "LOC001", "name": "Clinic", "type": "clinic", "status": "active"},
                {"id": "LOC002", "name": "Flats", "type": "apartment", "status": "active"},
                {"id": "LOC003", "name": "Shop", "type": "retail", "status": "active"}
            ]))
            .unwrap(),
            bowsers: serde_json::from_value(json!([
                {"id": "BWR001", "capacity": 6000, "current_level": 1500, "status": "deployed"},
                {"id": "BWR002", "capacity": 4000, "current_level": 4000, "status": "deployed"},
                {"id": "BWR003", "capacity": 5000, "current_level": 5000, "status": "standby"}
            ]))
            .unwrap(),
            deployments: serde_json::from_value(json!([
                {"id": "D1", "bowser_id": "BWR001", "location_id": "LOC001", "status": "active",
                 "start_date": "2025-04-10T08:00:00"},
                {"id": "D2", "bowser_id": "BWR002", "location_id": "LOC001", "status": "active",
                 "start_date": "2025-04-01T08:00:00", "supply_level": 50},
                {"id": "D3", "bowser_id": "BWR003", "location_id": "LOC003", "status": "completed",
                 "start_date": "2025-04-08T08:00:00"},
                {"id": "D4", "bowser_id": "BWR003", "location_id": "LOC404", "status": "scheduled"}
            ]))
            .unwrap(),
            maintenance: serde_json::from_value(json!([
                {"id": "M1", "bowser_id": "BWR001", "maintenance_type": "repair", "status": "in_progress"},
                {"id": "M2", "bowser_id": "BWR002", "maintenance_type": "inspection", "status": "completed"},
                {"id": "M3", "bowser_id": "BWR003", "maintenance_type": "repair", "status": "scheduled"}
            ]))
            .unwrap(),
            alerts: serde_json::from_value(json!([
                {"id": "A1", "location_id": "LOC001", "message": "Low supply"},
                {"id": "A2", "location_id": "LOC001", "message": "Sorted", "status": "resolved"}
            ]))
            .unwrap(),
            ..Default::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 12).unwrap()
    }

    #[test]
    fn summary_figures() {
        let collections = collections();
        let report = Index::new(&collections).report(today(), 7, None);

        assert_eq!(report.bowsers_in_service, 2);
        assert_eq!(report.locations_served, 1);
        assert_eq!(report.maintenance_completion_percent, 33);
        // 6000 * 75% + 4000 * 50%
        assert_eq!(report.water_supplied_litres, 6500.0);
        assert_eq!(
            report.utilization,
            BTreeMap::from([("deployed".to_owned(), 2), ("standby".to_owned(), 1)])
        );
        assert_eq!(report.distribution[&ServiceTier::Healthcare], 2);
        assert_eq!(report.distribution[&ServiceTier::Commercial], 1);
        assert_eq!(report.distribution[&ServiceTier::Residential], 0);
        assert_eq!(report.distribution.len(), 5);
        assert_eq!(
            report.maintenance_by_type,
            BTreeMap::from([("repair".to_owned(), 2)])
        );
    }

    #[test]
    fn per_location_rows() {
        let collections = collections();
        let report = Index::new(&collections).report(today(), 7, None);
        let clinic = &report.locations[0];
        assert_eq!(clinic.active_deployments, 2);
        // (25 + 50) / 2
        assert_eq!(clinic.supply_percent, 38);
        // only D1 started within the last week
        assert_eq!(clinic.refills_per_day, 0.1);
        assert_eq!(clinic.open_alerts, 1);

        let flats = &report.locations[1];
        assert_eq!(flats.active_deployments, 0);
        assert_eq!(flats.supply_percent, 0);
        assert_eq!(flats.refills_per_day, 0.0);

        let healthcare = Index::new(&collections).report(today(), 7, Some(ServiceTier::Healthcare));
        assert_eq!(healthcare.locations.len(), 1);
        assert_eq!(healthcare.locations[0].location_id.as_str(), "LOC001");
    }

    #[test]
    fn empty_snapshot() {
        let collections = Collections::default();
        let report = Index::new(&collections).report(today(), 0, None);
        assert_eq!(report.days, 1);
        assert_eq!(report.maintenance_completion_percent, 0);
        assert_eq!(report.water_supplied_litres, 0.0);
        assert!(report.locations.is_empty());
        assert!(report.utilization.is_empty());
    }
}
