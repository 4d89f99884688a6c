use chrono::NaiveDateTime;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::{id::Id, serde::date_time};

use crate::{bowser::Bowser, location::Location, resource, string_enum, Priority};

string_enum! {
    pub enum DeploymentStatus {
        Scheduled => "scheduled" | "planned",
        Active => "active",
        Completed => "completed" | "ended",
    }
}

/// A bowser assigned to a location for a period of time.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Deployment {
    #[serde(default, skip_serializing_if = "Id::is_blank")]
    pub id: Id<Deployment>,
    #[serde(alias = "bowserId")]
    pub bowser_id: Id<Bowser>,
    #[serde(alias = "locationId")]
    pub location_id: Id<Location>,
    pub status: DeploymentStatus,
    #[serde(
        default,
        alias = "startDate",
        deserialize_with = "date_time::deserialize_option",
        serialize_with = "date_time::serialize_option"
    )]
    pub start_date: Option<NaiveDateTime>,
    #[serde(
        default,
        alias = "endDate",
        deserialize_with = "date_time::deserialize_option",
        serialize_with = "date_time::serialize_option"
    )]
    pub end_date: Option<NaiveDateTime>,
    /// Percentage snapshot reported with the deployment. Takes precedence
    /// over the bowser's live level when present.
    #[serde(default, alias = "supplyLevel")]
    pub supply_level: Option<f64>,
    pub priority: Option<Priority>,
    pub notes: Option<String>,
}

resource!(Deployment, "/deployments", "deployments");

impl Deployment {
    pub fn is_active(&self) -> bool {
        self.status == DeploymentStatus::Active
    }

    pub fn is_active_or_scheduled(&self) -> bool {
        matches!(
            self.status,
            DeploymentStatus::Active | DeploymentStatus::Scheduled
        )
    }

    /// Unrounded supply percentage: the snapshot if reported, otherwise the
    /// fill ratio of the given bowser.
    pub fn supply_percent(&self, bowser: Option<&Bowser>) -> Option<f64> {
        self.supply_level
            .filter(|level| level.is_finite())
            .map(|level| level.clamp(0.0, 100.0))
            .or_else(|| bowser?.fill_ratio().map(|ratio| ratio * 100.0))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn bowser(level: f64, capacity: f64) -> Bowser {
        serde_json::from_value(json!({
            "id": "BWR002", "capacity": capacity, "current_level": level
        }))
        .unwrap()
    }

    #[test]
    fn accepts_both_key_styles() {
        let snake: Deployment = serde_json::from_value(json!({
            "id": "D1", "bowser_id": "BWR002", "location_id": "LOC001",
            "status": "active", "start_date": "2025-04-01T08:00:00", "end_date": null
        }))
        .unwrap();
        let camel: Deployment = serde_json::from_value(json!({
            "id": "D1", "bowserId": "BWR002", "locationId": "LOC001",
            "status": "active", "startDate": "2025-04-01"
        }))
        .unwrap();
        assert_eq!(snake.bowser_id, camel.bowser_id);
        assert_eq!(snake.location_id, camel.location_id);
        assert!(snake.is_active() && camel.is_active());
        assert!(snake.end_date.is_none());
    }

    #[test]
    fn snapshot_wins_over_live_level() {
        let deployment: Deployment = serde_json::from_value(json!({
            "id": "D1", "bowser_id": "BWR002", "location_id": "LOC001",
            "status": "active", "supplyLevel": 40
        }))
        .unwrap();
        let low = bowser(1000.0, 7500.0);
        assert_eq!(deployment.supply_percent(Some(&low)), Some(40.0));

        let without_snapshot = Deployment {
            supply_level: None,
            ..deployment
        };
        let percent = without_snapshot.supply_percent(Some(&low)).unwrap();
        assert!((percent - 13.333).abs() < 0.01);
        assert_eq!(without_snapshot.supply_percent(None), None);
    }
}
