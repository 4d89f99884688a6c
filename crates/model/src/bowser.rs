use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::{id::Id, serde::date};

use crate::{resource, string_enum};

string_enum! {
    pub enum BowserStatus {
        Active => "active",
        Deployed => "deployed",
        Maintenance => "maintenance",
        Standby => "standby",
        OutOfService => "outOfService" | "out_of_service" | "out-of-service",
    }
}

/// A mobile water tank. Levels and capacity are in liters.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Bowser {
    #[serde(default, skip_serializing_if = "Id::is_blank")]
    pub id: Id<Bowser>,
    #[serde(default, alias = "bowser_number", alias = "bowserNumber")]
    pub number: String,
    #[serde(default)]
    pub capacity: f64,
    #[serde(default, alias = "currentLevel")]
    pub current_level: f64,
    pub status: Option<BowserStatus>,
    pub owner: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    #[serde(
        default,
        alias = "lastMaintenance",
        deserialize_with = "date::deserialize_option",
        serialize_with = "date::serialize_option"
    )]
    pub last_maintenance: Option<NaiveDate>,
    #[serde(
        default,
        alias = "nextMaintenance",
        deserialize_with = "date::deserialize_option",
        serialize_with = "date::serialize_option"
    )]
    pub next_maintenance: Option<NaiveDate>,
    pub notes: Option<String>,
}

resource!(Bowser, "/bowsers", "bowsers");

impl Bowser {
    /// `current_level / capacity`, clamped to `[0, 1]`. `None` for a bowser
    /// without a usable capacity.
    pub fn fill_ratio(&self) -> Option<f64> {
        fill_ratio(self.current_level, self.capacity)
    }

    /// The fill level as displayed: a whole percentage in `[0, 100]`.
    pub fn fill_percent(&self) -> u8 {
        fill_percent(self.current_level, self.capacity)
    }

    /// Whether the stored numbers satisfy `0 <= current_level <= capacity`.
    pub fn level_is_consistent(&self) -> bool {
        self.capacity > 0.0 && (0.0..=self.capacity).contains(&self.current_level)
    }

    pub fn is_available(&self) -> bool {
        matches!(
            self.status,
            Some(BowserStatus::Active) | Some(BowserStatus::Standby)
        )
    }
}

pub fn fill_ratio(level: f64, capacity: f64) -> Option<f64> {
    if !(capacity.is_finite() && capacity > 0.0) || !level.is_finite() {
        return None;
    }
    Some((level / capacity).clamp(0.0, 1.0))
}

pub fn fill_percent(level: f64, capacity: f64) -> u8 {
    fill_ratio(level, capacity)
        .map(|ratio| (ratio * 100.0).round() as u8)
        .unwrap_or(0)
}
