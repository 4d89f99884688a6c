use chrono::NaiveDateTime;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::{id::Id, serde::date_time};

use crate::{location::Location, resource, Priority};

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Alert {
    #[serde(default, skip_serializing_if = "Id::is_blank")]
    pub id: Id<Alert>,
    #[serde(default, alias = "locationId")]
    pub location_id: Option<Id<Location>>,
    pub title: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "alert_type", alias = "type", alias = "alertType")]
    pub kind: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<String>,
    #[serde(
        default,
        alias = "createdAt",
        alias = "timestamp",
        deserialize_with = "date_time::deserialize_option",
        serialize_with = "date_time::serialize_option"
    )]
    pub created_at: Option<NaiveDateTime>,
    #[serde(
        default,
        alias = "resolvedAt",
        deserialize_with = "date_time::deserialize_option",
        serialize_with = "date_time::serialize_option"
    )]
    pub resolved_at: Option<NaiveDateTime>,
}

resource!(Alert, "/alerts", "alerts");

impl Alert {
    pub fn is_high_priority(&self) -> bool {
        matches!(self.priority, Some(Priority::High))
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
            || matches!(self.status.as_deref(), Some("resolved") | Some("closed"))
    }
}
