use chrono::{NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::{id::Id, serde::date_time};

use crate::{bowser::Bowser, resource, string_enum, Priority};

string_enum! {
    pub enum MaintenanceStatus {
        Scheduled => "scheduled" | "pending",
        InProgress => "in_progress" | "in-progress" | "inprogress",
        Completed => "completed" | "done",
        Overdue => "overdue",
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MaintenanceRecord {
    #[serde(default, skip_serializing_if = "Id::is_blank")]
    pub id: Id<MaintenanceRecord>,
    #[serde(alias = "bowserId")]
    pub bowser_id: Id<Bowser>,
    #[serde(rename = "maintenance_type", alias = "type", alias = "maintenanceType")]
    pub kind: Option<String>,
    pub description: Option<String>,
    #[serde(
        default,
        alias = "scheduled_date",
        alias = "scheduledDate",
        deserialize_with = "date_time::deserialize_option",
        serialize_with = "date_time::serialize_option"
    )]
    pub date: Option<NaiveDateTime>,
    pub priority: Option<Priority>,
    #[serde(alias = "assignedTo")]
    pub assigned_to: Option<String>,
    pub status: Option<MaintenanceStatus>,
}

resource!(MaintenanceRecord, "/maintenance", "maintenance");

impl MaintenanceRecord {
    /// The stored status, except that a scheduled job whose date has passed
    /// counts as overdue.
    pub fn effective_status(&self, today: NaiveDate) -> MaintenanceStatus {
        let status = self
            .status
            .clone()
            .unwrap_or(MaintenanceStatus::Scheduled);
        match (&status, self.date) {
            (MaintenanceStatus::Scheduled, Some(date)) if date.date() < today => {
                MaintenanceStatus::Overdue
            }
            _ => status,
        }
    }

    /// Anything not completed still needs doing.
    pub fn is_due(&self) -> bool {
        !matches!(self.status, Some(MaintenanceStatus::Completed))
    }
}
