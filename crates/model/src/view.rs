//! Joined, derived records as handed to renderers. Nothing in here is sent
//! back to the backend.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use schemars::JsonSchema;
use serde::Serialize;
use utility::{geo::Coordinates, id::Id};

use crate::{
    alert::Alert,
    bowser::Bowser,
    deployment::{Deployment, DeploymentStatus},
    finance::Month,
    location::{Location, LocationType, ServiceTier},
    maintenance::{MaintenanceRecord, MaintenanceStatus},
    status::SiteStatus,
    Priority,
};

/// A location with the deployment currently serving it, if any.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SiteView {
    pub id: Id<Location>,
    pub name: String,
    pub address: String,
    pub postcode: Option<String>,
    pub area: Option<String>,
    pub coordinates: Option<Coordinates>,
    #[serde(rename = "type")]
    pub kind: Option<LocationType>,
    pub status: SiteStatus,
    pub deployment_id: Option<Id<Deployment>>,
    pub bowser_id: Option<Id<Bowser>>,
    pub bowser_number: Option<String>,
    pub supply_percent: Option<u8>,
}

/// A deployment with both foreign keys resolved.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentView {
    pub id: Id<Deployment>,
    pub status: DeploymentStatus,
    pub site_status: SiteStatus,
    pub location_id: Id<Location>,
    pub location_name: String,
    pub address: String,
    pub postcode: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub bowser_id: Id<Bowser>,
    pub bowser_number: String,
    pub capacity: f64,
    pub current_level: f64,
    pub supply_percent: u8,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub active_deployments: usize,
    pub maintenance_due: usize,
    pub active_locations: usize,
    pub high_priority_alerts: usize,
    pub total_bowsers: usize,
    pub bowsers_by_status: BTreeMap<String, usize>,
    pub sites_by_status: BTreeMap<String, usize>,
    /// Mean fill percentage over bowsers with a usable capacity.
    pub average_fill_percent: Option<u8>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceView {
    pub id: Id<MaintenanceRecord>,
    pub bowser_id: Id<Bowser>,
    pub bowser_number: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<String>,
    pub status: MaintenanceStatus,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlertView {
    pub id: Id<Alert>,
    pub title: Option<String>,
    pub message: String,
    pub priority: Option<Priority>,
    pub created_at: Option<NaiveDateTime>,
    pub location_id: Option<Id<Location>>,
    pub location_name: Option<String>,
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinanceOverview {
    pub month: Month,
    pub revenue: f64,
    pub outstanding: f64,
    pub partner_balance: f64,
    pub invoice_counts: BTreeMap<String, usize>,
    pub transaction_count: usize,
}

/// A location's place in the service queue. Lower scores are served first.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriorityView {
    pub location_id: Id<Location>,
    pub location_name: String,
    pub tier: ServiceTier,
    pub level: u8,
    pub score: f64,
    pub site_status: SiteStatus,
    pub supply_percent: Option<u8>,
    pub min_supply_percent: f64,
}

/// Free bowsers assigned to one unserved location.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllocationView {
    pub location_id: Id<Location>,
    pub location_name: String,
    pub tier: ServiceTier,
    /// Litres the location needs.
    pub required_capacity: f64,
    pub allocated_capacity: f64,
    pub bowser_ids: Vec<Id<Bowser>>,
}

/// An active deployment below the minimum supply of its location's tier.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplyWarning {
    pub deployment_id: Id<Deployment>,
    pub location_id: Id<Location>,
    pub location_name: String,
    pub bowser_id: Id<Bowser>,
    pub tier: ServiceTier,
    pub level: u8,
    pub supply_percent: u8,
    pub min_supply_percent: f64,
    pub minutes_to_empty: u32,
    pub needs_refill: bool,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationPerformance {
    pub location_id: Id<Location>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<LocationType>,
    pub tier: ServiceTier,
    pub active_deployments: usize,
    /// Mean supply over the active deployments, 0 without any.
    pub supply_percent: u8,
    pub refills_per_day: f64,
    pub open_alerts: usize,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub days: i64,
    pub bowsers_in_service: usize,
    pub locations_served: usize,
    pub maintenance_completion_percent: u8,
    /// Litres drawn from the tanks of active deployments.
    pub water_supplied_litres: f64,
    pub utilization: BTreeMap<String, usize>,
    pub distribution: BTreeMap<ServiceTier, usize>,
    pub maintenance_by_type: BTreeMap<String, usize>,
    pub locations: Vec<LocationPerformance>,
}
