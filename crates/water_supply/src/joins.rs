use std::{
    cmp::{Ordering, Reverse},
    collections::{BTreeMap, HashMap},
};

use chrono::{Duration, NaiveDate};
use indexmap::IndexMap;
use itertools::Itertools;
use model::{
    bowser::Bowser,
    deployment::{Deployment, DeploymentStatus},
    location::Location,
    status::{derive_status, SiteStatus},
    view::{AlertView, DashboardStats, DeploymentView, MaintenanceView, SiteView},
    Priority, WithDistance,
};
use utility::{geo::Coordinates, id::Id, postcode};

use crate::collections::Collections;

/// Filters for the public site list.
#[derive(Debug, Clone, Default)]
pub struct SiteFilter {
    pub status: Option<SiteStatus>,
    /// Postcode area prefix such as `SW1`, matched case-insensitively.
    pub area: Option<String>,
}

impl SiteFilter {
    pub fn matches(&self, site: &SiteView) -> bool {
        let status_matches = self.status.map_or(true, |status| site.status == status);
        let area_matches = self.area.as_deref().map_or(true, |area| {
            let area = area.trim().to_uppercase();
            site.postcode
                .as_deref()
                .or(site.area.as_deref())
                .is_some_and(|code| code.to_uppercase().starts_with(&area))
        });
        status_matches && area_matches
    }
}

/// A deployment whose foreign keys both resolved.
#[derive(Debug, Clone, Copy)]
struct Resolved<'a> {
    deployment: &'a Deployment,
    location: &'a Location,
    bowser: &'a Bowser,
}

/// Lookup tables over one snapshot of [`Collections`]. Building the index
/// resolves every deployment once; deployments with a dangling foreign key
/// are left out of every view. They are reported once per load by
/// [`Collections::dangling_deployments`].
pub struct Index<'a> {
    collections: &'a Collections,
    locations: IndexMap<&'a str, &'a Location>,
    bowsers: HashMap<&'a str, &'a Bowser>,
    resolved: Vec<Resolved<'a>>,
    /// The deployment shown for a location.
    current: HashMap<&'a str, Resolved<'a>>,
}

fn status_rank(status: &DeploymentStatus) -> u8 {
    match status {
        DeploymentStatus::Active => 0,
        DeploymentStatus::Scheduled => 1,
        _ => 2,
    }
}

/// Orders candidates for the same location: active before scheduled before
/// anything else, then the most recent start, then the highest id.
fn precedence(lhs: &Deployment, rhs: &Deployment) -> Ordering {
    status_rank(&lhs.status)
        .cmp(&status_rank(&rhs.status))
        .then_with(|| Reverse(lhs.start_date).cmp(&Reverse(rhs.start_date)))
        .then_with(|| Reverse(lhs.id.as_str()).cmp(&Reverse(rhs.id.as_str())))
}

impl<'a> Index<'a> {
    pub fn new(collections: &'a Collections) -> Self {
        let locations: IndexMap<_, _> = collections
            .locations
            .iter()
            .map(|location| (location.id.as_str(), location))
            .collect();
        let bowsers: HashMap<_, _> = collections
            .bowsers
            .iter()
            .map(|bowser| (bowser.id.as_str(), bowser))
            .collect();

        let resolved: Vec<Resolved> = collections
            .deployments
            .iter()
            .filter_map(|deployment| {
                let location = locations.get(deployment.location_id.as_str()).copied();
                let bowser = bowsers.get(deployment.bowser_id.as_str()).copied();
                match (location, bowser) {
                    (Some(location), Some(bowser)) => Some(Resolved {
                        deployment,
                        location,
                        bowser,
                    }),
                    (None, _) => {
                        log::debug!(
                            "Skipping deployment {}: unknown location {}.",
                            deployment.id,
                            deployment.location_id
                        );
                        None
                    }
                    (_, None) => {
                        log::debug!(
                            "Skipping deployment {}: unknown bowser {}.",
                            deployment.id,
                            deployment.bowser_id
                        );
                        None
                    }
                }
            })
            .collect();

        let current = resolved
            .iter()
            .filter(|resolved| resolved.deployment.status != DeploymentStatus::Completed)
            .into_group_map_by(|resolved| resolved.location.id.as_str())
            .into_iter()
            .filter_map(|(location, candidates)| {
                candidates
                    .into_iter()
                    .min_by(|lhs, rhs| precedence(lhs.deployment, rhs.deployment))
                    .map(|chosen| (location, *chosen))
            })
            .collect();

        Self {
            collections,
            locations,
            bowsers,
            resolved,
            current,
        }
    }

    pub fn collections(&self) -> &'a Collections {
        self.collections
    }

    pub fn location(&self, id: &Id<Location>) -> Option<&'a Location> {
        self.locations.get(id.as_str()).copied()
    }

    pub fn bowser(&self, id: &Id<Bowser>) -> Option<&'a Bowser> {
        self.bowsers.get(id.as_str()).copied()
    }

    /// The deployment that decides the status of a location.
    pub fn deployment_at(&self, id: &Id<Location>) -> Option<&'a Deployment> {
        self.current
            .get(id.as_str())
            .map(|resolved| resolved.deployment)
    }

    fn deployment_view(resolved: &Resolved) -> DeploymentView {
        let Resolved {
            deployment,
            location,
            bowser,
        } = *resolved;
        DeploymentView {
            id: deployment.id.clone(),
            status: deployment.status.clone(),
            site_status: derive_status(location, Some(deployment), Some(bowser)),
            location_id: location.id.clone(),
            location_name: location.name.clone(),
            address: location.address.clone(),
            postcode: location.postcode(),
            coordinates: location.position(),
            bowser_id: bowser.id.clone(),
            bowser_number: bowser.number.clone(),
            capacity: bowser.capacity,
            current_level: bowser.current_level,
            supply_percent: deployment
                .supply_percent(Some(bowser))
                .map(|percent| percent.round() as u8)
                .unwrap_or(0),
            start_date: deployment.start_date,
            end_date: deployment.end_date,
            priority: deployment.priority.clone(),
        }
    }

    /// Every deployment with both ends resolved, in collection order.
    pub fn deployment_views(&self) -> Vec<DeploymentView> {
        self.resolved.iter().map(Self::deployment_view).collect()
    }

    pub fn deployment_view_of(&self, id: &Id<Deployment>) -> Option<DeploymentView> {
        self.resolved
            .iter()
            .find(|resolved| &resolved.deployment.id == id)
            .map(Self::deployment_view)
    }

    pub fn site_view(&self, location: &Location) -> SiteView {
        let current = self.current.get(location.id.as_str());
        let deployment = current.map(|resolved| resolved.deployment);
        let bowser = current.map(|resolved| resolved.bowser);
        let postcode = location.postcode();
        let area = location
            .area
            .clone()
            .or_else(|| postcode.as_deref().map(|code| postcode::outward_code(code).to_owned()));
        SiteView {
            id: location.id.clone(),
            name: location.name.clone(),
            address: location.address.clone(),
            postcode,
            area,
            coordinates: location.position(),
            kind: location.kind.clone(),
            status: derive_status(location, deployment, bowser),
            deployment_id: deployment.map(|deployment| deployment.id.clone()),
            bowser_id: bowser.map(|bowser| bowser.id.clone()),
            bowser_number: bowser.map(|bowser| bowser.number.clone()),
            supply_percent: deployment
                .and_then(|deployment| deployment.supply_percent(bowser))
                .map(|percent| percent.round() as u8),
        }
    }

    pub fn site(&self, id: &Id<Location>) -> Option<SiteView> {
        self.location(id).map(|location| self.site_view(location))
    }

    pub fn sites(&self) -> Vec<SiteView> {
        self.locations
            .values()
            .map(|location| self.site_view(location))
            .collect()
    }

    pub fn filter_sites(&self, filter: &SiteFilter) -> Vec<SiteView> {
        self.sites()
            .into_iter()
            .filter(|site| filter.matches(site))
            .collect()
    }

    /// Sites within `radius_km` of `center`, nearest first. Sites without a
    /// position are never near anything.
    pub fn nearby(&self, center: Coordinates, radius_km: f64) -> Vec<WithDistance<SiteView>> {
        let bounds = center.bounding_box(radius_km);
        self.locations
            .values()
            .filter_map(|location| {
                let position = location.position()?;
                if !bounds.contains(&position) {
                    return None;
                }
                let distance = center.distance_km(&position);
                (distance <= radius_km)
                    .then(|| WithDistance::new(distance, self.site_view(location)))
            })
            .sorted_by(|lhs, rhs| lhs.distance_km.total_cmp(&rhs.distance_km))
            .collect()
    }

    pub fn stats(&self) -> DashboardStats {
        let collections = self.collections;
        let bowsers_by_status = collections
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
            .collect::<BTreeMap<_, _>>();
        let sites_by_status = self
            .sites()
            .iter()
            .map(|site| site.status.as_str().to_owned())
            .counts()
            .into_iter()
            .collect::<BTreeMap<_, _>>();
        let fills = collections
            .bowsers
            .iter()
            .filter_map(Bowser::fill_ratio)
            .collect_vec();
        let average_fill_percent = (!fills.is_empty())
            .then(|| (fills.iter().sum::<f64>() / fills.len() as f64 * 100.0).round() as u8);

        DashboardStats {
            active_deployments: collections.active_deployments().count(),
            maintenance_due: collections
                .maintenance
                .iter()
                .filter(|record| record.is_due())
                .count(),
            active_locations: collections
                .locations
                .iter()
                .filter(|location| location.is_active())
                .count(),
            high_priority_alerts: collections
                .alerts
                .iter()
                .filter(|alert| alert.is_high_priority() && !alert.is_resolved())
                .count(),
            total_bowsers: collections.bowsers.len(),
            bowsers_by_status,
            sites_by_status,
            average_fill_percent,
        }
    }

    /// Maintenance jobs by date, undated ones last, with the status as of
    /// `today`.
    pub fn maintenance_schedule(&self, today: NaiveDate) -> Vec<MaintenanceView> {
        self.collections
            .maintenance
            .iter()
            .sorted_by_key(|record| (record.date.is_none(), record.date))
            .map(|record| MaintenanceView {
                id: record.id.clone(),
                bowser_id: record.bowser_id.clone(),
                bowser_number: self
                    .bowser(&record.bowser_id)
                    .map(|bowser| bowser.number.clone()),
                kind: record.kind.clone(),
                description: record.description.clone(),
                date: record.date,
                priority: record.priority.clone(),
                assigned_to: record.assigned_to.clone(),
                status: record.effective_status(today),
            })
            .collect()
    }

    /// Bowsers whose next service falls within `days` of `today`, including
    /// those already past it. Soonest first.
    pub fn bowsers_due_for_service(&self, today: NaiveDate, days: i64) -> Vec<&'a Bowser> {
        let horizon = today + Duration::days(days);
        self.collections
            .bowsers
            .iter()
            .filter(|bowser| bowser.next_maintenance.is_some_and(|date| date <= horizon))
            .sorted_by_key(|bowser| bowser.next_maintenance)
            .collect()
    }

    /// Alerts newest first, with the location name where it resolves.
    pub fn alerts(&self) -> Vec<AlertView> {
        self.collections
            .alerts
            .iter()
            .sorted_by_key(|alert| Reverse(alert.created_at))
            .map(|alert| AlertView {
                id: alert.id.clone(),
                title: alert.title.clone(),
                message: alert.message.clone(),
                priority: alert.priority.clone(),
                created_at: alert.created_at,
                location_id: alert.location_id.clone(),
                location_name: alert
                    .location_id
                    .as_ref()
                    .and_then(|id| self.location(id))
                    .map(|location| location.name.clone()),
                resolved: alert.is_resolved(),
            })
            .collect()
    }

    pub fn high_priority_alerts(&self) -> Vec<AlertView> {
        self.alerts()
            .into_iter()
            .filter(|alert| alert.priority == Some(Priority::High) && !alert.resolved)
            .collect()
    }
}
