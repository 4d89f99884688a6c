use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    bowser::Bowser,
    deployment::{Deployment, DeploymentStatus},
    location::Location,
};

/// Below this supply percentage a deployed bowser has to be refilled,
/// whatever its deployment says.
pub const REFILL_THRESHOLD_PERCENT: f64 = 25.0;

/// What a site looks like to the public: is there water, and if not, why.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    Inactive,
    Scheduled,
    Refilling,
    Available,
    Maintenance,
}

impl SiteStatus {
    pub const ALL: [SiteStatus; 5] = [
        SiteStatus::Inactive,
        SiteStatus::Scheduled,
        SiteStatus::Refilling,
        SiteStatus::Available,
        SiteStatus::Maintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SiteStatus::Inactive => "inactive",
            SiteStatus::Scheduled => "scheduled",
            SiteStatus::Refilling => "refilling",
            SiteStatus::Available => "available",
            SiteStatus::Maintenance => "maintenance",
        }
    }
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SiteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        SiteStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == lower)
            .ok_or_else(|| format!("unknown site status '{s}'"))
    }
}

/// Ordered decision list. The first matching rule wins, so a low bowser
/// reports `Refilling` even while its deployment is active.
///
/// A completed deployment, or one that belongs to another location, counts
/// as no deployment at all.
pub fn derive_status(
    location: &Location,
    deployment: Option<&Deployment>,
    bowser: Option<&Bowser>,
) -> SiteStatus {
    let Some(deployment) = deployment.filter(|deployment| {
        deployment.location_id == location.id && deployment.status != DeploymentStatus::Completed
    }) else {
        return SiteStatus::Inactive;
    };

    if deployment
        .supply_percent(bowser)
        .is_some_and(|percent| percent < REFILL_THRESHOLD_PERCENT)
    {
        return SiteStatus::Refilling;
    }

    match deployment.status {
        DeploymentStatus::Active => SiteStatus::Available,
        DeploymentStatus::Scheduled => SiteStatus::Scheduled,
        _ => SiteStatus::Maintenance,
    }
}
