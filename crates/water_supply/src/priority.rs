//! Ranking of locations by urgency, greedy allocation of free bowsers and
//! supply warnings for running deployments.

use itertools::Itertools;
use model::{
    bowser::Bowser,
    location::{Location, ServiceTier},
    view::{AllocationView, PriorityView, SupplyWarning},
};

use crate::joins::Index;

/// Litres a person needs per day.
pub const LITRES_PER_PERSON: f64 = 10.0;

/// A deployment that empties sooner than this needs a refill now.
pub const REFILL_WITHIN_MINUTES: u32 = 120;

/// Outside influences on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Conditions {
    /// Local hour of the day, `0..24`.
    pub hour: u32,
    pub extreme_weather: bool,
}

impl Conditions {
    pub fn at(hour: u32) -> Self {
        Self {
            hour,
            extreme_weather: false,
        }
    }

    fn is_business_hours(&self) -> bool {
        (9..=17).contains(&self.hour)
    }
}

/// Bonus subtracted from a location's score for circumstances that make it
/// more urgent.
pub fn special_conditions(location: &Location, conditions: &Conditions) -> f64 {
    let mut bonus = 0.0;
    if location.has_vulnerable_population {
        bonus += 200.0;
    }
    if location.has_critical_equipment {
        bonus += 150.0;
    }
    if conditions.extreme_weather {
        bonus += 100.0;
    }
    if location.tier().is_round_the_clock() {
        bonus += 100.0;
    } else if conditions.is_business_hours() {
        bonus += 50.0;
    }
    bonus
}

/// Urgency of a location, lower is more urgent. The tier dominates with
/// steps of 1000; supply above the tier minimum, a response slower than
/// promised and a small population push a location back within its tier.
pub fn priority_score(
    location: &Location,
    supply_percent: Option<f64>,
    response_minutes: Option<f64>,
    conditions: &Conditions,
) -> f64 {
    let tier = location.tier();
    let base = f64::from(tier.level()) * 1000.0;
    let supply = supply_percent
        .map(|supply| (supply - tier.min_supply_percent()).max(0.0))
        .unwrap_or(0.0);
    let response = response_minutes
        .map(|minutes| ((minutes - tier.response_minutes()) / 60.0 * 100.0).max(0.0))
        .unwrap_or(0.0);
    let population = location
        .population()
        .map(|population| (100.0 - population / 1000.0).max(0.0))
        .unwrap_or(50.0);

    base + supply + response + population - special_conditions(location, conditions)
}

/// Litres a location needs: a daily ration per person, raised by up to 80%
/// for the more urgent tiers. Zero without a population estimate.
pub fn required_capacity(location: &Location) -> f64 {
    let multiplier = 1.0 + f64::from(5 - location.tier().level()) * 0.2;
    location.population().unwrap_or(0.0) * LITRES_PER_PERSON * multiplier
}

/// Expected draw in percent of a tank per hour.
pub fn usage_rate(tier: ServiceTier, conditions: &Conditions) -> f64 {
    let mut rate = tier.usage_percent_per_hour();
    match conditions.hour {
        6..=9 => rate *= 1.5,
        17..=20 => rate *= 1.3,
        0..=5 | 23..=u32::MAX => rate *= 0.5,
        _ => {}
    }
    if conditions.extreme_weather {
        rate *= 1.4;
    }
    rate
}

pub fn minutes_to_empty(supply_percent: f64, rate: f64) -> u32 {
    if rate <= 0.0 {
        return u32::MAX;
    }
    (supply_percent.max(0.0) / rate * 60.0).floor() as u32
}

/// Hands out bowsers, largest first, to locations in priority order until
/// each location's required capacity is covered or the bowsers run out.
/// Locations that get nothing are left out.
pub fn allocate(
    bowsers: &[&Bowser],
    locations: &[&Location],
    conditions: &Conditions,
) -> Vec<AllocationView> {
    let mut free = bowsers
        .iter()
        .copied()
        .sorted_by(|lhs, rhs| rhs.capacity.total_cmp(&lhs.capacity))
        .collect_vec()
        .into_iter()
        .peekable();

    let ranked = locations
        .iter()
        .map(|location| (priority_score(location, None, None, conditions), *location))
        .sorted_by(|(lhs, _), (rhs, _)| lhs.total_cmp(rhs))
        .map(|(_, location)| location);

    let mut allocations = Vec::new();
    for location in ranked {
        if free.peek().is_none() {
            break;
        }
        let required = required_capacity(location);
        let mut allocated = 0.0;
        let mut bowser_ids = Vec::new();
        while allocated < required {
            let Some(bowser) = free.next() else {
                break;
            };
            allocated += bowser.capacity;
            bowser_ids.push(bowser.id.clone());
        }
        if !bowser_ids.is_empty() {
            allocations.push(AllocationView {
                location_id: location.id.clone(),
                location_name: location.name.clone(),
                tier: location.tier(),
                required_capacity: required,
                allocated_capacity: allocated,
                bowser_ids,
            });
        }
    }
    allocations
}

impl<'a> Index<'a> {
    /// Active locations, most urgent first. Supply is taken from the
    /// deployment currently serving each location.
    pub fn priorities(&self, conditions: &Conditions) -> Vec<PriorityView> {
        self.collections()
            .locations
            .iter()
            .filter(|location| location.is_active())
            .map(|location| {
                let site = self.site_view(location);
                let supply = site.supply_percent.map(f64::from);
                let tier = location.tier();
                PriorityView {
                    location_id: location.id.clone(),
                    location_name: location.name.clone(),
                    tier,
                    level: tier.level(),
                    score: priority_score(location, supply, None, conditions),
                    site_status: site.status,
                    supply_percent: site.supply_percent,
                    min_supply_percent: tier.min_supply_percent(),
                }
            })
            .sorted_by(|lhs, rhs| lhs.score.total_cmp(&rhs.score))
            .collect()
    }

    /// Bowsers fit for service and not promised to any deployment.
    pub fn free_bowsers(&self) -> Vec<&'a Bowser> {
        let collections = self.collections();
        collections
            .bowsers
            .iter()
            .filter(|bowser| bowser.is_available())
            .filter(|bowser| collections.deployment_for_bowser(&bowser.id).is_none())
            .collect()
    }

    /// Active locations without an active or scheduled deployment.
    pub fn unserved_locations(&self) -> Vec<&'a Location> {
        self.collections()
            .locations
            .iter()
            .filter(|location| location.is_active())
            .filter(|location| self.deployment_at(&location.id).is_none())
            .collect()
    }

    pub fn allocation(&self, conditions: &Conditions) -> Vec<AllocationView> {
        allocate(&self.free_bowsers(), &self.unserved_locations(), conditions)
    }

    /// Active deployments below their tier's minimum supply, most urgent
    /// tier first.
    pub fn supply_warnings(&self, conditions: &Conditions) -> Vec<SupplyWarning> {
        self.collections()
            .active_deployments()
            .filter_map(|deployment| {
                let location = self.location(&deployment.location_id)?;
                let bowser = self.bowser(&deployment.bowser_id);
                let supply = deployment.supply_percent(bowser)?;
                let tier = location.tier();
                if supply >= tier.min_supply_percent() {
                    return None;
                }
                let minutes = minutes_to_empty(supply, usage_rate(tier, conditions));
                Some(SupplyWarning {
                    deployment_id: deployment.id.clone(),
                    location_id: location.id.clone(),
                    location_name: location.name.clone(),
                    bowser_id: deployment.bowser_id.clone(),
                    tier,
                    level: tier.level(),
                    supply_percent: supply.round() as u8,
                    min_supply_percent: tier.min_supply_percent(),
                    minutes_to_empty: minutes,
                    needs_refill: minutes < REFILL_WITHIN_MINUTES,
                })
            })
            .sorted_by_key(|warning| warning.level)
            .collect()
    }
}
