use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use utility::{geo::Coordinates, id::Id, postcode};

use crate::{resource, string_enum};

string_enum! {
    pub enum LocationType {
        Healthcare => "healthcare" | "hospital" | "clinic",
        Emergency => "emergency" | "firestation" | "policestation" | "ambulancedepot",
        Critical => "critical" | "powerplant" | "watertreatment" | "datacenter",
        Residential => "residential" | "apartment",
        Commercial => "commercial" | "office" | "retail",
        School => "school" | "education",
        Community => "community",
    }
}

/// How urgently a location needs water. Declared most urgent first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ServiceTier {
    Healthcare,
    Emergency,
    Critical,
    Residential,
    Commercial,
}

impl ServiceTier {
    pub const ALL: [ServiceTier; 5] = [
        ServiceTier::Healthcare,
        ServiceTier::Emergency,
        ServiceTier::Critical,
        ServiceTier::Residential,
        ServiceTier::Commercial,
    ];

    /// Types without a tier of their own are served like commercial sites.
    pub fn of(kind: Option<&LocationType>) -> Self {
        match kind {
            Some(LocationType::Healthcare) => ServiceTier::Healthcare,
            Some(LocationType::Emergency) => ServiceTier::Emergency,
            Some(LocationType::Critical) => ServiceTier::Critical,
            Some(LocationType::Residential) => ServiceTier::Residential,
            _ => ServiceTier::Commercial,
        }
    }

    /// 1 for healthcare up to 5 for commercial.
    pub fn level(self) -> u8 {
        match self {
            ServiceTier::Healthcare => 1,
            ServiceTier::Emergency => 2,
            ServiceTier::Critical => 3,
            ServiceTier::Residential => 4,
            ServiceTier::Commercial => 5,
        }
    }

    /// Supply percentage a deployment must not fall below.
    pub fn min_supply_percent(self) -> f64 {
        match self {
            ServiceTier::Healthcare => 80.0,
            ServiceTier::Emergency => 75.0,
            ServiceTier::Critical => 70.0,
            ServiceTier::Residential => 60.0,
            ServiceTier::Commercial => 50.0,
        }
    }

    /// Promised response time in minutes.
    pub fn response_minutes(self) -> f64 {
        match self {
            ServiceTier::Healthcare => 60.0,
            ServiceTier::Emergency => 90.0,
            ServiceTier::Critical => 120.0,
            ServiceTier::Residential => 180.0,
            ServiceTier::Commercial => 240.0,
        }
    }

    pub fn check_interval_minutes(self) -> u32 {
        match self {
            ServiceTier::Healthcare => 15,
            ServiceTier::Emergency => 20,
            ServiceTier::Critical => 30,
            ServiceTier::Residential => 45,
            ServiceTier::Commercial => 60,
        }
    }

    /// Typical draw in percent of a tank per hour.
    pub fn usage_percent_per_hour(self) -> f64 {
        match self {
            ServiceTier::Healthcare => 5.0,
            ServiceTier::Emergency | ServiceTier::Critical => 4.0,
            ServiceTier::Residential => 3.0,
            ServiceTier::Commercial => 2.0,
        }
    }

    /// Urgent at any time of day.
    pub fn is_round_the_clock(self) -> bool {
        matches!(self, ServiceTier::Healthcare | ServiceTier::Emergency)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceTier::Healthcare => "healthcare",
            ServiceTier::Emergency => "emergency",
            ServiceTier::Critical => "critical",
            ServiceTier::Residential => "residential",
            ServiceTier::Commercial => "commercial",
        }
    }
}

impl std::fmt::Display for ServiceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        ServiceTier::ALL
            .into_iter()
            .find(|tier| tier.as_str() == lower)
            .ok_or_else(|| format!("unknown service tier '{s}'"))
    }
}

string_enum! {
    pub enum LocationStatus {
        Active => "active",
        Inactive => "inactive",
        Planned => "planned",
    }
}

/// The position shapes found in the wild: `[lat, lng]`, `{lat, lng}` and
/// `{latitude, longitude}` nested under `coordinates`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawPosition {
    Pair([f64; 2]),
    Short {
        lat: f64,
        #[serde(alias = "lon")]
        lng: f64,
    },
    Long {
        latitude: f64,
        longitude: f64,
    },
}

impl RawPosition {
    pub fn normalize(&self) -> Option<Coordinates> {
        match *self {
            RawPosition::Pair([lat, lng]) => Coordinates::checked(lat, lng),
            RawPosition::Short { lat, lng } => Coordinates::checked(lat, lng),
            RawPosition::Long {
                latitude,
                longitude,
            } => Coordinates::checked(latitude, longitude),
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Id::is_blank")]
    pub id: Id<Location>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub postcode: Option<String>,
    pub area: Option<String>,
    #[serde(default, alias = "lat")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "lng", alias = "lon")]
    pub longitude: Option<f64>,
    #[serde(default, alias = "position", deserialize_with = "lenient_position")]
    pub coordinates: Option<RawPosition>,
    #[serde(rename = "type", alias = "location_type")]
    pub kind: Option<LocationType>,
    pub status: Option<LocationStatus>,
    #[serde(default, alias = "estimatedPopulation", alias = "population")]
    pub estimated_population: Option<f64>,
    #[serde(default, alias = "hasVulnerablePopulation")]
    pub has_vulnerable_population: bool,
    #[serde(default, alias = "hasCriticalEquipment")]
    pub has_critical_equipment: bool,
}

resource!(Location, "/locations", "locations");

impl Location {
    /// The canonical position, whichever shape the record arrived in.
    /// `None` means the location cannot be placed on a map.
    pub fn position(&self) -> Option<Coordinates> {
        self.coordinates
            .as_ref()
            .and_then(RawPosition::normalize)
            .or_else(|| Coordinates::checked(self.latitude?, self.longitude?))
    }

    /// An explicit postcode if the record has one, otherwise whatever can be
    /// recovered from the address.
    pub fn postcode(&self) -> Option<String> {
        self.postcode
            .as_deref()
            .map(str::trim)
            .filter(|postcode| !postcode.is_empty())
            .map(str::to_uppercase)
            .or_else(|| postcode::extract_postcode(&self.address))
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, Some(LocationStatus::Active))
    }

    pub fn tier(&self) -> ServiceTier {
        ServiceTier::of(self.kind.as_ref())
    }

    /// People served, if the record gives a usable estimate.
    pub fn population(&self) -> Option<f64> {
        self.estimated_population
            .filter(|population| population.is_finite() && *population > 0.0)
    }
}

/// A malformed `coordinates` value must not reject the whole location; it
/// simply leaves the location unplaceable.
fn lenient_position<'de, D>(deserializer: D) -> Result<Option<RawPosition>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn location(value: serde_json::Value) -> Location {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn all_position_shapes_normalize_to_the_same_pair() {
        let expected = Some(Coordinates::new(51.5074, -0.1278));
        let shapes = [
            json!({"id": "LOC001", "coordinates": [51.5074, -0.1278]}),
            json!({"id": "LOC001", "coordinates": {"lat": 51.5074, "lng": -0.1278}}),
            json!({"id": "LOC001", "latitude": 51.5074, "longitude": -0.1278}),
            json!({"id": "LOC001", "position": {"latitude": 51.5074, "longitude": -0.1278}}),
        ];
        for shape in shapes {
            assert_eq!(location(shape.clone()).position(), expected, "{shape}");
        }
    }

    #[test]
    fn missing_or_malformed_position_is_none() {
        assert_eq!(location(json!({"id": "LOC002"})).position(), None);
        assert_eq!(
            location(json!({"id": "LOC002", "coordinates": "somewhere"})).position(),
            None
        );
        assert_eq!(
            location(json!({"id": "LOC002", "latitude": 51.5})).position(),
            None
        );
    }

    #[test]
    fn postcode_prefers_the_explicit_field() {
        let explicit = location(json!({
            "id": "LOC001",
            "address": "123 Riverside Lane, SW1A 1AA",
            "postcode": "se1 7pb"
        }));
        assert_eq!(explicit.postcode().as_deref(), Some("SE1 7PB"));

        let derived = location(json!({
            "id": "LOC001",
            "address": "123 Riverside Lane, SW1A 1AA"
        }));
        assert_eq!(derived.postcode().as_deref(), Some("SW1A 1AA"));
    }

    #[test]
    fn type_and_status_are_parsed() {
        let parsed = location(json!({
            "id": 7,
            "name": "Central Hospital",
            "type": "healthcare",
            "status": "active"
        }));
        assert_eq!(parsed.id.as_str(), "7");
        assert_eq!(parsed.kind, Some(LocationType::Healthcare));
        assert!(parsed.is_active());
    }

    #[test]
    fn types_map_to_service_tiers() {
        let tier = |kind: &str| location(json!({"id": "L", "type": kind})).tier();
        assert_eq!(tier("clinic"), ServiceTier::Healthcare);
        assert_eq!(tier("fireStation"), ServiceTier::Emergency);
        assert_eq!(tier("powerPlant"), ServiceTier::Critical);
        assert_eq!(tier("apartment"), ServiceTier::Residential);
        assert_eq!(tier("retail"), ServiceTier::Commercial);
        assert_eq!(tier("school"), ServiceTier::Commercial);
        assert_eq!(location(json!({"id": "L"})).tier(), ServiceTier::Commercial);

        assert!(ServiceTier::Healthcare < ServiceTier::Commercial);
        assert_eq!("Critical".parse::<ServiceTier>(), Ok(ServiceTier::Critical));
        assert!("hospital".parse::<ServiceTier>().is_err());
    }

    #[test]
    fn population_and_flags() {
        let parsed = location(json!({
            "id": "L", "estimatedPopulation": 1200, "hasVulnerablePopulation": true
        }));
        assert_eq!(parsed.population(), Some(1200.0));
        assert!(parsed.has_vulnerable_population);
        assert!(!parsed.has_critical_equipment);
        assert_eq!(location(json!({"id": "L", "population": 0})).population(), None);
    }
}
