use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{check_bounds, check_latitude, check_longitude, ListingViolation};

pub const DEFAULT_COUNTRY: &str = "United States";

/// Kind of building a listing advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    House,
    Apartment,
    Condo,
    Townhouse,
    Commercial,
}

impl PropertyType {
    pub const fn label(self) -> &'static str {
        match self {
            PropertyType::House => "house",
            PropertyType::Apartment => "apartment",
            PropertyType::Condo => "condo",
            PropertyType::Townhouse => "townhouse",
            PropertyType::Commercial => "commercial",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "house" => Some(Self::House),
            "apartment" => Some(Self::Apartment),
            "condo" => Some(Self::Condo),
            "townhouse" => Some(Self::Townhouse),
            "commercial" => Some(Self::Commercial),
            _ => None,
        }
    }
}

/// Market status of a listing. Searches default to `Available` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    Available,
    Sold,
    Pending,
    OffMarket,
}

impl PropertyStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PropertyStatus::Available => "available",
            PropertyStatus::Sold => "sold",
            PropertyStatus::Pending => "pending",
            PropertyStatus::OffMarket => "off_market",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "available" => Some(Self::Available),
            "sold" => Some(Self::Sold),
            "pending" => Some(Self::Pending),
            "off_market" => Some(Self::OffMarket),
            _ => None,
        }
    }
}

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates")]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinates {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = ListingViolation;

    fn try_from(raw: RawCoordinates) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ListingViolation> {
        Ok(Self {
            latitude: check_latitude(latitude)?,
            longitude: check_longitude(longitude)?,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Postal address. `full_address` is derived once at construction when not supplied and
/// is the string handed to the geocoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AddressInput")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub full_address: String,
}

#[derive(Deserialize)]
struct AddressInput {
    street: String,
    city: String,
    state: String,
    zip_code: String,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    full_address: Option<String>,
}

impl From<AddressInput> for Address {
    fn from(input: AddressInput) -> Self {
        Address::with_parts(
            input.street,
            input.city,
            input.state,
            input.zip_code,
            input.country,
            input.full_address,
        )
    }
}

impl Address {
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        zip_code: impl Into<String>,
    ) -> Self {
        Self::with_parts(
            street.into(),
            city.into(),
            state.into(),
            zip_code.into(),
            None,
            None,
        )
    }

    pub fn with_parts(
        street: String,
        city: String,
        state: String,
        zip_code: String,
        country: Option<String>,
        full_address: Option<String>,
    ) -> Self {
        let full_address = full_address
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| format!("{street}, {city}, {state} {zip_code}"));

        Self {
            street,
            city,
            state,
            zip_code,
            country: country.unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
            full_address,
        }
    }
}

/// Rectangle in coordinate space; northeast strictly exceeds southwest on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBounds")]
pub struct MapBounds {
    northeast: Coordinates,
    southwest: Coordinates,
}

#[derive(Deserialize)]
struct RawBounds {
    northeast: Coordinates,
    southwest: Coordinates,
}

impl TryFrom<RawBounds> for MapBounds {
    type Error = ListingViolation;

    fn try_from(raw: RawBounds) -> Result<Self, Self::Error> {
        Self::new(raw.northeast, raw.southwest)
    }
}

impl MapBounds {
    pub fn new(northeast: Coordinates, southwest: Coordinates) -> Result<Self, ListingViolation> {
        check_bounds(&northeast, &southwest)?;
        Ok(Self {
            northeast,
            southwest,
        })
    }

    pub fn northeast(&self) -> &Coordinates {
        &self.northeast
    }

    pub fn southwest(&self) -> &Coordinates {
        &self.southwest
    }
}

/// A persisted listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub title: String,
    pub property_type: PropertyType,
    pub status: PropertyStatus,
    pub price: u64,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<f64>,
    #[serde(default)]
    pub square_feet: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub address: Address,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub alternative_phone: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inbound payload for creating a listing. Coordinates are geocoded when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDraft {
    pub title: String,
    pub property_type: PropertyType,
    pub status: PropertyStatus,
    pub price: u64,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<f64>,
    #[serde(default)]
    pub square_feet: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub address: Address,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub alternative_phone: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
}

/// Partial update; only `Some` fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub status: Option<PropertyStatus>,
    #[serde(default)]
    pub price: Option<u64>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<f64>,
    #[serde(default)]
    pub square_feet: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub features: Option<Vec<String>>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub alternative_phone: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
}

fn default_statuses() -> Vec<PropertyStatus> {
    vec![PropertyStatus::Available]
}

/// Optional search constraints; every `None`/empty field is unconstrained except
/// `status`, which defaults to available listings only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySearchFilters {
    #[serde(default)]
    pub bounds: Option<MapBounds>,
    #[serde(default)]
    pub property_types: Vec<PropertyType>,
    #[serde(default)]
    pub min_price: Option<u64>,
    #[serde(default)]
    pub max_price: Option<u64>,
    #[serde(default)]
    pub min_bedrooms: Option<u32>,
    #[serde(default)]
    pub max_bedrooms: Option<u32>,
    #[serde(default)]
    pub min_bathrooms: Option<f64>,
    #[serde(default)]
    pub max_bathrooms: Option<f64>,
    #[serde(default)]
    pub min_square_feet: Option<u32>,
    #[serde(default)]
    pub max_square_feet: Option<u32>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default = "default_statuses")]
    pub status: Vec<PropertyStatus>,
}

impl Default for PropertySearchFilters {
    fn default() -> Self {
        Self {
            bounds: None,
            property_types: Vec::new(),
            min_price: None,
            max_price: None,
            min_bedrooms: None,
            max_bedrooms: None,
            min_bathrooms: None,
            max_bathrooms: None,
            min_square_feet: None,
            max_square_feet: None,
            city: None,
            state: None,
            features: Vec::new(),
            status: default_statuses(),
        }
    }
}

impl PropertySearchFilters {
    /// Feature filters with surrounding whitespace removed and blanks dropped.
    pub fn required_features(&self) -> Vec<&str> {
        self.features
            .iter()
            .map(|feature| feature.trim())
            .filter(|feature| !feature.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn derives_full_address_when_missing() {
        let address = Address::new("742 Evergreen Terrace", "Springfield", "OR", "97403");
        assert_eq!(
            address.full_address,
            "742 Evergreen Terrace, Springfield, OR 97403"
        );
        assert_eq!(address.country, DEFAULT_COUNTRY);
    }

    #[test]
    fn derives_full_address_when_deserialized_blank() {
        let address: Address = serde_json::from_value(json!({
            "street": "1 Infinite Loop",
            "city": "Cupertino",
            "state": "CA",
            "zip_code": "95014",
            "full_address": ""
        }))
        .expect("address parses");
        assert_eq!(address.full_address, "1 Infinite Loop, Cupertino, CA 95014");
    }

    #[test]
    fn keeps_supplied_full_address() {
        let address: Address = serde_json::from_value(json!({
            "street": "123 Main St",
            "city": "Springfield",
            "state": "IL",
            "zip_code": "62701",
            "country": "USA",
            "full_address": "123 Main St, Springfield"
        }))
        .expect("address parses");
        assert_eq!(address.full_address, "123 Main St, Springfield");
        assert_eq!(address.country, "USA");
    }

    #[test]
    fn coordinates_reject_out_of_range_payloads() {
        let err = serde_json::from_value::<Coordinates>(json!({
            "latitude": 91.0,
            "longitude": 0.0
        }))
        .expect_err("latitude out of range");
        assert!(err.to_string().contains("latitude"));

        assert!(serde_json::from_value::<Coordinates>(json!({
            "latitude": "north",
            "longitude": 0.0
        }))
        .is_err());

        let ok: Coordinates =
            serde_json::from_value(json!({ "latitude": -33.86, "longitude": 151.21 }))
                .expect("valid coordinates");
        assert_eq!(ok.latitude(), -33.86);
    }

    #[test]
    fn bounds_require_strictly_greater_northeast() {
        let sw = Coordinates::new(40.0, -75.0).expect("valid");
        let ne = Coordinates::new(41.0, -74.0).expect("valid");
        assert!(MapBounds::new(ne, sw).is_ok());
        assert_eq!(
            MapBounds::new(sw, ne),
            Err(ListingViolation::InvertedBounds)
        );

        let same_latitude = Coordinates::new(40.0, -74.0).expect("valid");
        assert!(MapBounds::new(same_latitude, sw).is_err());
    }

    #[test]
    fn search_filters_default_to_available() {
        let filters: PropertySearchFilters =
            serde_json::from_value(json!({})).expect("empty filters parse");
        assert_eq!(filters.status, vec![PropertyStatus::Available]);
        assert_eq!(filters, PropertySearchFilters::default());
    }

    #[test]
    fn required_features_drops_blanks() {
        let filters = PropertySearchFilters {
            features: vec![" parking ".to_string(), "  ".to_string(), "gym".to_string()],
            ..PropertySearchFilters::default()
        };
        assert_eq!(filters.required_features(), vec!["parking", "gym"]);
    }

    #[test]
    fn status_labels_match_wire_format() {
        assert_eq!(PropertyStatus::OffMarket.label(), "off_market");
        assert_eq!(
            serde_json::to_value(PropertyStatus::OffMarket).expect("serializes"),
            json!("off_market")
        );
        assert_eq!(PropertyStatus::parse("Off_Market"), Some(PropertyStatus::OffMarket));
        assert_eq!(PropertyType::parse("condo"), Some(PropertyType::Condo));
        assert_eq!(PropertyType::parse("castle"), None);
    }
}
