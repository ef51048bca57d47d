//! Query-string decoding for the listing routes.

use std::str::FromStr;

use serde::Deserialize;

use super::domain::{
    Coordinates, MapBounds, PropertySearchFilters, PropertyStatus, PropertyType,
};
use super::validation::ListingViolation;

pub const DEFAULT_RADIUS_MILES: f64 = 5.0;
pub const MAX_RADIUS_MILES: f64 = 50.0;
pub const DEFAULT_NEARBY_LIMIT: usize = 20;
pub const MAX_NEARBY_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("invalid value '{value}' for parameter '{name}'")]
    Invalid { name: String, value: String },
    #[error("map bounds require ne_lat, ne_lng, sw_lat and sw_lng together")]
    PartialBounds,
    #[error("radius_miles must be greater than 0 and at most 50 (found {0})")]
    Radius(f64),
    #[error("limit must be between 1 and 100 (found {0})")]
    Limit(usize),
    #[error(transparent)]
    Violation(#[from] ListingViolation),
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T, ParamError> {
    value.trim().parse().map_err(|_| ParamError::Invalid {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn optional<T: FromStr>(name: &str, value: &str) -> Result<Option<T>, ParamError> {
    if value.trim().is_empty() {
        Ok(None)
    } else {
        parse_value(name, value).map(Some)
    }
}

/// Decodes repeated `key=value` pairs into search filters.
///
/// `property_type`, `features` (alias `feature`) and `status` may repeat. Supplying
/// `status` at all replaces the default; a blank `status=` lifts the status constraint.
/// Unknown keys are ignored.
pub fn search_filters(pairs: &[(String, String)]) -> Result<PropertySearchFilters, ParamError> {
    let mut filters = PropertySearchFilters::default();
    let mut statuses: Option<Vec<PropertyStatus>> = None;
    let mut corners: [Option<f64>; 4] = [None; 4];

    for (name, value) in pairs {
        match name.as_str() {
            "property_type" | "property_types" => {
                if value.trim().is_empty() {
                    continue;
                }
                let kind = PropertyType::parse(value).ok_or_else(|| ParamError::Invalid {
                    name: name.clone(),
                    value: value.clone(),
                })?;
                filters.property_types.push(kind);
            }
            "min_price" => filters.min_price = optional(name, value)?,
            "max_price" => filters.max_price = optional(name, value)?,
            "min_bedrooms" => filters.min_bedrooms = optional(name, value)?,
            "max_bedrooms" => filters.max_bedrooms = optional(name, value)?,
            "min_bathrooms" => filters.min_bathrooms = optional(name, value)?,
            "max_bathrooms" => filters.max_bathrooms = optional(name, value)?,
            "min_square_feet" => filters.min_square_feet = optional(name, value)?,
            "max_square_feet" => filters.max_square_feet = optional(name, value)?,
            "city" => filters.city = Some(value.trim().to_string()).filter(|v| !v.is_empty()),
            "state" => filters.state = Some(value.trim().to_string()).filter(|v| !v.is_empty()),
            "features" | "feature" => filters.features.push(value.clone()),
            "status" => {
                let collected = statuses.get_or_insert_with(Vec::new);
                if value.trim().is_empty() {
                    continue;
                }
                let status = PropertyStatus::parse(value).ok_or_else(|| ParamError::Invalid {
                    name: name.clone(),
                    value: value.clone(),
                })?;
                collected.push(status);
            }
            "ne_lat" => corners[0] = optional(name, value)?,
            "ne_lng" => corners[1] = optional(name, value)?,
            "sw_lat" => corners[2] = optional(name, value)?,
            "sw_lng" => corners[3] = optional(name, value)?,
            _ => {}
        }
    }

    if let Some(statuses) = statuses {
        filters.status = statuses;
    }
    filters.bounds = match corners {
        [Some(ne_lat), Some(ne_lng), Some(sw_lat), Some(sw_lng)] => Some(MapBounds::new(
            Coordinates::new(ne_lat, ne_lng)?,
            Coordinates::new(sw_lat, sw_lng)?,
        )?),
        [None, None, None, None] => None,
        _ => return Err(ParamError::PartialBounds),
    };
    Ok(filters)
}

/// Radius and limit shared by both nearby routes.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RadiusParams {
    #[serde(default)]
    pub radius_miles: Option<f64>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl RadiusParams {
    pub fn resolve(&self) -> Result<(f64, usize), ParamError> {
        let radius = self.radius_miles.unwrap_or(DEFAULT_RADIUS_MILES);
        if !(radius > 0.0 && radius <= MAX_RADIUS_MILES) {
            return Err(ParamError::Radius(radius));
        }
        let limit = self.limit.unwrap_or(DEFAULT_NEARBY_LIMIT);
        if !(1..=MAX_NEARBY_LIMIT).contains(&limit) {
            return Err(ParamError::Limit(limit));
        }
        Ok((radius, limit))
    }
}

/// Center point plus radius for `/api/properties/nearby`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NearbyParams {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub radius_miles: Option<f64>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl NearbyParams {
    pub fn center(&self) -> Result<Coordinates, ParamError> {
        Ok(Coordinates::new(self.lat, self.lng)?)
    }

    pub fn radius(&self) -> RadiusParams {
        RadiusParams {
            radius_miles: self.radius_miles,
            limit: self.limit,
        }
    }
}
