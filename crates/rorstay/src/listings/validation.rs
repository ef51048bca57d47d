use super::domain::{Coordinates, PropertyDraft, PropertyPatch, PropertySearchFilters};

/// Field-level constraint violations raised before anything reaches the store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ListingViolation {
    #[error("latitude must be within [-90, 90] (found {0})")]
    LatitudeOutOfRange(f64),
    #[error("longitude must be within [-180, 180] (found {0})")]
    LongitudeOutOfRange(f64),
    #[error("northeast coordinate must be greater than southwest")]
    InvertedBounds,
    #[error("price must be greater than zero")]
    NonPositivePrice,
    #[error("square feet must be greater than zero")]
    NonPositiveSquareFeet,
    #[error("bathrooms must be a non-negative number (found {0})")]
    InvalidBathrooms(f64),
    #[error("title must not be blank")]
    BlankTitle,
    #[error("max price must be greater than min price")]
    InvertedPriceRange,
    #[error("radius must be a positive number of miles (found {0})")]
    NonPositiveRadius(f64),
    #[error("unknown listing status: {0}")]
    UnknownStatus(String),
}

pub(crate) fn check_latitude(value: f64) -> Result<f64, ListingViolation> {
    if value.is_finite() && (-90.0..=90.0).contains(&value) {
        Ok(value)
    } else {
        Err(ListingViolation::LatitudeOutOfRange(value))
    }
}

pub(crate) fn check_longitude(value: f64) -> Result<f64, ListingViolation> {
    if value.is_finite() && (-180.0..=180.0).contains(&value) {
        Ok(value)
    } else {
        Err(ListingViolation::LongitudeOutOfRange(value))
    }
}

pub(crate) fn check_bounds(
    northeast: &Coordinates,
    southwest: &Coordinates,
) -> Result<(), ListingViolation> {
    if northeast.latitude() <= southwest.latitude()
        || northeast.longitude() <= southwest.longitude()
    {
        return Err(ListingViolation::InvertedBounds);
    }
    Ok(())
}

fn check_price(price: u64) -> Result<(), ListingViolation> {
    if price == 0 {
        return Err(ListingViolation::NonPositivePrice);
    }
    Ok(())
}

fn check_square_feet(square_feet: Option<u32>) -> Result<(), ListingViolation> {
    if square_feet == Some(0) {
        return Err(ListingViolation::NonPositiveSquareFeet);
    }
    Ok(())
}

fn check_bathrooms(bathrooms: Option<f64>) -> Result<(), ListingViolation> {
    match bathrooms {
        Some(value) if !value.is_finite() || value < 0.0 => {
            Err(ListingViolation::InvalidBathrooms(value))
        }
        _ => Ok(()),
    }
}

pub(crate) fn check_radius(radius_miles: f64) -> Result<f64, ListingViolation> {
    if radius_miles.is_finite() && radius_miles > 0.0 {
        Ok(radius_miles)
    } else {
        Err(ListingViolation::NonPositiveRadius(radius_miles))
    }
}

fn check_title(title: &str) -> Result<(), ListingViolation> {
    if title.trim().is_empty() {
        return Err(ListingViolation::BlankTitle);
    }
    Ok(())
}

impl PropertyDraft {
    pub fn validate(&self) -> Result<(), ListingViolation> {
        check_title(&self.title)?;
        check_price(self.price)?;
        check_square_feet(self.square_feet)?;
        check_bathrooms(self.bathrooms)?;
        Ok(())
    }
}

impl PropertyPatch {
    pub fn validate(&self) -> Result<(), ListingViolation> {
        if let Some(title) = &self.title {
            check_title(title)?;
        }
        if let Some(price) = self.price {
            check_price(price)?;
        }
        check_square_feet(self.square_feet)?;
        check_bathrooms(self.bathrooms)?;
        Ok(())
    }
}

impl PropertySearchFilters {
    pub fn validate(&self) -> Result<(), ListingViolation> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if max < min {
                return Err(ListingViolation::InvertedPriceRange);
            }
        }
        check_bathrooms(self.min_bathrooms)?;
        check_bathrooms(self.max_bathrooms)?;
        check_square_feet(self.min_square_feet)?;
        check_square_feet(self.max_square_feet)?;
        Ok(())
    }
}
