use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::domain::{
    Address, Coordinates, MapBounds, Property, PropertyDraft, PropertyPatch,
    PropertySearchFilters,
};
use super::identity::{decode_property, encode_property, resolve, ResolvedDocument};
use super::permissions::can_write;
use super::query::{PropertyQuery, QueryError, QueryPlan};
use super::store::{Document, PropertyStore, StoreError};
use super::validation::{check_radius, ListingViolation};
use crate::geocoding::{Geocoder, GeocodingError};
use crate::users::{Caller, UserRole};

/// Miles per degree of latitude used for the nearby pre-filter box.
const MILES_PER_DEGREE: f64 = 69.0;

const FIELD_ADDRESS: &str = "address";
const FIELD_COORDINATES: &str = "coordinates";
const FIELD_UPDATED_AT: &str = "updated_at";

/// Listing operations over a document store and a geocoder.
pub struct PropertyService<S, G> {
    store: Arc<S>,
    geocoder: Arc<G>,
}

impl<S, G> Clone for PropertyService<S, G> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            geocoder: Arc::clone(&self.geocoder),
        }
    }
}

impl<S, G> PropertyService<S, G>
where
    S: PropertyStore + 'static,
    G: Geocoder + 'static,
{
    pub fn new(store: Arc<S>, geocoder: Arc<G>) -> Self {
        Self { store, geocoder }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn geocoder(&self) -> &Arc<G> {
        &self.geocoder
    }

    /// Creates a listing owned by the caller (agents) or by the supplied agent (admins).
    pub async fn create(
        &self,
        caller: &Caller,
        draft: PropertyDraft,
    ) -> Result<Property, ListingServiceError> {
        let agent_id = match caller.role {
            UserRole::Agent => Some(caller.id.clone()),
            _ => draft.agent_id.clone(),
        };
        if !can_write(caller.role, agent_id.as_deref(), &caller.id) {
            return Err(ListingServiceError::Forbidden {
                actor: caller.id.clone(),
            });
        }
        draft.validate()?;

        let coordinates = match draft.coordinates {
            Some(coordinates) => coordinates,
            None => self.locate(&draft.address).await?,
        };

        let now = Utc::now();
        let property = Property {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            property_type: draft.property_type,
            status: draft.status,
            price: draft.price,
            bedrooms: draft.bedrooms,
            bathrooms: draft.bathrooms,
            square_feet: draft.square_feet,
            description: draft.description,
            features: draft.features,
            images: draft.images,
            address: draft.address,
            coordinates,
            contact_phone: draft.contact_phone,
            alternative_phone: draft.alternative_phone,
            contact_email: draft.contact_email,
            agent_id,
            created_at: now,
            updated_at: now,
        };

        self.store.insert(encode_property(&property)?).await?;
        info!(
            listing_id = %property.id,
            actor = %caller.id,
            "listing created"
        );
        Ok(property)
    }

    /// Fetches a listing by domain id, falling back to the store-native id.
    pub async fn get(&self, id: &str) -> Result<Property, ListingServiceError> {
        let resolved = self.resolve_existing(id).await?;
        Ok(decode_property(resolved.document)?)
    }

    /// Applies the supplied fields of `patch`. A new address is always re-geocoded and
    /// replaces any coordinates given alongside it.
    pub async fn update(
        &self,
        caller: &Caller,
        id: &str,
        patch: PropertyPatch,
    ) -> Result<Property, ListingServiceError> {
        patch.validate()?;
        let ResolvedDocument { key, document } = self.resolve_existing(id).await?;
        self.authorize(caller, &document)?;

        let mut changes = patch_document(&patch)?;
        if let Some(address) = &patch.address {
            match self.geocoder.geocode(&address.full_address).await? {
                Some(coordinates) => {
                    changes.insert(
                        FIELD_COORDINATES.to_string(),
                        serde_json::to_value(coordinates).map_err(StoreError::from)?,
                    );
                }
                None => warn!(
                    listing_id = id,
                    address = %address.full_address,
                    "new address could not be geocoded, keeping coordinates"
                ),
            }
        }

        changes.retain(|field, value| document.get(field) != Some(&*value));
        if changes.is_empty() {
            return Err(ListingServiceError::NoChanges(id.to_string()));
        }
        let changed_fields: Vec<String> = changes.keys().cloned().collect();
        changes.insert(
            FIELD_UPDATED_AT.to_string(),
            serde_json::to_value(Utc::now()).map_err(StoreError::from)?,
        );

        let outcome = self.store.update_one(&key, changes).await?;
        if outcome.matched == 0 {
            return Err(ListingServiceError::NotFound(id.to_string()));
        }
        if outcome.modified == 0 {
            return Err(ListingServiceError::NoChanges(id.to_string()));
        }
        info!(
            listing_id = id,
            actor = %caller.id,
            fields = ?changed_fields,
            "listing updated"
        );

        let updated = self
            .store
            .find_one(&key)
            .await?
            .ok_or_else(|| ListingServiceError::NotFound(id.to_string()))?;
        Ok(decode_property(updated)?)
    }

    pub async fn delete(&self, caller: &Caller, id: &str) -> Result<(), ListingServiceError> {
        let ResolvedDocument { key, document } = self.resolve_existing(id).await?;
        self.authorize(caller, &document)?;

        let deleted = self.store.delete_one(&key).await?;
        if deleted == 0 {
            return Err(ListingServiceError::DeleteFailed(id.to_string()));
        }
        info!(listing_id = id, actor = %caller.id, "listing deleted");
        Ok(())
    }

    /// Runs the strict query and, only when it yields no decodable listing, the relaxed
    /// feature query.
    pub async fn search(
        &self,
        filters: &PropertySearchFilters,
    ) -> Result<Vec<Property>, ListingServiceError> {
        filters.validate()?;
        let plan = QueryPlan::for_filters(filters)?;
        debug!(filter = %plan.strict.to_filter_document(), "searching listings");

        let properties = decode_all(self.store.find(&plan.strict).await?);
        match &plan.relaxed {
            Some(relaxed) if properties.is_empty() => {
                debug!(
                    filter = %relaxed.to_filter_document(),
                    "strict feature match empty, retrying with substring match"
                );
                Ok(decode_all(self.store.find(relaxed).await?))
            }
            _ => Ok(properties),
        }
    }

    /// Every listing assigned to `agent_id`, whatever its status.
    pub async fn by_agent(&self, agent_id: &str) -> Result<Vec<Property>, ListingServiceError> {
        let documents = self.store.find(&PropertyQuery::owned_by(agent_id)).await?;
        Ok(decode_all(documents))
    }

    /// Listings assigned to the calling agent or admin.
    pub async fn owned_by_caller(
        &self,
        caller: &Caller,
    ) -> Result<Vec<Property>, ListingServiceError> {
        if !caller.role.is_staff() {
            return Err(ListingServiceError::Forbidden {
                actor: caller.id.clone(),
            });
        }
        self.by_agent(&caller.id).await
    }

    /// Available listings within `radius_miles` of `center`, in store order.
    pub async fn nearby(
        &self,
        center: &Coordinates,
        radius_miles: f64,
        limit: usize,
    ) -> Result<Vec<Property>, ListingServiceError> {
        let radius_miles = check_radius(radius_miles)?;
        let filters = PropertySearchFilters {
            bounds: Some(bounding_box(center, radius_miles)?),
            ..PropertySearchFilters::default()
        };

        let mut within = Vec::new();
        for candidate in self.search(&filters).await? {
            if within.len() >= limit {
                break;
            }
            let distance = self
                .geocoder
                .distance(center, &candidate.coordinates)
                .await?;
            if distance <= radius_miles {
                within.push(candidate);
            }
        }
        Ok(within)
    }

    /// Listings near an existing listing, excluding the listing itself.
    pub async fn nearby_listing(
        &self,
        id: &str,
        radius_miles: f64,
        limit: usize,
    ) -> Result<Vec<Property>, ListingServiceError> {
        let origin = self.get(id).await?;
        let mut nearby = self
            .nearby(&origin.coordinates, radius_miles, limit.saturating_add(1))
            .await?;
        nearby.retain(|candidate| candidate.id != origin.id);
        nearby.truncate(limit);
        Ok(nearby)
    }

    async fn resolve_existing(&self, id: &str) -> Result<ResolvedDocument, ListingServiceError> {
        resolve(self.store.as_ref(), id)
            .await?
            .ok_or_else(|| ListingServiceError::NotFound(id.to_string()))
    }

    fn authorize(&self, caller: &Caller, document: &Document) -> Result<(), ListingServiceError> {
        let owner = document.get("agent_id").and_then(Value::as_str);
        if can_write(caller.role, owner, &caller.id) {
            Ok(())
        } else {
            Err(ListingServiceError::Forbidden {
                actor: caller.id.clone(),
            })
        }
    }

    async fn locate(&self, address: &Address) -> Result<Coordinates, ListingServiceError> {
        self.geocoder
            .geocode(&address.full_address)
            .await?
            .ok_or_else(|| ListingServiceError::Ungeocodable(address.full_address.clone()))
    }
}

/// Supplied patch fields as a document; absent fields are omitted.
fn patch_document(patch: &PropertyPatch) -> Result<Document, StoreError> {
    match serde_json::to_value(patch)? {
        Value::Object(fields) => Ok(fields
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .collect()),
        other => Err(StoreError::Codec(format!(
            "listing patch encoded to a non-object value: {other}"
        ))),
    }
}

fn decode_all(documents: Vec<Document>) -> Vec<Property> {
    documents
        .into_iter()
        .filter_map(|document| match decode_property(document) {
            Ok(property) => Some(property),
            Err(error) => {
                warn!(error = %error, "skipping undecodable listing document");
                None
            }
        })
        .collect()
}

/// Approximate box around `center`: one degree of latitude is 69 miles and a degree of
/// longitude shrinks with `cos(latitude)`. Edges are clamped to valid coordinates.
pub fn bounding_box(center: &Coordinates, radius_miles: f64) -> Result<MapBounds, ListingViolation> {
    let lat_delta = radius_miles / MILES_PER_DEGREE;
    let lng_delta = radius_miles / (MILES_PER_DEGREE * center.latitude().to_radians().cos().abs());

    let southwest = Coordinates::new(
        (center.latitude() - lat_delta).clamp(-90.0, 90.0),
        (center.longitude() - lng_delta).clamp(-180.0, 180.0),
    )?;
    let northeast = Coordinates::new(
        (center.latitude() + lat_delta).clamp(-90.0, 90.0),
        (center.longitude() + lng_delta).clamp(-180.0, 180.0),
    )?;
    MapBounds::new(northeast, southwest)
}

/// Error raised by the listing service.
#[derive(Debug, thiserror::Error)]
pub enum ListingServiceError {
    #[error(transparent)]
    Validation(#[from] ListingViolation),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("listing {0} not found")]
    NotFound(String),
    #[error("{actor} is not allowed to modify this listing")]
    Forbidden { actor: String },
    #[error("update would not change listing {0}")]
    NoChanges(String),
    #[error("address could not be geocoded: {0}")]
    Ungeocodable(String),
    #[error(transparent)]
    Geocoding(#[from] GeocodingError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("listing {0} was found but could not be deleted")]
    DeleteFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(latitude: f64, longitude: f64) -> Coordinates {
        Coordinates::new(latitude, longitude).expect("valid coordinates")
    }

    #[test]
    fn bounding_box_uses_flat_degree_approximation() {
        let bounds = bounding_box(&point(0.0, 10.0), 69.0).expect("box builds");
        assert!((bounds.northeast().latitude() - 1.0).abs() < 1e-9);
        assert!((bounds.southwest().latitude() + 1.0).abs() < 1e-9);
        assert!((bounds.northeast().longitude() - 11.0).abs() < 1e-9);
        assert!((bounds.southwest().longitude() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn bounding_box_widens_longitude_away_from_equator() {
        let bounds = bounding_box(&point(60.0, 0.0), 69.0).expect("box builds");
        assert!((bounds.northeast().longitude() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn bounding_box_clamps_at_poles_and_antimeridian() {
        let bounds = bounding_box(&point(89.99, 179.99), 50.0).expect("box builds");
        assert_eq!(bounds.northeast().latitude(), 90.0);
        assert_eq!(bounds.northeast().longitude(), 180.0);
        assert_eq!(bounds.southwest().longitude(), -180.0);
    }

    #[test]
    fn patch_document_keeps_only_supplied_fields() {
        let patch = PropertyPatch {
            price: Some(250_000),
            features: Some(vec!["garden".to_string()]),
            ..PropertyPatch::default()
        };
        let document = patch_document(&patch).expect("patch encodes");
        let mut fields: Vec<_> = document.keys().cloned().collect();
        fields.sort();
        assert_eq!(fields, vec!["features".to_string(), "price".to_string()]);
    }
}
