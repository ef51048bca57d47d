//! Property listings: entity model, query builder, repository service and routes.

pub mod domain;
pub(crate) mod identity;
pub mod params;
pub mod permissions;
pub mod query;
pub mod router;
pub mod seed;
pub mod service;
pub mod store;
pub mod validation;

pub use domain::{
    Address, Coordinates, MapBounds, Property, PropertyDraft, PropertyPatch,
    PropertySearchFilters, PropertyStatus, PropertyType, DEFAULT_COUNTRY,
};
pub use permissions::can_write;
pub use query::{FeatureMatch, PropertyQuery, QueryError, QueryPlan, RESULT_LIMIT};
pub use router::listing_router;
pub use seed::{SeedError, SeedReport};
pub use service::{bounding_box, ListingServiceError, PropertyService};
pub use store::{
    Document, DocumentKey, MemoryPropertyStore, PropertyStore, StoreError, StoreId,
    UpdateOutcome,
};
pub use validation::ListingViolation;
