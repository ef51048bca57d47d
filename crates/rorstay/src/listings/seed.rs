//! CSV import of sample listings.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use tracing::{info, warn};

use super::domain::{Address, Coordinates, PropertyDraft, PropertyStatus, PropertyType};
use super::service::PropertyService;
use super::store::PropertyStore;
use super::validation::ListingViolation;
use crate::geocoding::Geocoder;
use crate::users::Caller;

/// Separator between feature tags inside the `features` column.
const FEATURE_SEPARATOR: char = '|';

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to open seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read seed rows: {0}")]
    Csv(#[from] csv::Error),
    #[error("seed row {line}: {source}")]
    Row {
        line: usize,
        #[source]
        source: ListingViolation,
    },
}

/// Outcome of a seed import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub rejected: usize,
}

#[derive(Debug, Deserialize)]
struct SeedRow {
    title: String,
    property_type: PropertyType,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    status: Option<String>,
    price: u64,
    #[serde(default)]
    bedrooms: Option<u32>,
    #[serde(default)]
    bathrooms: Option<f64>,
    #[serde(default)]
    square_feet: Option<u32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    description: Option<String>,
    #[serde(default)]
    features: String,
    street: String,
    city: String,
    state: String,
    zip_code: String,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    contact_phone: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    contact_email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    agent_id: Option<String>,
}

impl SeedRow {
    fn into_draft(self) -> Result<PropertyDraft, ListingViolation> {
        let coordinates = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)?),
            _ => None,
        };
        let status = match self.status.as_deref() {
            Some(raw) => PropertyStatus::parse(raw)
                .ok_or_else(|| ListingViolation::UnknownStatus(raw.to_string()))?,
            None => PropertyStatus::Available,
        };
        let features = self
            .features
            .split(FEATURE_SEPARATOR)
            .map(str::trim)
            .filter(|feature| !feature.is_empty())
            .map(str::to_string)
            .collect();

        Ok(PropertyDraft {
            title: self.title,
            property_type: self.property_type,
            status,
            price: self.price,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            square_feet: self.square_feet,
            description: self.description,
            features,
            images: Vec::new(),
            address: Address::new(self.street, self.city, self.state, self.zip_code),
            coordinates,
            contact_phone: self.contact_phone,
            alternative_phone: None,
            contact_email: self.contact_email,
            agent_id: self.agent_id,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Parses every row into a draft. Line numbers in errors count the header as line 1.
pub fn parse_drafts<R: Read>(reader: R) -> Result<Vec<PropertyDraft>, SeedError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut drafts = Vec::new();

    for (index, record) in csv_reader.deserialize::<SeedRow>().enumerate() {
        let row = record?;
        let draft = row.into_draft().map_err(|source| SeedError::Row {
            line: index + 2,
            source,
        })?;
        drafts.push(draft);
    }

    Ok(drafts)
}

/// Creates each listing through the service as `caller`. Rows the service rejects are
/// logged and counted, not fatal.
pub async fn import<S, G, R>(
    service: &PropertyService<S, G>,
    caller: &Caller,
    reader: R,
) -> Result<SeedReport, SeedError>
where
    S: PropertyStore + 'static,
    G: Geocoder + 'static,
    R: Read,
{
    let mut report = SeedReport::default();
    for draft in parse_drafts(reader)? {
        let title = draft.title.clone();
        match service.create(caller, draft).await {
            Ok(_) => report.created += 1,
            Err(error) => {
                warn!(title = %title, error = %error, "seed listing rejected");
                report.rejected += 1;
            }
        }
    }
    info!(
        created = report.created,
        rejected = report.rejected,
        "seed import finished"
    );
    Ok(report)
}

pub async fn import_file<S, G>(
    service: &PropertyService<S, G>,
    caller: &Caller,
    path: &Path,
) -> Result<SeedReport, SeedError>
where
    S: PropertyStore + 'static,
    G: Geocoder + 'static,
{
    let file = std::fs::File::open(path)?;
    import(service, caller, file).await
}
