//! Translation of [`PropertySearchFilters`] into store predicates.
//!
//! A [`QueryPlan`] carries the strict query and, when feature filters are present, the
//! relaxed variant the service falls back to if the strict query matches nothing.

use regex::{Regex, RegexBuilder};
use serde_json::{json, Map, Value};

use super::domain::PropertySearchFilters;

/// Ceiling on documents returned by a single query.
pub const RESULT_LIMIT: usize = 1000;

pub(crate) const FIELD_LATITUDE: &str = "coordinates.latitude";
pub(crate) const FIELD_LONGITUDE: &str = "coordinates.longitude";
pub(crate) const FIELD_PROPERTY_TYPE: &str = "property_type";
pub(crate) const FIELD_PRICE: &str = "price";
pub(crate) const FIELD_BEDROOMS: &str = "bedrooms";
pub(crate) const FIELD_BATHROOMS: &str = "bathrooms";
pub(crate) const FIELD_SQUARE_FEET: &str = "square_feet";
pub(crate) const FIELD_FEATURES: &str = "features";
pub(crate) const FIELD_STATUS: &str = "status";
pub(crate) const FIELD_CITY: &str = "address.city";
pub(crate) const FIELD_STATE: &str = "address.state";
pub(crate) const FIELD_AGENT_ID: &str = "agent_id";

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("filter value '{value}' cannot be matched: {source}")]
    Pattern { value: String, source: regex::Error },
}

/// How feature tags are compared against stored tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureMatch {
    /// Case-insensitive equality with a stored tag.
    Strict,
    /// Case-insensitive containment of the filter value within a stored tag.
    Relaxed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatch {
    Exact,
    Contains,
}

/// Case-insensitive text pattern, compiled once per query.
#[derive(Debug, Clone)]
pub struct TextPattern {
    value: String,
    mode: TextMatch,
    regex: Regex,
}

impl PartialEq for TextPattern {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.mode == other.mode
    }
}

impl TextPattern {
    pub fn new(value: &str, mode: TextMatch) -> Result<Self, QueryError> {
        let source = Self::source_for(value, mode);
        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|source| QueryError::Pattern {
                value: value.to_string(),
                source,
            })?;

        Ok(Self {
            value: value.to_string(),
            mode,
            regex,
        })
    }

    fn source_for(value: &str, mode: TextMatch) -> String {
        let escaped = regex::escape(value);
        match mode {
            TextMatch::Exact => format!("^{escaped}$"),
            TextMatch::Contains => escaped,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn mode(&self) -> TextMatch {
        self.mode
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }

    fn to_filter(&self) -> Value {
        json!({ "$regex": self.regex.as_str(), "$options": "i" })
    }
}

/// Constraint applied to a single document field.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Inclusive numeric range; missing or non-numeric values never match.
    Range { min: Option<f64>, max: Option<f64> },
    AnyOf(Vec<String>),
    Equals(String),
    Text(TextPattern),
    /// Array field where every pattern matches at least one element.
    ContainsAll(Vec<TextPattern>),
}

impl Predicate {
    fn matches(&self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            return false;
        };

        match self {
            Predicate::Range { min, max } => match value.as_f64() {
                Some(number) => {
                    min.map_or(true, |min| number >= min) && max.map_or(true, |max| number <= max)
                }
                None => false,
            },
            Predicate::AnyOf(options) => value
                .as_str()
                .is_some_and(|text| options.iter().any(|option| option == text)),
            Predicate::Equals(expected) => value.as_str() == Some(expected.as_str()),
            Predicate::Text(pattern) => value.as_str().is_some_and(|text| pattern.is_match(text)),
            Predicate::ContainsAll(patterns) => match value.as_array() {
                Some(elements) => patterns.iter().all(|pattern| {
                    elements
                        .iter()
                        .filter_map(Value::as_str)
                        .any(|element| pattern.is_match(element))
                }),
                None => false,
            },
        }
    }

    fn to_filter(&self) -> Value {
        match self {
            Predicate::Range { min, max } => {
                let mut range = Map::new();
                if let Some(min) = min {
                    range.insert("$gte".to_string(), json!(min));
                }
                if let Some(max) = max {
                    range.insert("$lte".to_string(), json!(max));
                }
                Value::Object(range)
            }
            Predicate::AnyOf(options) => json!({ "$in": options }),
            Predicate::Equals(expected) => json!(expected),
            Predicate::Text(pattern) => pattern.to_filter(),
            Predicate::ContainsAll(patterns) => {
                let all: Vec<Value> = patterns.iter().map(TextPattern::to_filter).collect();
                json!({ "$all": all })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub field: &'static str,
    pub predicate: Predicate,
}

/// Conjunction of field clauses plus a result ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyQuery {
    clauses: Vec<Clause>,
    limit: usize,
}

impl Default for PropertyQuery {
    fn default() -> Self {
        Self {
            clauses: Vec::new(),
            limit: RESULT_LIMIT,
        }
    }
}

impl PropertyQuery {
    /// Builds the query for `filters`, comparing features with `features`.
    pub fn from_filters(
        filters: &PropertySearchFilters,
        features: FeatureMatch,
    ) -> Result<Self, QueryError> {
        let mut query = Self::default();

        if let Some(bounds) = &filters.bounds {
            query.push(
                FIELD_LATITUDE,
                Predicate::Range {
                    min: Some(bounds.southwest().latitude()),
                    max: Some(bounds.northeast().latitude()),
                },
            );
            query.push(
                FIELD_LONGITUDE,
                Predicate::Range {
                    min: Some(bounds.southwest().longitude()),
                    max: Some(bounds.northeast().longitude()),
                },
            );
        }

        if !filters.property_types.is_empty() {
            query.push(
                FIELD_PROPERTY_TYPE,
                Predicate::AnyOf(
                    filters
                        .property_types
                        .iter()
                        .map(|kind| kind.label().to_string())
                        .collect(),
                ),
            );
        }

        query.push_range(
            FIELD_PRICE,
            filters.min_price.map(|value| value as f64),
            filters.max_price.map(|value| value as f64),
        );
        query.push_range(
            FIELD_BEDROOMS,
            filters.min_bedrooms.map(f64::from),
            filters.max_bedrooms.map(f64::from),
        );
        query.push_range(FIELD_BATHROOMS, filters.min_bathrooms, filters.max_bathrooms);

        let required = filters.required_features();
        if !required.is_empty() {
            let mode = match features {
                FeatureMatch::Strict => TextMatch::Exact,
                FeatureMatch::Relaxed => TextMatch::Contains,
            };
            let patterns = required
                .into_iter()
                .map(|feature| TextPattern::new(feature, mode))
                .collect::<Result<Vec<_>, _>>()?;
            query.push(FIELD_FEATURES, Predicate::ContainsAll(patterns));
        }

        query.push_range(
            FIELD_SQUARE_FEET,
            filters.min_square_feet.map(f64::from),
            filters.max_square_feet.map(f64::from),
        );

        if !filters.status.is_empty() {
            query.push(
                FIELD_STATUS,
                Predicate::AnyOf(
                    filters
                        .status
                        .iter()
                        .map(|status| status.label().to_string())
                        .collect(),
                ),
            );
        }

        if let Some(city) = filters.city.as_deref().filter(|city| !city.is_empty()) {
            query.push(
                FIELD_CITY,
                Predicate::Text(TextPattern::new(city, TextMatch::Exact)?),
            );
        }
        if let Some(state) = filters.state.as_deref().filter(|state| !state.is_empty()) {
            query.push(
                FIELD_STATE,
                Predicate::Text(TextPattern::new(state, TextMatch::Exact)?),
            );
        }

        Ok(query)
    }

    /// Every listing whose `agent_id` equals `agent_id`, regardless of status.
    pub fn owned_by(agent_id: &str) -> Self {
        let mut query = Self::default();
        query.push(FIELD_AGENT_ID, Predicate::Equals(agent_id.to_string()));
        query
    }

    fn push(&mut self, field: &'static str, predicate: Predicate) {
        self.clauses.push(Clause { field, predicate });
    }

    /// A zero lower bound constrains nothing and is dropped, so listings without the
    /// field (commercial units have no bedrooms) still match.
    fn push_range(&mut self, field: &'static str, min: Option<f64>, max: Option<f64>) {
        let min = min.filter(|value| *value > 0.0);
        if min.is_some() || max.is_some() {
            self.push(field, Predicate::Range { min, max });
        }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn clause(&self, field: &str) -> Option<&Predicate> {
        self.clauses
            .iter()
            .find(|clause| clause.field == field)
            .map(|clause| &clause.predicate)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_unconstrained(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, document: &Map<String, Value>) -> bool {
        self.clauses
            .iter()
            .all(|clause| clause.predicate.matches(lookup(document, clause.field)))
    }

    /// Renders the query in the `$gte`/`$in`/`$regex` dialect understood by document stores.
    pub fn to_filter_document(&self) -> Value {
        let filter: Map<String, Value> = self
            .clauses
            .iter()
            .map(|clause| (clause.field.to_string(), clause.predicate.to_filter()))
            .collect();
        Value::Object(filter)
    }
}

fn lookup<'a>(document: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = document.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Strict query plus the relaxed fallback used only when the strict query finds nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub strict: PropertyQuery,
    pub relaxed: Option<PropertyQuery>,
}

impl QueryPlan {
    pub fn for_filters(filters: &PropertySearchFilters) -> Result<Self, QueryError> {
        let strict = PropertyQuery::from_filters(filters, FeatureMatch::Strict)?;
        let relaxed = if filters.required_features().is_empty() {
            None
        } else {
            Some(PropertyQuery::from_filters(filters, FeatureMatch::Relaxed)?)
        };
        Ok(Self { strict, relaxed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listings::domain::{Coordinates, MapBounds, PropertyStatus, PropertyType};

    fn document(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn listing() -> Map<String, Value> {
        document(json!({
            "id": "a1",
            "property_type": "condo",
            "status": "available",
            "price": 425000,
            "bedrooms": 2,
            "bathrooms": 2.0,
            "square_feet": 1100,
            "features": ["Parking", "GYM", "pool", "nearby:subway"],
            "address": { "city": "Chicago", "state": "IL" },
            "coordinates": { "latitude": 41.88, "longitude": -87.63 },
            "agent_id": "agent-7"
        }))
    }

    #[test]
    fn empty_filters_only_constrain_status() {
        let query = PropertyQuery::from_filters(
            &PropertySearchFilters::default(),
            FeatureMatch::Strict,
        )
        .expect("query builds");
        assert_eq!(query.clauses().len(), 1);
        assert_eq!(
            query.clause(FIELD_STATUS),
            Some(&Predicate::AnyOf(vec!["available".to_string()]))
        );
        assert_eq!(query.limit(), RESULT_LIMIT);
    }

    #[test]
    fn explicit_empty_status_list_is_unconstrained() {
        let filters = PropertySearchFilters {
            status: Vec::new(),
            ..PropertySearchFilters::default()
        };
        let query =
            PropertyQuery::from_filters(&filters, FeatureMatch::Strict).expect("query builds");
        assert!(query.is_unconstrained());
    }

    #[test]
    fn bounds_become_inclusive_ranges() {
        let bounds = MapBounds::new(
            Coordinates::new(41.88, -87.0).expect("valid"),
            Coordinates::new(41.0, -87.63).expect("valid"),
        )
        .expect("valid bounds");
        let filters = PropertySearchFilters {
            bounds: Some(bounds),
            ..PropertySearchFilters::default()
        };
        let query =
            PropertyQuery::from_filters(&filters, FeatureMatch::Strict).expect("query builds");
        assert_eq!(
            query.clause(FIELD_LATITUDE),
            Some(&Predicate::Range {
                min: Some(41.0),
                max: Some(41.88)
            })
        );
        assert!(query.matches(&listing()), "edges are inclusive");
    }

    #[test]
    fn city_and_state_match_case_insensitively_but_anchored() {
        let filters = PropertySearchFilters {
            city: Some("chicago".to_string()),
            state: Some("il".to_string()),
            ..PropertySearchFilters::default()
        };
        let query =
            PropertyQuery::from_filters(&filters, FeatureMatch::Strict).expect("query builds");
        assert!(query.matches(&listing()));

        let partial = PropertySearchFilters {
            city: Some("Chi".to_string()),
            ..PropertySearchFilters::default()
        };
        let query =
            PropertyQuery::from_filters(&partial, FeatureMatch::Strict).expect("query builds");
        assert!(!query.matches(&listing()), "city is not a substring match");
    }

    #[test]
    fn strict_features_require_every_tag_exactly() {
        let filters = PropertySearchFilters {
            features: vec!["parking".to_string(), "gym".to_string()],
            ..PropertySearchFilters::default()
        };
        let strict =
            PropertyQuery::from_filters(&filters, FeatureMatch::Strict).expect("query builds");
        assert!(strict.matches(&listing()));

        let missing = PropertySearchFilters {
            features: vec!["parking".to_string(), "sauna".to_string()],
            ..PropertySearchFilters::default()
        };
        let strict =
            PropertyQuery::from_filters(&missing, FeatureMatch::Strict).expect("query builds");
        assert!(!strict.matches(&listing()));
    }

    #[test]
    fn relaxed_features_use_containment() {
        let filters = PropertySearchFilters {
            features: vec!["subway".to_string()],
            ..PropertySearchFilters::default()
        };
        let plan = QueryPlan::for_filters(&filters).expect("plan builds");
        assert!(!plan.strict.matches(&listing()));
        let relaxed = plan.relaxed.expect("features produce a relaxed query");
        assert!(relaxed.matches(&listing()));

        let spaced = PropertySearchFilters {
            features: vec!["near subway".to_string()],
            ..PropertySearchFilters::default()
        };
        let relaxed = QueryPlan::for_filters(&spaced)
            .expect("plan builds")
            .relaxed
            .expect("relaxed query present");
        assert!(!relaxed.matches(&listing()));
    }

    #[test]
    fn no_relaxed_query_without_features() {
        let plan = QueryPlan::for_filters(&PropertySearchFilters::default()).expect("plan builds");
        assert!(plan.relaxed.is_none());
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let filters = PropertySearchFilters {
            features: vec!["pool.*".to_string()],
            ..PropertySearchFilters::default()
        };
        let plan = QueryPlan::for_filters(&filters).expect("plan builds");
        assert!(!plan.strict.matches(&listing()));
        assert!(!plan.relaxed.expect("relaxed").matches(&listing()));
    }

    #[test]
    fn ranges_skip_missing_values() {
        let filters = PropertySearchFilters {
            min_bedrooms: Some(1),
            ..PropertySearchFilters::default()
        };
        let query =
            PropertyQuery::from_filters(&filters, FeatureMatch::Strict).expect("query builds");
        let mut studio = listing();
        studio.insert("bedrooms".to_string(), Value::Null);
        assert!(!query.matches(&studio));
        assert!(query.matches(&listing()));
    }

    #[test]
    fn zero_lower_bounds_are_ignored() {
        let filters = PropertySearchFilters {
            min_bedrooms: Some(0),
            min_bathrooms: Some(0.0),
            min_price: Some(0),
            ..PropertySearchFilters::default()
        };
        let query =
            PropertyQuery::from_filters(&filters, FeatureMatch::Strict).expect("query builds");
        assert_eq!(query.clause(FIELD_BEDROOMS), None);
        assert_eq!(query.clause(FIELD_BATHROOMS), None);
        assert_eq!(query.clause(FIELD_PRICE), None);

        let mut office = listing();
        office.insert("property_type".to_string(), json!("commercial"));
        office.insert("bedrooms".to_string(), Value::Null);
        office.insert("bathrooms".to_string(), Value::Null);
        assert!(query.matches(&office));
    }

    #[test]
    fn zero_upper_bound_still_applies() {
        let filters = PropertySearchFilters {
            min_bedrooms: Some(0),
            max_bedrooms: Some(0),
            ..PropertySearchFilters::default()
        };
        let query =
            PropertyQuery::from_filters(&filters, FeatureMatch::Strict).expect("query builds");
        assert_eq!(
            query.clause(FIELD_BEDROOMS),
            Some(&Predicate::Range {
                min: None,
                max: Some(0.0)
            })
        );
        assert!(!query.matches(&listing()));
    }

    #[test]
    fn combines_type_price_and_size_constraints() {
        let filters = PropertySearchFilters {
            property_types: vec![PropertyType::House, PropertyType::Condo],
            min_price: Some(400_000),
            max_price: Some(450_000),
            max_square_feet: Some(1_000),
            status: vec![PropertyStatus::Available, PropertyStatus::Pending],
            ..PropertySearchFilters::default()
        };
        let query =
            PropertyQuery::from_filters(&filters, FeatureMatch::Strict).expect("query builds");
        assert!(!query.matches(&listing()), "1100 sq ft exceeds the cap");

        let mut smaller = listing();
        smaller.insert("square_feet".to_string(), json!(950));
        assert!(query.matches(&smaller));
    }

    #[test]
    fn renders_store_filter_document() {
        let filters = PropertySearchFilters {
            min_price: Some(100),
            city: Some("Austin".to_string()),
            features: vec!["pool".to_string()],
            ..PropertySearchFilters::default()
        };
        let query =
            PropertyQuery::from_filters(&filters, FeatureMatch::Strict).expect("query builds");
        let rendered = query.to_filter_document();
        assert_eq!(rendered["price"], json!({ "$gte": 100.0 }));
        assert_eq!(
            rendered["address.city"],
            json!({ "$regex": "^Austin$", "$options": "i" })
        );
        assert_eq!(
            rendered["features"],
            json!({ "$all": [{ "$regex": "^pool$", "$options": "i" }] })
        );
        assert_eq!(rendered["status"], json!({ "$in": ["available"] }));
    }

    #[test]
    fn owned_by_matches_agent_only() {
        let query = PropertyQuery::owned_by("agent-7");
        assert!(query.matches(&listing()));
        assert!(!PropertyQuery::owned_by("agent-8").matches(&listing()));
    }
}
