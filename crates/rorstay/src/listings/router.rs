use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::error;

use super::domain::{PropertyDraft, PropertyPatch, PropertySearchFilters};
use super::params::{search_filters, NearbyParams, ParamError, RadiusParams};
use super::service::{ListingServiceError, PropertyService};
use super::store::PropertyStore;
use crate::geocoding::Geocoder;
use crate::users::Caller;

/// Router exposing listing CRUD, search and proximity endpoints.
pub fn listing_router<S, G>(service: Arc<PropertyService<S, G>>) -> Router
where
    S: PropertyStore + 'static,
    G: Geocoder + 'static,
{
    Router::new()
        .route("/api/properties", post(create_handler::<S, G>))
        .route(
            "/api/properties/search",
            get(search_handler::<S, G>).post(search_body_handler::<S, G>),
        )
        .route("/api/properties/nearby", get(nearby_handler::<S, G>))
        .route("/api/properties/my/properties", get(mine_handler::<S, G>))
        .route(
            "/api/properties/agent/:agent_id",
            get(agent_handler::<S, G>),
        )
        .route(
            "/api/properties/:id",
            get(get_handler::<S, G>)
                .put(update_handler::<S, G>)
                .delete(delete_handler::<S, G>),
        )
        .route(
            "/api/properties/:id/nearby",
            get(nearby_listing_handler::<S, G>),
        )
        .with_state(service)
}

type SharedService<S, G> = State<Arc<PropertyService<S, G>>>;

pub(crate) async fn create_handler<S, G>(
    State(service): SharedService<S, G>,
    caller: Caller,
    Json(draft): Json<PropertyDraft>,
) -> Response
where
    S: PropertyStore + 'static,
    G: Geocoder + 'static,
{
    match service.create(&caller, draft).await {
        Ok(property) => (StatusCode::CREATED, Json(property)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_handler<S, G>(
    State(service): SharedService<S, G>,
    Path(id): Path<String>,
) -> Response
where
    S: PropertyStore + 'static,
    G: Geocoder + 'static,
{
    match service.get(&id).await {
        Ok(property) => (StatusCode::OK, Json(property)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_handler<S, G>(
    State(service): SharedService<S, G>,
    caller: Caller,
    Path(id): Path<String>,
    Json(patch): Json<PropertyPatch>,
) -> Response
where
    S: PropertyStore + 'static,
    G: Geocoder + 'static,
{
    match service.update(&caller, &id, patch).await {
        Ok(property) => (StatusCode::OK, Json(property)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_handler<S, G>(
    State(service): SharedService<S, G>,
    caller: Caller,
    Path(id): Path<String>,
) -> Response
where
    S: PropertyStore + 'static,
    G: Geocoder + 'static,
{
    match service.delete(&caller, &id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn search_handler<S, G>(
    State(service): SharedService<S, G>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response
where
    S: PropertyStore + 'static,
    G: Geocoder + 'static,
{
    let filters = match search_filters(&pairs) {
        Ok(filters) => filters,
        Err(error) => return param_error(error),
    };
    match service.search(&filters).await {
        Ok(properties) => (StatusCode::OK, Json(properties)).into_response(),
        Err(error) => error_response(error),
    }
}

/// Map-driven search; accepts the filters as a JSON body so bounds can be nested.
pub(crate) async fn search_body_handler<S, G>(
    State(service): SharedService<S, G>,
    Json(filters): Json<PropertySearchFilters>,
) -> Response
where
    S: PropertyStore + 'static,
    G: Geocoder + 'static,
{
    match service.search(&filters).await {
        Ok(properties) => (StatusCode::OK, Json(properties)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn nearby_handler<S, G>(
    State(service): SharedService<S, G>,
    Query(params): Query<NearbyParams>,
) -> Response
where
    S: PropertyStore + 'static,
    G: Geocoder + 'static,
{
    let resolved = params
        .center()
        .and_then(|center| params.radius().resolve().map(|bounds| (center, bounds)));
    let (center, (radius, limit)) = match resolved {
        Ok(resolved) => resolved,
        Err(error) => return param_error(error),
    };
    match service.nearby(&center, radius, limit).await {
        Ok(properties) => (StatusCode::OK, Json(properties)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn nearby_listing_handler<S, G>(
    State(service): SharedService<S, G>,
    Path(id): Path<String>,
    Query(params): Query<RadiusParams>,
) -> Response
where
    S: PropertyStore + 'static,
    G: Geocoder + 'static,
{
    let (radius, limit) = match params.resolve() {
        Ok(resolved) => resolved,
        Err(error) => return param_error(error),
    };
    match service.nearby_listing(&id, radius, limit).await {
        Ok(properties) => (StatusCode::OK, Json(properties)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn agent_handler<S, G>(
    State(service): SharedService<S, G>,
    Path(agent_id): Path<String>,
) -> Response
where
    S: PropertyStore + 'static,
    G: Geocoder + 'static,
{
    match service.by_agent(&agent_id).await {
        Ok(properties) => (StatusCode::OK, Json(properties)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn mine_handler<S, G>(
    State(service): SharedService<S, G>,
    caller: Caller,
) -> Response
where
    S: PropertyStore + 'static,
    G: Geocoder + 'static,
{
    match service.owned_by_caller(&caller).await {
        Ok(properties) => (StatusCode::OK, Json(properties)).into_response(),
        Err(error) => error_response(error),
    }
}

fn param_error(error: ParamError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

/// Status code for each service failure. Store failures keep their detail in the logs.
pub fn status_for(error: &ListingServiceError) -> StatusCode {
    match error {
        ListingServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ListingServiceError::Query(_)
        | ListingServiceError::NoChanges(_)
        | ListingServiceError::Ungeocodable(_) => StatusCode::BAD_REQUEST,
        ListingServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ListingServiceError::Forbidden { .. } => StatusCode::FORBIDDEN,
        ListingServiceError::Geocoding(_) => StatusCode::BAD_GATEWAY,
        ListingServiceError::Store(_) | ListingServiceError::DeleteFailed(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(error: ListingServiceError) -> Response {
    let status = status_for(&error);
    let message = match &error {
        ListingServiceError::Store(_) | ListingServiceError::DeleteFailed(_) => {
            error!(error = %error, "listing store failure");
            "internal server error".to_string()
        }
        ListingServiceError::Geocoding(_) => {
            error!(error = %error, "geocoding provider failure");
            "geocoding service unavailable".to_string()
        }
        _ => error.to_string(),
    };
    (status, Json(json!({ "error": message }))).into_response()
}
