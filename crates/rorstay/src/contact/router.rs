use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{
    parse_date_bound, ContactSubmission, ContactViolation, InquiryDraft, InquiryFilter,
    InquiryReply, SubmissionFilter, SubmissionStatus,
};
use super::repository::{ContactNotifier, ContactRepository, RepositoryError};
use super::service::{ContactError, ContactService};
use crate::users::Caller;

/// Router for the public contact form, the admin inbox and listing inquiries.
pub fn contact_router<R, N>(service: Arc<ContactService<R, N>>) -> Router
where
    R: ContactRepository + 'static,
    N: ContactNotifier + 'static,
{
    Router::new()
        .route("/api/contact", post(submit_handler::<R, N>))
        .route("/api/contact/submissions", get(submissions_handler::<R, N>))
        .route(
            "/api/contact/submissions/:id",
            delete(delete_submission_handler::<R, N>),
        )
        .route(
            "/api/contact/submissions/:id/status",
            put(submission_status_handler::<R, N>),
        )
        .route(
            "/api/inquiries",
            post(create_inquiry_handler::<R, N>).get(all_inquiries_handler::<R, N>),
        )
        .route("/api/inquiries/mine", get(my_inquiries_handler::<R, N>))
        .route("/api/inquiries/:id", get(inquiry_handler::<R, N>))
        .route(
            "/api/inquiries/:id/response",
            put(respond_handler::<R, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmissionQuery {
    #[serde(default)]
    status: Option<SubmissionStatus>,
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    from_date: Option<String>,
    #[serde(default)]
    to_date: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

impl SubmissionQuery {
    fn filter(&self) -> Result<SubmissionFilter, ContactViolation> {
        let bound = |field, raw: &Option<String>, end_of_day| {
            raw.as_deref()
                .filter(|raw| !raw.trim().is_empty())
                .map(|raw| parse_date_bound(field, raw, end_of_day))
                .transpose()
        };
        Ok(SubmissionFilter {
            status: self.status,
            text: self.q.clone(),
            created_from: bound("from_date", &self.from_date, false)?,
            created_to: bound("to_date", &self.to_date, true)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusChange {
    status: SubmissionStatus,
}

pub(crate) async fn submit_handler<R, N>(
    State(service): State<Arc<ContactService<R, N>>>,
    Json(submission): Json<ContactSubmission>,
) -> Response
where
    R: ContactRepository + 'static,
    N: ContactNotifier + 'static,
{
    match service.submit(submission) {
        Ok(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submissions_handler<R, N>(
    State(service): State<Arc<ContactService<R, N>>>,
    caller: Caller,
    Query(query): Query<SubmissionQuery>,
) -> Response
where
    R: ContactRepository + 'static,
    N: ContactNotifier + 'static,
{
    let filter = match query.filter() {
        Ok(filter) => filter,
        Err(violation) => return error_response(violation.into()),
    };
    match service.submissions(&caller, &filter, query.limit) {
        Ok(submissions) => (StatusCode::OK, Json(submissions)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_submission_handler<R, N>(
    State(service): State<Arc<ContactService<R, N>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Response
where
    R: ContactRepository + 'static,
    N: ContactNotifier + 'static,
{
    match service.delete_submission(&caller, &id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submission_status_handler<R, N>(
    State(service): State<Arc<ContactService<R, N>>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(change): Json<StatusChange>,
) -> Response
where
    R: ContactRepository + 'static,
    N: ContactNotifier + 'static,
{
    match service.set_submission_status(&caller, &id, change.status) {
        Ok(submission) => (StatusCode::OK, Json(submission)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_inquiry_handler<R, N>(
    State(service): State<Arc<ContactService<R, N>>>,
    caller: Caller,
    Json(draft): Json<InquiryDraft>,
) -> Response
where
    R: ContactRepository + 'static,
    N: ContactNotifier + 'static,
{
    match service.create_inquiry(&caller, draft) {
        Ok(inquiry) => (StatusCode::CREATED, Json(inquiry)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn my_inquiries_handler<R, N>(
    State(service): State<Arc<ContactService<R, N>>>,
    caller: Caller,
) -> Response
where
    R: ContactRepository + 'static,
    N: ContactNotifier + 'static,
{
    match service.my_inquiries(&caller) {
        Ok(inquiries) => (StatusCode::OK, Json(inquiries)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn all_inquiries_handler<R, N>(
    State(service): State<Arc<ContactService<R, N>>>,
    caller: Caller,
    Query(filter): Query<InquiryFilter>,
) -> Response
where
    R: ContactRepository + 'static,
    N: ContactNotifier + 'static,
{
    match service.all_inquiries(&caller, &filter) {
        Ok(inquiries) => (StatusCode::OK, Json(inquiries)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn inquiry_handler<R, N>(
    State(service): State<Arc<ContactService<R, N>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Response
where
    R: ContactRepository + 'static,
    N: ContactNotifier + 'static,
{
    match service.inquiry(&caller, &id) {
        Ok(inquiry) => (StatusCode::OK, Json(inquiry)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn respond_handler<R, N>(
    State(service): State<Arc<ContactService<R, N>>>,
    caller: Caller,
    Path(id): Path<String>,
    Json(reply): Json<InquiryReply>,
) -> Response
where
    R: ContactRepository + 'static,
    N: ContactNotifier + 'static,
{
    match service.respond(&caller, &id, reply) {
        Ok(inquiry) => (StatusCode::OK, Json(inquiry)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: ContactError) -> Response {
    let (status, message) = match &error {
        ContactError::Violation(violation) => {
            (StatusCode::UNPROCESSABLE_ENTITY, violation.to_string())
        }
        ContactError::Forbidden => (StatusCode::FORBIDDEN, error.to_string()),
        ContactError::NotFound(_) | ContactError::Repository(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, error.to_string())
        }
        ContactError::Repository(RepositoryError::Conflict) => {
            (StatusCode::CONFLICT, "record already exists".to_string())
        }
        ContactError::Repository(RepositoryError::Unavailable(_)) => {
            error!(error = %error, "contact repository failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
    };
    (status, Json(json!({ "error": message }))).into_response()
}
