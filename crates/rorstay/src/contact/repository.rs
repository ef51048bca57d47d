use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Inquiry, InquiryFilter, StoredSubmission, SubmissionFilter, SubmissionStatus,
};

/// Storage for contact submissions and inquiries.
pub trait ContactRepository: Send + Sync {
    fn insert_submission(
        &self,
        submission: StoredSubmission,
    ) -> Result<StoredSubmission, RepositoryError>;
    /// Newest first, only those matching `filter`, at most `limit` entries.
    fn submissions(
        &self,
        filter: &SubmissionFilter,
        limit: usize,
    ) -> Result<Vec<StoredSubmission>, RepositoryError>;
    fn set_submission_status(
        &self,
        id: &str,
        status: SubmissionStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<StoredSubmission>, RepositoryError>;
    /// Returns whether a submission was removed.
    fn delete_submission(&self, id: &str) -> Result<bool, RepositoryError>;
    fn insert_inquiry(&self, inquiry: Inquiry) -> Result<Inquiry, RepositoryError>;
    fn inquiry(&self, id: &str) -> Result<Option<Inquiry>, RepositoryError>;
    fn update_inquiry(&self, inquiry: Inquiry) -> Result<(), RepositoryError>;
    fn inquiries_for_user(&self, user_id: &str) -> Result<Vec<Inquiry>, RepositoryError>;
    /// Newest first.
    fn inquiries(&self, filter: &InquiryFilter) -> Result<Vec<Inquiry>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for staff notifications; e-mail delivery lives behind it.
pub trait ContactNotifier: Send + Sync {
    fn notify(&self, notice: ContactNotice) -> Result<(), NotifierError>;
}

/// What staff are told about a new submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactNotice {
    pub submission_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub property_id: Option<String>,
    pub summary: String,
}

impl ContactNotice {
    const SUMMARY_CHARS: usize = 140;

    pub fn for_submission(submission: &StoredSubmission) -> Self {
        Self {
            submission_id: submission.id.clone(),
            name: submission.name.clone(),
            email: submission.email.clone(),
            phone: submission.phone.digits().to_string(),
            property_id: submission.property_id.clone(),
            summary: submission.message.chars().take(Self::SUMMARY_CHARS).collect(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
