use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::domain::{
    ContactReceipt, ContactSubmission, ContactViolation, Inquiry, InquiryDraft, InquiryFilter,
    InquiryReply, InquiryStatus, StoredSubmission, SubmissionFilter, SubmissionStatus,
};
use super::repository::{
    ContactNotice, ContactNotifier, ContactRepository, RepositoryError,
};
use crate::users::{Caller, UserRole};

pub const DEFAULT_SUBMISSION_LIMIT: usize = 50;
pub const MAX_SUBMISSION_LIMIT: usize = 200;

const RECEIPT_MESSAGE: &str = "Thank you for contacting us. We will get back to you shortly.";

/// Contact-form intake and listing inquiries.
pub struct ContactService<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
}

impl<R, N> ContactService<R, N>
where
    R: ContactRepository + 'static,
    N: ContactNotifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// Stores the submission and notifies staff. Spam is acknowledged the same way but
    /// neither stored nor forwarded.
    pub fn submit(&self, submission: ContactSubmission) -> Result<ContactReceipt, ContactError> {
        let id = Uuid::new_v4().to_string();
        if submission.is_spam() {
            info!(receipt = %id, "discarding contact submission caught by honeypot");
            return Ok(receipt(id));
        }
        submission.validate()?;

        let now = Utc::now();
        let stored = self.repository.insert_submission(StoredSubmission {
            id,
            name: submission.name.trim().to_string(),
            email: submission.email.trim().to_string(),
            phone: submission.phone,
            message: submission.message,
            property_id: submission.property_id,
            preferred_location: submission.preferred_location,
            map_pin: submission.map_pin,
            status: SubmissionStatus::New,
            created_at: now,
            updated_at: now,
        })?;

        if let Err(error) = self.notifier.notify(ContactNotice::for_submission(&stored)) {
            warn!(
                submission_id = %stored.id,
                error = %error,
                "contact notification failed"
            );
        }
        info!(submission_id = %stored.id, "contact submission stored");
        Ok(receipt(stored.id))
    }

    /// Admin view of submissions; `limit` is clamped to `1..=200`.
    pub fn submissions(
        &self,
        caller: &Caller,
        filter: &SubmissionFilter,
        limit: Option<usize>,
    ) -> Result<Vec<StoredSubmission>, ContactError> {
        require_admin(caller)?;
        let limit = limit
            .unwrap_or(DEFAULT_SUBMISSION_LIMIT)
            .clamp(1, MAX_SUBMISSION_LIMIT);
        Ok(self.repository.submissions(filter, limit)?)
    }

    pub fn delete_submission(&self, caller: &Caller, id: &str) -> Result<(), ContactError> {
        require_admin(caller)?;
        if !self.repository.delete_submission(id)? {
            return Err(ContactError::NotFound(id.to_string()));
        }
        info!(submission_id = id, actor = %caller.id, "submission deleted");
        Ok(())
    }

    pub fn set_submission_status(
        &self,
        caller: &Caller,
        id: &str,
        status: SubmissionStatus,
    ) -> Result<StoredSubmission, ContactError> {
        require_admin(caller)?;
        let updated = self
            .repository
            .set_submission_status(id, status, Utc::now())?
            .ok_or_else(|| ContactError::NotFound(id.to_string()))?;
        info!(submission_id = id, status = status.label(), "submission status changed");
        Ok(updated)
    }

    /// Records an inquiry on behalf of the caller, whatever user id the payload names.
    pub fn create_inquiry(
        &self,
        caller: &Caller,
        draft: InquiryDraft,
    ) -> Result<Inquiry, ContactError> {
        draft.validate()?;
        let now = Utc::now();
        let inquiry = self.repository.insert_inquiry(Inquiry {
            id: Uuid::new_v4().to_string(),
            property_id: draft.property_id,
            user_id: caller.id.clone(),
            message: draft.message,
            contact_method: draft.contact_method,
            status: InquiryStatus::New,
            response: None,
            created_at: now,
            updated_at: now,
        })?;
        info!(
            inquiry_id = %inquiry.id,
            property_id = %inquiry.property_id,
            "inquiry created"
        );
        Ok(inquiry)
    }

    pub fn my_inquiries(&self, caller: &Caller) -> Result<Vec<Inquiry>, ContactError> {
        Ok(self.repository.inquiries_for_user(&caller.id)?)
    }

    pub fn all_inquiries(
        &self,
        caller: &Caller,
        filter: &InquiryFilter,
    ) -> Result<Vec<Inquiry>, ContactError> {
        require_admin(caller)?;
        Ok(self.repository.inquiries(filter)?)
    }

    /// Admins see any inquiry, everyone else only their own.
    pub fn inquiry(&self, caller: &Caller, id: &str) -> Result<Inquiry, ContactError> {
        let inquiry = self
            .repository
            .inquiry(id)?
            .ok_or_else(|| ContactError::NotFound(id.to_string()))?;
        if caller.role != UserRole::Admin && inquiry.user_id != caller.id {
            return Err(ContactError::Forbidden);
        }
        Ok(inquiry)
    }

    /// Staff reply; moves the inquiry to `contacted` unless another status is given.
    pub fn respond(
        &self,
        caller: &Caller,
        id: &str,
        reply: InquiryReply,
    ) -> Result<Inquiry, ContactError> {
        if !caller.role.is_staff() {
            return Err(ContactError::Forbidden);
        }
        if reply.response.trim().is_empty() {
            return Err(ContactViolation::Blank("response").into());
        }

        let mut inquiry = self
            .repository
            .inquiry(id)?
            .ok_or_else(|| ContactError::NotFound(id.to_string()))?;
        inquiry.response = Some(reply.response);
        inquiry.status = reply.status.unwrap_or(InquiryStatus::Contacted);
        inquiry.updated_at = Utc::now();
        self.repository.update_inquiry(inquiry.clone())?;
        Ok(inquiry)
    }
}

fn receipt(id: String) -> ContactReceipt {
    ContactReceipt {
        id,
        message: RECEIPT_MESSAGE.to_string(),
    }
}

fn require_admin(caller: &Caller) -> Result<(), ContactError> {
    if caller.role == UserRole::Admin {
        Ok(())
    } else {
        Err(ContactError::Forbidden)
    }
}

/// Error raised by the contact service.
#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    #[error(transparent)]
    Violation(#[from] ContactViolation),
    #[error("not allowed")]
    Forbidden,
    #[error("record {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
