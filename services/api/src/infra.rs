use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use rorstay::contact::{
    ContactNotice, ContactNotifier, ContactRepository, ContactService, Inquiry, InquiryFilter,
    NotifierError, RepositoryError, StoredSubmission, SubmissionFilter, SubmissionStatus,
};
use rorstay::geocoding::{CachedGeocoder, ProviderGeocoder};
use rorstay::listings::{MemoryPropertyStore, PropertyService};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

pub(crate) type ListingService = PropertyService<MemoryPropertyStore, CachedGeocoder<ProviderGeocoder>>;
pub(crate) type InboxService = ContactService<InMemoryContactRepository, TracingContactNotifier>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryContactRepository {
    submissions: Arc<Mutex<Vec<StoredSubmission>>>,
    inquiries: Arc<Mutex<HashMap<String, Inquiry>>>,
}

impl ContactRepository for InMemoryContactRepository {
    fn insert_submission(
        &self,
        submission: StoredSubmission,
    ) -> Result<StoredSubmission, RepositoryError> {
        let mut guard = self.submissions.lock().expect("submission mutex poisoned");
        if guard.iter().any(|existing| existing.id == submission.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(submission.clone());
        Ok(submission)
    }

    fn submissions(
        &self,
        filter: &SubmissionFilter,
        limit: usize,
    ) -> Result<Vec<StoredSubmission>, RepositoryError> {
        let guard = self.submissions.lock().expect("submission mutex poisoned");
        let mut matching: Vec<StoredSubmission> = guard
            .iter()
            .filter(|submission| filter.matches(submission))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit);
        Ok(matching)
    }

    fn set_submission_status(
        &self,
        id: &str,
        status: SubmissionStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<StoredSubmission>, RepositoryError> {
        let mut guard = self.submissions.lock().expect("submission mutex poisoned");
        Ok(guard
            .iter_mut()
            .find(|submission| submission.id == id)
            .map(|submission| {
                submission.status = status;
                submission.updated_at = at;
                submission.clone()
            }))
    }

    fn delete_submission(&self, id: &str) -> Result<bool, RepositoryError> {
        let mut guard = self.submissions.lock().expect("submission mutex poisoned");
        let before = guard.len();
        guard.retain(|submission| submission.id != id);
        Ok(guard.len() < before)
    }

    fn insert_inquiry(&self, inquiry: Inquiry) -> Result<Inquiry, RepositoryError> {
        let mut guard = self.inquiries.lock().expect("inquiry mutex poisoned");
        if guard.contains_key(&inquiry.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(inquiry.id.clone(), inquiry.clone());
        Ok(inquiry)
    }

    fn inquiry(&self, id: &str) -> Result<Option<Inquiry>, RepositoryError> {
        let guard = self.inquiries.lock().expect("inquiry mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update_inquiry(&self, inquiry: Inquiry) -> Result<(), RepositoryError> {
        let mut guard = self.inquiries.lock().expect("inquiry mutex poisoned");
        if guard.contains_key(&inquiry.id) {
            guard.insert(inquiry.id.clone(), inquiry);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn inquiries_for_user(&self, user_id: &str) -> Result<Vec<Inquiry>, RepositoryError> {
        let guard = self.inquiries.lock().expect("inquiry mutex poisoned");
        let mut owned: Vec<Inquiry> = guard
            .values()
            .filter(|inquiry| inquiry.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    fn inquiries(&self, filter: &InquiryFilter) -> Result<Vec<Inquiry>, RepositoryError> {
        let guard = self.inquiries.lock().expect("inquiry mutex poisoned");
        let mut matching: Vec<Inquiry> = guard
            .values()
            .filter(|inquiry| filter.matches(inquiry))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }
}

/// Stands in for e-mail delivery by logging each notice.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TracingContactNotifier;

impl ContactNotifier for TracingContactNotifier {
    fn notify(&self, notice: ContactNotice) -> Result<(), NotifierError> {
        info!(
            submission_id = %notice.submission_id,
            from = %notice.email,
            phone = %notice.phone,
            property_id = ?notice.property_id,
            summary = %notice.summary,
            "new contact submission"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rorstay::contact::{InquiryStatus, PhoneNumber};

    fn submission(id: &str, name: &str, minutes_ago: i64) -> StoredSubmission {
        let created_at = Utc::now() - Duration::minutes(minutes_ago);
        StoredSubmission {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: PhoneNumber::parse("212-555-0199").expect("valid phone"),
            message: "Interested in a viewing".to_string(),
            property_id: None,
            preferred_location: None,
            map_pin: None,
            status: SubmissionStatus::New,
            created_at,
            updated_at: created_at,
        }
    }

    fn inquiry(id: &str, property_id: &str, status: InquiryStatus, minutes_ago: i64) -> Inquiry {
        let created_at = Utc::now() - Duration::minutes(minutes_ago);
        Inquiry {
            id: id.to_string(),
            property_id: property_id.to_string(),
            user_id: "user-1".to_string(),
            message: "Is parking included?".to_string(),
            contact_method: "email".to_string(),
            status,
            response: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn notifier_keeps_nothing_between_notices() {
        assert_eq!(std::mem::size_of::<TracingContactNotifier>(), 0);
        let notice = ContactNotice::for_submission(&submission("s-1", "Grace", 0));
        for _ in 0..3 {
            TracingContactNotifier
                .notify(notice.clone())
                .expect("logging never fails");
        }
    }

    #[test]
    fn submissions_filter_newest_first_and_delete() {
        let repository = InMemoryContactRepository::default();
        for (id, name, age) in [("s-1", "Grace", 30), ("s-2", "Ada", 20), ("s-3", "Gracie", 10)] {
            repository
                .insert_submission(submission(id, name, age))
                .expect("insert succeeds");
        }

        let filter = SubmissionFilter {
            text: Some("grac".to_string()),
            ..SubmissionFilter::default()
        };
        let ids: Vec<String> = repository
            .submissions(&filter, 10)
            .expect("listing succeeds")
            .into_iter()
            .map(|submission| submission.id)
            .collect();
        assert_eq!(ids, vec!["s-3".to_string(), "s-1".to_string()]);

        assert!(repository.delete_submission("s-1").expect("delete runs"));
        assert!(!repository.delete_submission("s-1").expect("delete runs"));
        assert_eq!(
            repository
                .submissions(&SubmissionFilter::default(), 10)
                .expect("listing succeeds")
                .len(),
            2
        );
    }

    #[test]
    fn inquiries_filter_by_status_and_property() {
        let repository = InMemoryContactRepository::default();
        repository
            .insert_inquiry(inquiry("i-1", "listing-1", InquiryStatus::New, 30))
            .expect("insert succeeds");
        repository
            .insert_inquiry(inquiry("i-2", "listing-1", InquiryStatus::Closed, 20))
            .expect("insert succeeds");
        repository
            .insert_inquiry(inquiry("i-3", "listing-2", InquiryStatus::New, 10))
            .expect("insert succeeds");

        let all: Vec<String> = repository
            .inquiries(&InquiryFilter::default())
            .expect("listing succeeds")
            .into_iter()
            .map(|inquiry| inquiry.id)
            .collect();
        assert_eq!(all, vec!["i-3", "i-2", "i-1"]);

        let open_on_first = InquiryFilter {
            status: Some(InquiryStatus::New),
            property_id: Some("listing-1".to_string()),
        };
        let matching = repository
            .inquiries(&open_on_first)
            .expect("listing succeeds");
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].id, "i-1");
    }
}
