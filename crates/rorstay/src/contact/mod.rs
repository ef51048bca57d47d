//! Contact-form intake and listing inquiries.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    parse_date_bound, ContactReceipt, ContactSubmission, ContactViolation, Inquiry, InquiryDraft,
    InquiryFilter, InquiryReply, InquiryStatus, PhoneNumber, StoredSubmission, SubmissionFilter,
    SubmissionStatus,
};
pub use repository::{
    ContactNotice, ContactNotifier, ContactRepository, NotifierError, RepositoryError,
};
pub use router::contact_router;
pub use service::{ContactError, ContactService};
