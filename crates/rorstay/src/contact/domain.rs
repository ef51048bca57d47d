use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::listings::domain::Coordinates;

const PHONE_DIGITS: usize = 10;
pub const DEFAULT_CONTACT_METHOD: &str = "email";

/// Input constraint violations for contact and inquiry payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContactViolation {
    #[error("phone number must contain exactly 10 digits")]
    InvalidPhone,
    #[error("email address is not valid")]
    InvalidEmail,
    #[error("{0} must not be blank")]
    Blank(&'static str),
    #[error("{field} is not a date or timestamp: {value}")]
    InvalidDate { field: &'static str, value: String },
}

/// US phone number reduced to its 10 digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> Result<Self, ContactViolation> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.len() == PHONE_DIGITS {
            Ok(Self(digits))
        } else {
            Err(ContactViolation::InvalidPhone)
        }
    }

    pub fn digits(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = ContactViolation;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(value: PhoneNumber) -> Self {
        value.0
    }
}

pub(crate) fn check_email(email: &str) -> Result<(), ContactViolation> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ContactViolation::InvalidEmail)
    }
}

fn check_present(field: &'static str, value: &str) -> Result<(), ContactViolation> {
    if value.trim().is_empty() {
        Err(ContactViolation::Blank(field))
    } else {
        Ok(())
    }
}

/// Public contact-form payload. A non-empty `website` marks the submission as spam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub phone: PhoneNumber,
    pub message: String,
    #[serde(default)]
    pub property_id: Option<String>,
    #[serde(default)]
    pub preferred_location: Option<String>,
    #[serde(default)]
    pub map_pin: Option<Coordinates>,
    #[serde(default)]
    pub website: Option<String>,
}

impl ContactSubmission {
    pub fn is_spam(&self) -> bool {
        self.website
            .as_deref()
            .is_some_and(|website| !website.trim().is_empty())
    }

    pub fn validate(&self) -> Result<(), ContactViolation> {
        check_present("name", &self.name)?;
        check_present("message", &self.message)?;
        check_email(&self.email)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    New,
    InProgress,
    Contacted,
    Resolved,
    Closed,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStatus::New => "new",
            SubmissionStatus::InProgress => "in_progress",
            SubmissionStatus::Contacted => "contacted",
            SubmissionStatus::Resolved => "resolved",
            SubmissionStatus::Closed => "closed",
        }
    }
}

/// A persisted contact submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSubmission {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: PhoneNumber,
    pub message: String,
    pub property_id: Option<String>,
    pub preferred_location: Option<String>,
    pub map_pin: Option<Coordinates>,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin inbox selection. Every present constraint must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionFilter {
    pub status: Option<SubmissionStatus>,
    /// Case-insensitive substring of the name, email or phone digits.
    pub text: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

impl SubmissionFilter {
    pub fn matches(&self, submission: &StoredSubmission) -> bool {
        if self.status.is_some_and(|status| submission.status != status) {
            return false;
        }
        if self.created_from.is_some_and(|from| submission.created_at < from) {
            return false;
        }
        if self.created_to.is_some_and(|to| submission.created_at > to) {
            return false;
        }
        match self.text.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                submission.name.to_lowercase().contains(&needle)
                    || submission.email.to_lowercase().contains(&needle)
                    || submission.phone.digits().contains(&needle)
            }
            _ => true,
        }
    }
}

/// Parses an inbox date bound. Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` taken as
/// UTC, or a bare `YYYY-MM-DD`; a bare date used as an upper bound covers the whole day.
pub fn parse_date_bound(
    field: &'static str,
    raw: &str,
    end_of_day: bool,
) -> Result<DateTime<Utc>, ContactViolation> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    let invalid = || ContactViolation::InvalidDate {
        field,
        value: raw.to_string(),
    };
    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid())?;
    let naive = if end_of_day {
        day.and_hms_micro_opt(23, 59, 59, 999_999)
    } else {
        day.and_hms_opt(0, 0, 0)
    }
    .ok_or_else(invalid)?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// Acknowledgement returned to the submitter, identical for accepted and discarded forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactReceipt {
    pub id: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InquiryStatus {
    New,
    Contacted,
    Closed,
}

fn default_contact_method() -> String {
    DEFAULT_CONTACT_METHOD.to_string()
}

/// Inquiry about a listing, as sent by an authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InquiryDraft {
    pub property_id: String,
    pub message: String,
    #[serde(default = "default_contact_method")]
    pub contact_method: String,
}

impl InquiryDraft {
    pub fn validate(&self) -> Result<(), ContactViolation> {
        check_present("property_id", &self.property_id)?;
        check_present("message", &self.message)?;
        check_present("contact_method", &self.contact_method)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inquiry {
    pub id: String,
    pub property_id: String,
    pub user_id: String,
    pub message: String,
    pub contact_method: String,
    pub status: InquiryStatus,
    #[serde(default)]
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin selection over every inquiry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InquiryFilter {
    #[serde(default)]
    pub status: Option<InquiryStatus>,
    #[serde(default)]
    pub property_id: Option<String>,
}

impl InquiryFilter {
    pub fn matches(&self, inquiry: &Inquiry) -> bool {
        self.status.map_or(true, |status| inquiry.status == status)
            && self
                .property_id
                .as_deref()
                .map_or(true, |property_id| inquiry.property_id == property_id)
    }
}

/// Staff reply to an inquiry. Status defaults to `contacted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InquiryReply {
    pub response: String,
    #[serde(default)]
    pub status: Option<InquiryStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn phone_numbers_normalize_to_ten_digits() {
        assert_eq!(
            PhoneNumber::parse("(401) 555-0134").expect("valid").digits(),
            "4015550134"
        );
        assert_eq!(
            PhoneNumber::parse("401.555.0134").expect("valid").digits(),
            "4015550134"
        );
        assert_eq!(
            PhoneNumber::parse("+1 401 555 0134"),
            Err(ContactViolation::InvalidPhone)
        );
        assert_eq!(PhoneNumber::parse("555-0134"), Err(ContactViolation::InvalidPhone));
    }

    #[test]
    fn phone_is_validated_during_deserialization() {
        let rejected = serde_json::from_value::<ContactSubmission>(json!({
            "name": "Ada",
            "email": "ada@example.com",
            "phone": "12345",
            "message": "Hello"
        }));
        assert!(rejected.is_err());

        let accepted: ContactSubmission = serde_json::from_value(json!({
            "name": "Ada",
            "email": "ada@example.com",
            "phone": "401-555-0134",
            "message": "Hello"
        }))
        .expect("valid submission");
        assert_eq!(accepted.phone.digits(), "4015550134");
        assert!(!accepted.is_spam());
    }

    #[test]
    fn email_needs_local_part_and_dotted_domain() {
        assert!(check_email("agent@rorstay.com").is_ok());
        assert_eq!(check_email("@rorstay.com"), Err(ContactViolation::InvalidEmail));
        assert_eq!(check_email("agent@localhost"), Err(ContactViolation::InvalidEmail));
        assert_eq!(check_email("agent@.com"), Err(ContactViolation::InvalidEmail));
        assert_eq!(check_email("a b@rorstay.com"), Err(ContactViolation::InvalidEmail));
    }

    fn stored(name: &str, email: &str, phone: &str, created_at: &str) -> StoredSubmission {
        let created_at = DateTime::parse_from_rfc3339(created_at)
            .expect("fixture timestamp")
            .with_timezone(&Utc);
        StoredSubmission {
            id: "s-1".to_string(),
            name: name.to_string(),
            email: email.to_string(),
            phone: PhoneNumber::parse(phone).expect("fixture phone"),
            message: "Looking for a two bedroom".to_string(),
            property_id: None,
            preferred_location: None,
            map_pin: None,
            status: SubmissionStatus::New,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn inbox_text_search_covers_name_email_and_phone() {
        let submission = stored(
            "Grace Hopper",
            "Grace@Navy.mil",
            "401-555-0134",
            "2024-03-10T12:00:00Z",
        );
        for needle in ["hopper", "NAVY.MIL", "5550134", "  grace "] {
            let filter = SubmissionFilter {
                text: Some(needle.to_string()),
                ..SubmissionFilter::default()
            };
            assert!(filter.matches(&submission), "{needle} should match");
        }

        let miss = SubmissionFilter {
            text: Some("lovelace".to_string()),
            ..SubmissionFilter::default()
        };
        assert!(!miss.matches(&submission));
    }

    #[test]
    fn inbox_date_bounds_are_inclusive() {
        let submission = stored("Ada", "ada@example.com", "4015550134", "2024-03-10T23:30:00Z");
        let filter = SubmissionFilter {
            created_from: Some(parse_date_bound("from_date", "2024-03-10", false).expect("date")),
            created_to: Some(parse_date_bound("to_date", "2024-03-10", true).expect("date")),
            ..SubmissionFilter::default()
        };
        assert!(filter.matches(&submission));

        let earlier = SubmissionFilter {
            created_to: Some(
                parse_date_bound("to_date", "2024-03-10T12:00:00", true).expect("timestamp"),
            ),
            ..SubmissionFilter::default()
        };
        assert!(!earlier.matches(&submission));
    }

    #[test]
    fn date_bounds_reject_garbage() {
        assert_eq!(
            parse_date_bound("from_date", "last tuesday", false),
            Err(ContactViolation::InvalidDate {
                field: "from_date",
                value: "last tuesday".to_string(),
            })
        );
        let offset = parse_date_bound("from_date", "2024-03-10T08:00:00-04:00", false)
            .expect("rfc 3339");
        assert_eq!(offset.to_rfc3339(), "2024-03-10T12:00:00+00:00");
    }

    #[test]
    fn inquiry_contact_method_defaults_to_email() {
        let draft: InquiryDraft = serde_json::from_value(json!({
            "property_id": "listing-1",
            "message": "Is it still available?"
        }))
        .expect("valid draft");
        assert_eq!(draft.contact_method, "email");
    }
}
