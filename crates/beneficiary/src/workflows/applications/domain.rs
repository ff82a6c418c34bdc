use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::workflows::schemes::SchemeId;

/// Identifier wrapper for scholarship applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub u64);

/// Opaque identity handed over by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub u64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Label mirrored from `is_draft` so clients can render the lifecycle state directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Submitted => "submitted",
        }
    }
}

/// A user's application against a single scheme.
///
/// `submitted_at` is set exactly when `is_draft` is false; the transition helpers below are
/// the only places that flip either field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub user_id: UserId,
    pub scheme_id: SchemeId,
    pub student_profile_id: ProfileId,
    pub is_draft: bool,
    pub verified: bool,
    pub status: ApplicationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn is_submitted(&self) -> bool {
        !self.is_draft && self.submitted_at.is_some()
    }

    pub(crate) fn mark_submitted(&mut self, at: DateTime<Utc>) {
        self.is_draft = false;
        self.status = ApplicationStatus::Submitted;
        self.submitted_at = Some(at);
        self.updated_at = at;
    }

    pub(crate) fn mark_withdrawn(&mut self, at: DateTime<Utc>) {
        self.is_draft = true;
        self.status = ApplicationStatus::Draft;
        self.submitted_at = None;
        self.updated_at = at;
    }
}

/// Insert payload for a fresh draft; the store assigns the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub user_id: UserId,
    pub scheme_id: SchemeId,
    pub student_profile_id: ProfileId,
    pub created_at: DateTime<Utc>,
}

/// Mutable student profile bundled with an application while it is a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: ProfileId,
    pub user_id: UserId,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: String,
    pub phone_number: String,
    pub qualification: String,
    pub email: String,
    #[serde(rename = "aadhaar_number")]
    pub national_id: String,
    pub nationality: String,
    pub category: String,
    pub income: f64,
    pub is_international: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub documents: Vec<UploadDocument>,
    #[serde(default)]
    pub education_history: Vec<AcademicQualification>,
    #[serde(default)]
    pub addresses: Vec<Address>,
}

impl StudentProfile {
    /// Empty profile created alongside a new draft application.
    pub fn empty(id: ProfileId, user_id: UserId, at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            full_name: String::new(),
            date_of_birth: None,
            gender: String::new(),
            phone_number: String::new(),
            qualification: String::new(),
            email: String::new(),
            national_id: String::new(),
            nationality: String::new(),
            category: String::new(),
            income: 0.0,
            is_international: false,
            created_at: at,
            updated_at: at,
            documents: Vec::new(),
            education_history: Vec::new(),
            addresses: Vec::new(),
        }
    }
}

/// The two address slots a profile may hold, at most one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    Permanent,
    Current,
}

impl AddressKind {
    pub const fn label(self) -> &'static str {
        match self {
            AddressKind::Permanent => "permanent",
            AddressKind::Current => "current",
        }
    }

    /// Returns `None` for anything other than the two supported slots.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("permanent") {
            Some(AddressKind::Permanent)
        } else if raw.eq_ignore_ascii_case("current") {
            Some(AddressKind::Current)
        } else {
            None
        }
    }
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(rename = "type")]
    pub kind: AddressKind,
    pub street: String,
    pub city: String,
    pub state: String,
    #[serde(rename = "pincode")]
    pub postal_code: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Address {
    pub fn is_complete(&self) -> bool {
        [
            &self.street,
            &self.city,
            &self.state,
            &self.postal_code,
            &self.country,
        ]
        .iter()
        .all(|value| !is_blank(value))
    }
}

/// Uploaded proof; `name` is the natural key within a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDocument {
    pub name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One education history entry, matched on degree, university, and course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicQualification {
    pub degree: String,
    pub university: String,
    pub course: String,
    pub year_of_passing: u16,
    pub grade: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AcademicQualification {
    pub fn key(&self) -> QualificationKey<'_> {
        QualificationKey {
            degree: &self.degree,
            university: &self.university,
            course: &self.course,
        }
    }
}

/// Borrowed natural key for education history lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualificationKey<'a> {
    pub degree: &'a str,
    pub university: &'a str,
    pub course: &'a str,
}

/// Partial profile edit. Blank strings and absent values leave the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentProfileInput {
    pub full_name: Option<String>,
    #[serde(deserialize_with = "date_or_timestamp")]
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone_number: Option<String>,
    pub qualification: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "aadhaar_number")]
    pub national_id: Option<String>,
    pub nationality: Option<String>,
    pub category: Option<String>,
    pub income: Option<f64>,
    pub is_international: Option<bool>,
    #[serde(deserialize_with = "null_as_empty")]
    pub documents: Vec<DocumentInput>,
    #[serde(deserialize_with = "null_as_empty")]
    pub addresses: Vec<AddressInput>,
    #[serde(deserialize_with = "null_as_empty")]
    pub education_history: Vec<EducationHistoryInput>,
}

/// `null` collections read the same as omitted ones.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts `2004-09-02` as well as RFC 3339 timestamps such as `2004-09-02T00:00:00Z`.
fn date_or_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|timestamp| Some(timestamp.date_naive()))
        .map_err(|_| {
            de::Error::custom(format!(
                "invalid date '{raw}', expected YYYY-MM-DD or RFC 3339"
            ))
        })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentInput {
    pub name: String,
    pub url: String,
}

/// Address edit; the type stays raw text so unsupported slots can be skipped quietly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressInput {
    #[serde(rename = "type")]
    pub kind: String,
    pub street: String,
    pub city: String,
    pub state: String,
    #[serde(rename = "pincode")]
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationHistoryInput {
    pub degree: String,
    pub university: String,
    pub course: String,
    pub year_of_passing: u16,
    pub grade: String,
}

pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
