use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::domain::{is_blank, AddressKind, StudentProfile};

/// Validation errors raised by the completeness guard.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletenessViolation {
    #[error("full name is missing")]
    MissingFullName,
    #[error("email is missing")]
    MissingEmail,
    #[error("aadhaar number is missing")]
    MissingNationalId,
    #[error("phone number is missing")]
    MissingPhoneNumber,
    #[error("date of birth is missing")]
    MissingDateOfBirth,
    #[error("qualification is missing")]
    MissingQualification,
    #[error("nationality is missing")]
    MissingNationality,
    #[error("category is missing")]
    MissingCategory,
    #[error("income must be greater than 0")]
    NonPositiveIncome,
    #[error("no documents uploaded")]
    NoDocuments,
    #[error("document {0} is incomplete")]
    IncompleteDocument(usize),
    #[error("no education history found")]
    NoEducationHistory,
    #[error("education history {0} is incomplete")]
    IncompleteEducation(usize),
    #[error("no addresses provided")]
    NoAddresses,
    #[error("{0} address entry is incomplete")]
    IncompleteAddress(AddressKind),
    #[error("permanent address is required")]
    MissingPermanentAddress,
    #[error("city is missing for permanent address")]
    PermanentAddressMissingCity,
    #[error("pincode is missing for permanent address")]
    PermanentAddressMissingPostalCode,
}

impl CompletenessViolation {
    /// Machine-readable name of the field that failed.
    pub fn field(&self) -> &'static str {
        match self {
            CompletenessViolation::MissingFullName => "full_name",
            CompletenessViolation::MissingEmail => "email",
            CompletenessViolation::MissingNationalId => "aadhaar_number",
            CompletenessViolation::MissingPhoneNumber => "phone_number",
            CompletenessViolation::MissingDateOfBirth => "date_of_birth",
            CompletenessViolation::MissingQualification => "qualification",
            CompletenessViolation::MissingNationality => "nationality",
            CompletenessViolation::MissingCategory => "category",
            CompletenessViolation::NonPositiveIncome => "income",
            CompletenessViolation::NoDocuments | CompletenessViolation::IncompleteDocument(_) => {
                "documents"
            }
            CompletenessViolation::NoEducationHistory
            | CompletenessViolation::IncompleteEducation(_) => "education_history",
            CompletenessViolation::NoAddresses | CompletenessViolation::IncompleteAddress(_) => {
                "addresses"
            }
            CompletenessViolation::MissingPermanentAddress => "addresses.permanent",
            CompletenessViolation::PermanentAddressMissingCity => "addresses.permanent.city",
            CompletenessViolation::PermanentAddressMissingPostalCode => {
                "addresses.permanent.pincode"
            }
        }
    }
}

/// What a draft inconsistency does to the edit that produced it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftValidationMode {
    /// Report the inconsistency alongside a successful edit.
    #[default]
    Advisory,
    /// Reject the edit and roll it back.
    Strict,
}

impl DraftValidationMode {
    pub const fn label(self) -> &'static str {
        match self {
            DraftValidationMode::Advisory => "advisory",
            DraftValidationMode::Strict => "strict",
        }
    }
}

impl fmt::Display for DraftValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DraftValidationMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "advisory" => Ok(Self::Advisory),
            "strict" => Ok(Self::Strict),
            other => Err(format!(
                "unknown draft validation mode '{other}' (expected advisory or strict)"
            )),
        }
    }
}

/// Result of reviewing a draft after an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftReview {
    Consistent,
    Advisory(CompletenessViolation),
}

impl DraftReview {
    pub fn advisory(&self) -> Option<&CompletenessViolation> {
        match self {
            DraftReview::Consistent => None,
            DraftReview::Advisory(violation) => Some(violation),
        }
    }
}

/// Guard deciding whether a profile is ready to submit and whether a draft hangs together.
#[derive(Debug, Clone, Default)]
pub struct CompletenessGuard {
    draft_mode: DraftValidationMode,
}

impl CompletenessGuard {
    pub fn new(draft_mode: DraftValidationMode) -> Self {
        Self { draft_mode }
    }

    /// Strict check gating submission. Stops at the first missing field.
    pub fn check_submission(&self, profile: &StudentProfile) -> Result<(), CompletenessViolation> {
        let required_text = [
            (&profile.full_name, CompletenessViolation::MissingFullName),
            (&profile.email, CompletenessViolation::MissingEmail),
            (&profile.national_id, CompletenessViolation::MissingNationalId),
            (&profile.phone_number, CompletenessViolation::MissingPhoneNumber),
        ];
        for (value, violation) in required_text {
            if is_blank(value) {
                return Err(violation);
            }
        }

        if profile.date_of_birth.is_none() {
            return Err(CompletenessViolation::MissingDateOfBirth);
        }

        let required_text = [
            (
                &profile.qualification,
                CompletenessViolation::MissingQualification,
            ),
            (&profile.nationality, CompletenessViolation::MissingNationality),
            (&profile.category, CompletenessViolation::MissingCategory),
        ];
        for (value, violation) in required_text {
            if is_blank(value) {
                return Err(violation);
            }
        }

        if profile.income.is_nan() || profile.income <= 0.0 {
            return Err(CompletenessViolation::NonPositiveIncome);
        }

        if profile.documents.is_empty() {
            return Err(CompletenessViolation::NoDocuments);
        }
        if !profile
            .documents
            .iter()
            .any(|document| !is_blank(&document.name) && !is_blank(&document.url))
        {
            return Err(CompletenessViolation::IncompleteDocument(1));
        }

        if profile.education_history.is_empty() {
            return Err(CompletenessViolation::NoEducationHistory);
        }
        if !profile.education_history.iter().any(|entry| {
            !is_blank(&entry.degree) && !is_blank(&entry.university) && entry.year_of_passing != 0
        }) {
            return Err(CompletenessViolation::IncompleteEducation(1));
        }

        if profile.addresses.is_empty() {
            return Err(CompletenessViolation::NoAddresses);
        }
        if let Some(address) = profile
            .addresses
            .iter()
            .find(|address| !address.is_complete())
        {
            return Err(CompletenessViolation::IncompleteAddress(address.kind));
        }
        if !profile
            .addresses
            .iter()
            .any(|address| address.kind == AddressKind::Permanent)
        {
            return Err(CompletenessViolation::MissingPermanentAddress);
        }

        Ok(())
    }

    /// Relaxed check for drafts: only flags fields that contradict each other, never absence.
    pub fn check_draft(&self, profile: &StudentProfile) -> Result<(), CompletenessViolation> {
        for (index, document) in profile.documents.iter().enumerate() {
            if !is_blank(&document.name) && is_blank(&document.url) {
                return Err(CompletenessViolation::IncompleteDocument(index + 1));
            }
        }

        for (index, entry) in profile.education_history.iter().enumerate() {
            if !is_blank(&entry.degree)
                && (is_blank(&entry.university) || entry.year_of_passing == 0)
            {
                return Err(CompletenessViolation::IncompleteEducation(index + 1));
            }
        }

        for address in &profile.addresses {
            if address.kind != AddressKind::Permanent {
                continue;
            }
            if !is_blank(&address.street) && is_blank(&address.city) {
                return Err(CompletenessViolation::PermanentAddressMissingCity);
            }
            if !is_blank(&address.state) && is_blank(&address.postal_code) {
                return Err(CompletenessViolation::PermanentAddressMissingPostalCode);
            }
        }

        Ok(())
    }

    /// Apply the configured draft mode to `check_draft`.
    ///
    /// Advisory mode turns an inconsistency into a note; strict mode returns it as an error.
    pub fn review_draft(
        &self,
        profile: &StudentProfile,
    ) -> Result<DraftReview, CompletenessViolation> {
        match (self.check_draft(profile), self.draft_mode) {
            (Ok(()), _) => Ok(DraftReview::Consistent),
            (Err(violation), DraftValidationMode::Advisory) => {
                Ok(DraftReview::Advisory(violation))
            }
            (Err(violation), DraftValidationMode::Strict) => Err(violation),
        }
    }
}
