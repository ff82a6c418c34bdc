//! Match-or-create merge of profile edits.
//!
//! Every nested record is looked up by its natural key within the profile: documents by
//! name, addresses by type, education history by degree, university, and course. A match is
//! overwritten in place, anything else is inserted, so replaying the same edit never creates
//! duplicate rows.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::domain::{
    is_blank, AcademicQualification, Address, AddressInput, AddressKind, DocumentInput,
    EducationHistoryInput, ProfileId, QualificationKey, StudentProfile, StudentProfileInput,
    UploadDocument,
};
use super::repository::{RepositoryError, StorageSession};

/// Per-collection tally of what a merge did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl MergeReport {
    pub fn touched(&self) -> usize {
        self.created + self.updated
    }
}

/// Outcome of merging one `StudentProfileInput`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProfileMergeReport {
    pub profile_updated: bool,
    pub documents: MergeReport,
    pub addresses: MergeReport,
    pub education_history: MergeReport,
}

/// Copy every non-blank scalar edit onto the profile. Returns whether anything changed.
///
/// A blank string cannot clear a field: it reads the same as "not provided".
pub fn apply_scalar_edits(profile: &mut StudentProfile, edits: &StudentProfileInput) -> bool {
    let mut changed = false;

    changed |= assign_text(&mut profile.full_name, &edits.full_name);
    changed |= assign_text(&mut profile.email, &edits.email);
    changed |= assign_text(&mut profile.phone_number, &edits.phone_number);
    changed |= assign_text(&mut profile.qualification, &edits.qualification);
    changed |= assign_text(&mut profile.category, &edits.category);
    changed |= assign_text(&mut profile.nationality, &edits.nationality);
    changed |= assign_text(&mut profile.gender, &edits.gender);
    changed |= assign_text(&mut profile.national_id, &edits.national_id);

    if let Some(date_of_birth) = edits.date_of_birth {
        if profile.date_of_birth != Some(date_of_birth) {
            profile.date_of_birth = Some(date_of_birth);
            changed = true;
        }
    }

    if let Some(income) = edits.income {
        if profile.income != income {
            profile.income = income;
            changed = true;
        }
    }

    if let Some(is_international) = edits.is_international {
        if profile.is_international != is_international {
            profile.is_international = is_international;
            changed = true;
        }
    }

    changed
}

fn assign_text(target: &mut String, edit: &Option<String>) -> bool {
    match edit.as_deref() {
        Some(value) if !is_blank(value) && target.as_str() != value => {
            *target = value.to_string();
            true
        }
        _ => false,
    }
}

/// Apply scalar edits and merge every nested collection into storage.
///
/// Collections are merged in a fixed order (documents, addresses, education history); the
/// caller's transaction decides whether a failure part way through is rolled back.
pub fn merge_profile(
    session: &mut dyn StorageSession,
    profile: &mut StudentProfile,
    edits: &StudentProfileInput,
    now: DateTime<Utc>,
) -> Result<ProfileMergeReport, RepositoryError> {
    let profile_updated = apply_scalar_edits(profile, edits);
    if profile_updated {
        profile.updated_at = now;
        session.update_profile(profile)?;
    }

    let documents = upsert_documents(session, profile.id, &edits.documents, now)?;
    let addresses = upsert_addresses(session, profile.id, &edits.addresses, now)?;
    let education_history =
        upsert_education_history(session, profile.id, &edits.education_history, now)?;

    let report = ProfileMergeReport {
        profile_updated,
        documents,
        addresses,
        education_history,
    };
    debug!(profile_id = %profile.id, ?report, "merged profile edits");
    Ok(report)
}

/// Documents missing either a name or a URL are skipped.
pub fn upsert_documents(
    session: &mut dyn StorageSession,
    profile: ProfileId,
    documents: &[DocumentInput],
    now: DateTime<Utc>,
) -> Result<MergeReport, RepositoryError> {
    let mut report = MergeReport::default();

    for input in documents {
        if is_blank(&input.name) || is_blank(&input.url) {
            report.skipped += 1;
            continue;
        }

        match session.document(profile, &input.name)? {
            None => {
                session.insert_document(
                    profile,
                    UploadDocument {
                        name: input.name.clone(),
                        url: input.url.clone(),
                        created_at: now,
                        updated_at: now,
                    },
                )?;
                report.created += 1;
            }
            Some(mut existing) => {
                existing.url = input.url.clone();
                existing.updated_at = now;
                session.update_document(profile, &existing)?;
                report.updated += 1;
            }
        }
    }

    Ok(report)
}

/// Only `permanent` and `current` addresses are merged; other types and fully blank entries
/// are skipped without error. A matched address is overwritten field for field.
pub fn upsert_addresses(
    session: &mut dyn StorageSession,
    profile: ProfileId,
    addresses: &[AddressInput],
    now: DateTime<Utc>,
) -> Result<MergeReport, RepositoryError> {
    let mut report = MergeReport::default();

    for input in addresses {
        let Some(kind) = AddressKind::parse(&input.kind) else {
            report.skipped += 1;
            continue;
        };

        let fields = [
            &input.street,
            &input.city,
            &input.state,
            &input.postal_code,
            &input.country,
        ];
        if fields.iter().all(|value| is_blank(value)) {
            report.skipped += 1;
            continue;
        }

        match session.address(profile, kind)? {
            None => {
                session.insert_address(
                    profile,
                    Address {
                        kind,
                        street: input.street.clone(),
                        city: input.city.clone(),
                        state: input.state.clone(),
                        postal_code: input.postal_code.clone(),
                        country: input.country.clone(),
                        created_at: now,
                        updated_at: now,
                    },
                )?;
                report.created += 1;
            }
            Some(mut existing) => {
                existing.street = input.street.clone();
                existing.city = input.city.clone();
                existing.state = input.state.clone();
                existing.postal_code = input.postal_code.clone();
                existing.country = input.country.clone();
                existing.updated_at = now;
                session.update_address(profile, &existing)?;
                report.updated += 1;
            }
        }
    }

    Ok(report)
}

/// Degree, university, and course form the lookup key, so a match only refreshes the year of
/// passing and the grade.
pub fn upsert_education_history(
    session: &mut dyn StorageSession,
    profile: ProfileId,
    history: &[EducationHistoryInput],
    now: DateTime<Utc>,
) -> Result<MergeReport, RepositoryError> {
    let mut report = MergeReport::default();

    for input in history {
        let blank = is_blank(&input.degree)
            && is_blank(&input.university)
            && is_blank(&input.course)
            && is_blank(&input.grade)
            && input.year_of_passing == 0;
        if blank {
            report.skipped += 1;
            continue;
        }

        let key = QualificationKey {
            degree: &input.degree,
            university: &input.university,
            course: &input.course,
        };

        match session.qualification(profile, key)? {
            None => {
                session.insert_qualification(
                    profile,
                    AcademicQualification {
                        degree: input.degree.clone(),
                        university: input.university.clone(),
                        course: input.course.clone(),
                        year_of_passing: input.year_of_passing,
                        grade: input.grade.clone(),
                        created_at: now,
                        updated_at: now,
                    },
                )?;
                report.created += 1;
            }
            Some(mut existing) => {
                existing.year_of_passing = input.year_of_passing;
                existing.grade = input.grade.clone();
                existing.updated_at = now;
                session.update_qualification(profile, &existing)?;
                report.updated += 1;
            }
        }
    }

    Ok(report)
}
