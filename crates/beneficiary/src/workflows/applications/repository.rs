use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    AcademicQualification, Address, AddressKind, Application, ApplicationId, NewApplication,
    ProfileId, QualificationKey, StudentProfile, UploadDocument, UserId,
};
use crate::workflows::schemes::SchemeId;

/// Application together with its loaded student profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub application: Application,
    pub profile: StudentProfile,
}

impl ApplicationRecord {
    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.application.id,
            scheme_id: self.application.scheme_id,
            status: self.application.status.label(),
            is_draft: self.application.is_draft,
            submitted_at: self.application.submitted_at,
        }
    }
}

/// Sanitized representation of an application's exposed status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub scheme_id: SchemeId,
    pub status: &'static str,
    pub is_draft: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl ApplicationStatusView {
    pub fn summary(&self) -> String {
        format!("application status is {}", self.status)
    }
}

/// Storage primitives a single unit of work may use.
///
/// Lookups return `Ok(None)` when the row is absent so callers can tell "not found" apart
/// from a failing backend. `profile` loads the documents, addresses, and education history
/// alongside the scalar fields; `update_profile` writes the scalar fields only.
pub trait StorageSession {
    fn application(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn application_for(
        &self,
        user: UserId,
        scheme: SchemeId,
    ) -> Result<Option<Application>, RepositoryError>;
    fn applications_for_user(&self, user: UserId) -> Result<Vec<Application>, RepositoryError>;
    fn insert_application(
        &mut self,
        application: NewApplication,
    ) -> Result<Application, RepositoryError>;
    fn update_application(&mut self, application: &Application) -> Result<(), RepositoryError>;

    fn insert_profile(
        &mut self,
        user: UserId,
        at: DateTime<Utc>,
    ) -> Result<StudentProfile, RepositoryError>;
    fn profile(&self, id: ProfileId) -> Result<Option<StudentProfile>, RepositoryError>;
    fn update_profile(&mut self, profile: &StudentProfile) -> Result<(), RepositoryError>;

    fn document(
        &self,
        profile: ProfileId,
        name: &str,
    ) -> Result<Option<UploadDocument>, RepositoryError>;
    fn insert_document(
        &mut self,
        profile: ProfileId,
        document: UploadDocument,
    ) -> Result<(), RepositoryError>;
    fn update_document(
        &mut self,
        profile: ProfileId,
        document: &UploadDocument,
    ) -> Result<(), RepositoryError>;

    fn address(
        &self,
        profile: ProfileId,
        kind: AddressKind,
    ) -> Result<Option<Address>, RepositoryError>;
    fn insert_address(&mut self, profile: ProfileId, address: Address)
        -> Result<(), RepositoryError>;
    fn update_address(
        &mut self,
        profile: ProfileId,
        address: &Address,
    ) -> Result<(), RepositoryError>;

    fn qualification(
        &self,
        profile: ProfileId,
        key: QualificationKey<'_>,
    ) -> Result<Option<AcademicQualification>, RepositoryError>;
    fn insert_qualification(
        &mut self,
        profile: ProfileId,
        qualification: AcademicQualification,
    ) -> Result<(), RepositoryError>;
    fn update_qualification(
        &mut self,
        profile: ProfileId,
        qualification: &AcademicQualification,
    ) -> Result<(), RepositoryError>;
}

/// Storage abstraction so the service module can be exercised in isolation.
///
/// Everything `work` writes becomes visible only if it returns `Ok`; an `Err` discards the
/// whole unit.
pub trait ApplicationRepository: Send + Sync {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StorageSession) -> Result<T, E>,
        E: From<RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0} already exists")]
    Conflict(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
