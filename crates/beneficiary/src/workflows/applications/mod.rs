//! Scholarship application lifecycle: draft editing, submission, and withdrawal.
//!
//! `service` owns the state machine, `merge` folds profile edits into storage, and
//! `completeness` decides when a profile may be submitted. Storage sits behind
//! `repository`, with `store` providing the bundled in-memory backend.

pub mod auth;
pub mod completeness;
pub mod domain;
pub mod merge;
pub mod repository;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use auth::{
    parse_basic_credentials, AuthError, AuthenticatedUser, Credentials, InMemoryUserDirectory,
    UserDirectory,
};
pub use completeness::{CompletenessGuard, CompletenessViolation, DraftReview, DraftValidationMode};
pub use domain::{
    AcademicQualification, Address, AddressInput, AddressKind, Application, ApplicationId,
    ApplicationStatus, DocumentInput, EducationHistoryInput, ProfileId, StudentProfile,
    StudentProfileInput, UploadDocument, UserId,
};
pub use merge::{MergeReport, ProfileMergeReport};
pub use repository::{
    ApplicationRecord, ApplicationRepository, ApplicationStatusView, RepositoryError,
    StorageSession,
};
pub use router::{application_router, failure_status};
pub use service::{ApplicationService, ApplicationServiceError, FailureKind, ModifyOutcome};
pub use store::InMemoryApplicationRepository;
