use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::completeness::{CompletenessGuard, CompletenessViolation, DraftValidationMode};
use super::domain::{
    Application, ApplicationId, NewApplication, StudentProfile, StudentProfileInput, UserId,
};
use super::merge::{merge_profile, ProfileMergeReport};
use super::repository::{
    ApplicationRecord, ApplicationRepository, ApplicationStatusView, RepositoryError,
    StorageSession,
};
use crate::workflows::schemes::{CatalogError, SchemeCatalog, SchemeId};

/// Lifecycle service composing the repository, scheme catalog, and completeness guard.
///
/// Every transition runs inside one repository transaction and starts with the same
/// ownership check, so a failure at any step leaves storage untouched.
pub struct ApplicationService<R, C> {
    guard: Arc<CompletenessGuard>,
    repository: Arc<R>,
    catalog: Arc<C>,
}

/// Result of a successful edit.
#[derive(Debug, Clone)]
pub struct ModifyOutcome {
    pub record: ApplicationRecord,
    pub merge: ProfileMergeReport,
    /// Draft inconsistency reported in advisory mode.
    pub advisory: Option<CompletenessViolation>,
}

impl<R, C> ApplicationService<R, C>
where
    R: ApplicationRepository + 'static,
    C: SchemeCatalog + 'static,
{
    pub fn new(repository: Arc<R>, catalog: Arc<C>, draft_mode: DraftValidationMode) -> Self {
        Self {
            guard: Arc::new(CompletenessGuard::new(draft_mode)),
            repository,
            catalog,
        }
    }

    /// Create an empty profile and a draft application for `scheme`.
    pub fn initialize(
        &self,
        user: UserId,
        scheme: SchemeId,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        let now = Utc::now();
        let record = self.repository.transaction(|session| {
            if session.application_for(user, scheme)?.is_some() {
                return Err(ApplicationServiceError::DuplicateApplication { scheme });
            }
            if !self.catalog.exists(scheme)? {
                return Err(ApplicationServiceError::SchemeNotFound(scheme));
            }

            let profile = session.insert_profile(user, now)?;
            let application = session.insert_application(NewApplication {
                user_id: user,
                scheme_id: scheme,
                student_profile_id: profile.id,
                created_at: now,
            })?;

            Ok(ApplicationRecord {
                application,
                profile,
            })
        })?;

        info!(
            application_id = %record.application.id,
            user_id = %user,
            scheme_id = %scheme,
            "initialized draft application"
        );
        Ok(record)
    }

    /// Merge profile edits into a draft.
    pub fn modify(
        &self,
        user: UserId,
        application_id: ApplicationId,
        edits: &StudentProfileInput,
    ) -> Result<ModifyOutcome, ApplicationServiceError> {
        let now = Utc::now();
        let outcome = self.repository.transaction(|session| {
            let application = owned_application(session, user, application_id)?;
            if !application.is_draft {
                return Err(ApplicationServiceError::NotEditable(application_id));
            }

            let mut profile = load_profile(session, &application)?;
            let merge = merge_profile(session, &mut profile, edits, now)?;

            let profile = load_profile(session, &application)?;
            let review = self
                .guard
                .review_draft(&profile)
                .map_err(ApplicationServiceError::InconsistentDraft)?;

            Ok(ModifyOutcome {
                record: ApplicationRecord {
                    application,
                    profile,
                },
                merge,
                advisory: review.advisory().cloned(),
            })
        })?;

        if let Some(advisory) = &outcome.advisory {
            warn!(
                application_id = %application_id,
                field = advisory.field(),
                %advisory,
                "draft profile saved with an inconsistency"
            );
        }
        info!(application_id = %application_id, user_id = %user, "modified draft application");
        Ok(outcome)
    }

    /// Validate completeness and move a draft to submitted.
    pub fn submit(
        &self,
        user: UserId,
        application_id: ApplicationId,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        let now = Utc::now();
        let record = self.repository.transaction(|session| {
            let mut application = owned_application(session, user, application_id)?;
            if !application.is_draft {
                return Err(ApplicationServiceError::AlreadySubmitted(application_id));
            }

            let profile = load_profile(session, &application)?;
            self.guard
                .check_submission(&profile)
                .map_err(ApplicationServiceError::Incomplete)?;

            application.mark_submitted(now);
            session.update_application(&application)?;

            Ok(ApplicationRecord {
                application,
                profile,
            })
        })?;

        info!(application_id = %application_id, user_id = %user, "submitted application");
        Ok(record)
    }

    /// Return a submitted application to draft without re-validating it.
    pub fn withdraw(
        &self,
        user: UserId,
        application_id: ApplicationId,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        let now = Utc::now();
        let record = self.repository.transaction(|session| {
            let mut application = owned_application(session, user, application_id)?;
            if application.is_draft {
                return Err(ApplicationServiceError::WithdrawDraft(application_id));
            }
            if !application.is_submitted() {
                return Err(ApplicationServiceError::NotSubmitted(application_id));
            }

            application.mark_withdrawn(now);
            session.update_application(&application)?;
            let profile = load_profile(session, &application)?;

            Ok(ApplicationRecord {
                application,
                profile,
            })
        })?;

        info!(application_id = %application_id, user_id = %user, "withdrew application");
        Ok(record)
    }

    /// Fetch an owned application with its profile.
    pub fn get(
        &self,
        user: UserId,
        application_id: ApplicationId,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        self.repository.transaction(|session| {
            let application = owned_application(session, user, application_id)?;
            let profile = load_profile(session, &application)?;
            Ok(ApplicationRecord {
                application,
                profile,
            })
        })
    }

    /// Every application the user owns. An empty result is reported as not found.
    pub fn list(&self, user: UserId) -> Result<Vec<ApplicationRecord>, ApplicationServiceError> {
        self.repository.transaction(|session| {
            let applications = session.applications_for_user(user)?;
            if applications.is_empty() {
                return Err(ApplicationServiceError::NoApplications);
            }

            let mut records = Vec::with_capacity(applications.len());
            for application in applications {
                let profile = load_profile(session, &application)?;
                records.push(ApplicationRecord {
                    application,
                    profile,
                });
            }
            Ok(records)
        })
    }

    pub fn status(
        &self,
        user: UserId,
        application_id: ApplicationId,
    ) -> Result<ApplicationStatusView, ApplicationServiceError> {
        self.get(user, application_id)
            .map(|record| record.status_view())
    }
}

/// Ownership check shared by every transition. A foreign application reads as missing.
fn owned_application(
    session: &dyn StorageSession,
    user: UserId,
    application_id: ApplicationId,
) -> Result<Application, ApplicationServiceError> {
    match session.application(application_id)? {
        Some(application) if application.user_id == user => Ok(application),
        _ => Err(ApplicationServiceError::ApplicationNotFound(application_id)),
    }
}

fn load_profile(
    session: &dyn StorageSession,
    application: &Application,
) -> Result<StudentProfile, ApplicationServiceError> {
    session
        .profile(application.student_profile_id)?
        .ok_or(ApplicationServiceError::ProfileNotFound(application.id))
}

/// Coarse failure classes callers render to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Conflict,
    Forbidden,
    BadRequest,
    Internal,
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error("application {0} not found")]
    ApplicationNotFound(ApplicationId),
    #[error("no applications found for this user")]
    NoApplications,
    #[error("scheme {0} not found")]
    SchemeNotFound(SchemeId),
    #[error("student profile for application {0} not found")]
    ProfileNotFound(ApplicationId),
    #[error("application already exists for scheme {scheme}")]
    DuplicateApplication { scheme: SchemeId },
    #[error("cannot modify application {0}, it is already submitted")]
    NotEditable(ApplicationId),
    #[error("application {0} is already submitted")]
    AlreadySubmitted(ApplicationId),
    #[error("draft applications cannot be withdrawn")]
    WithdrawDraft(ApplicationId),
    #[error("application {0} not submitted")]
    NotSubmitted(ApplicationId),
    #[error("application is incomplete: {0}")]
    Incomplete(CompletenessViolation),
    #[error("draft profile is inconsistent: {0}")]
    InconsistentDraft(CompletenessViolation),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ApplicationServiceError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ApplicationServiceError::ApplicationNotFound(_)
            | ApplicationServiceError::NoApplications
            | ApplicationServiceError::SchemeNotFound(_)
            | ApplicationServiceError::ProfileNotFound(_)
            | ApplicationServiceError::Repository(RepositoryError::NotFound(_)) => {
                FailureKind::NotFound
            }
            ApplicationServiceError::DuplicateApplication { .. }
            | ApplicationServiceError::Repository(RepositoryError::Conflict(_)) => {
                FailureKind::Conflict
            }
            ApplicationServiceError::NotEditable(_) => FailureKind::Forbidden,
            ApplicationServiceError::AlreadySubmitted(_)
            | ApplicationServiceError::WithdrawDraft(_)
            | ApplicationServiceError::NotSubmitted(_)
            | ApplicationServiceError::Incomplete(_)
            | ApplicationServiceError::InconsistentDraft(_) => FailureKind::BadRequest,
            ApplicationServiceError::Catalog(_)
            | ApplicationServiceError::Repository(RepositoryError::Unavailable(_)) => {
                FailureKind::Internal
            }
        }
    }

    /// The completeness failure behind this error, if any.
    pub fn violation(&self) -> Option<&CompletenessViolation> {
        match self {
            ApplicationServiceError::Incomplete(violation)
            | ApplicationServiceError::InconsistentDraft(violation) => Some(violation),
            _ => None,
        }
    }
}
