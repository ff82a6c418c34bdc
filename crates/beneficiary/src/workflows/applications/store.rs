use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::domain::{
    AcademicQualification, Address, AddressKind, Application, ApplicationId, ApplicationStatus,
    NewApplication, ProfileId, QualificationKey, StudentProfile, UploadDocument, UserId,
};
use super::repository::{ApplicationRepository, RepositoryError, StorageSession};
use crate::workflows::schemes::SchemeId;

type QualificationRow = (ProfileId, String, String, String);

/// Mutex-guarded tables with copy-on-write transactions.
///
/// Each transaction works on a private copy of the tables and swaps it in on success, so
/// transactions are serialized and a failed one leaves no trace. Natural keys double as
/// uniqueness constraints: a duplicate insert fails with `RepositoryError::Conflict`.
#[derive(Debug, Default)]
pub struct InMemoryApplicationRepository {
    tables: Mutex<Tables>,
}

impl InMemoryApplicationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StorageSession) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        // Committed tables are only ever replaced wholesale, so a poisoned lock still holds
        // a consistent snapshot.
        let mut guard = match self.tables.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("recovering application tables after a panicked transaction");
                poisoned.into_inner()
            }
        };

        let mut working = guard.clone();
        let session: &mut dyn StorageSession = &mut working;
        let outcome = work(session)?;
        *guard = working;
        Ok(outcome)
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    last_application_id: u64,
    last_profile_id: u64,
    applications: BTreeMap<ApplicationId, Application>,
    profiles: BTreeMap<ProfileId, StudentProfile>,
    documents: BTreeMap<(ProfileId, String), UploadDocument>,
    addresses: BTreeMap<(ProfileId, AddressKind), Address>,
    qualifications: BTreeMap<QualificationRow, AcademicQualification>,
}

impl Tables {
    fn require_profile(&self, id: ProfileId) -> Result<(), RepositoryError> {
        if self.profiles.contains_key(&id) {
            Ok(())
        } else {
            Err(RepositoryError::NotFound(format!("student profile {id}")))
        }
    }
}

fn qualification_row(profile: ProfileId, key: QualificationKey<'_>) -> QualificationRow {
    (
        profile,
        key.degree.to_string(),
        key.university.to_string(),
        key.course.to_string(),
    )
}

impl StorageSession for Tables {
    fn application(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.applications.get(&id).cloned())
    }

    fn application_for(
        &self,
        user: UserId,
        scheme: SchemeId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self
            .applications
            .values()
            .find(|application| application.user_id == user && application.scheme_id == scheme)
            .cloned())
    }

    fn applications_for_user(&self, user: UserId) -> Result<Vec<Application>, RepositoryError> {
        Ok(self
            .applications
            .values()
            .filter(|application| application.user_id == user)
            .cloned()
            .collect())
    }

    fn insert_application(
        &mut self,
        application: NewApplication,
    ) -> Result<Application, RepositoryError> {
        self.require_profile(application.student_profile_id)?;
        if self.application_for(application.user_id, application.scheme_id)?.is_some() {
            return Err(RepositoryError::Conflict(format!(
                "application for user {} and scheme {}",
                application.user_id, application.scheme_id
            )));
        }

        self.last_application_id += 1;
        let stored = Application {
            id: ApplicationId(self.last_application_id),
            user_id: application.user_id,
            scheme_id: application.scheme_id,
            student_profile_id: application.student_profile_id,
            is_draft: true,
            verified: false,
            status: ApplicationStatus::Draft,
            submitted_at: None,
            created_at: application.created_at,
            updated_at: application.created_at,
        };
        self.applications.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn update_application(&mut self, application: &Application) -> Result<(), RepositoryError> {
        match self.applications.get_mut(&application.id) {
            Some(row) => {
                *row = application.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!(
                "application {}",
                application.id
            ))),
        }
    }

    fn insert_profile(
        &mut self,
        user: UserId,
        at: DateTime<Utc>,
    ) -> Result<StudentProfile, RepositoryError> {
        self.last_profile_id += 1;
        let profile = StudentProfile::empty(ProfileId(self.last_profile_id), user, at);
        self.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    fn profile(&self, id: ProfileId) -> Result<Option<StudentProfile>, RepositoryError> {
        let Some(row) = self.profiles.get(&id) else {
            return Ok(None);
        };

        let mut profile = row.clone();
        profile.documents = self
            .documents
            .iter()
            .filter(|((owner, _), _)| *owner == id)
            .map(|(_, document)| document.clone())
            .collect();
        profile.addresses = self
            .addresses
            .iter()
            .filter(|((owner, _), _)| *owner == id)
            .map(|(_, address)| address.clone())
            .collect();
        profile.education_history = self
            .qualifications
            .iter()
            .filter(|((owner, ..), _)| *owner == id)
            .map(|(_, qualification)| qualification.clone())
            .collect();
        Ok(Some(profile))
    }

    fn update_profile(&mut self, profile: &StudentProfile) -> Result<(), RepositoryError> {
        self.require_profile(profile.id)?;
        let mut row = profile.clone();
        row.documents.clear();
        row.addresses.clear();
        row.education_history.clear();
        self.profiles.insert(row.id, row);
        Ok(())
    }

    fn document(
        &self,
        profile: ProfileId,
        name: &str,
    ) -> Result<Option<UploadDocument>, RepositoryError> {
        Ok(self.documents.get(&(profile, name.to_string())).cloned())
    }

    fn insert_document(
        &mut self,
        profile: ProfileId,
        document: UploadDocument,
    ) -> Result<(), RepositoryError> {
        self.require_profile(profile)?;
        let key = (profile, document.name.clone());
        if self.documents.contains_key(&key) {
            return Err(RepositoryError::Conflict(format!(
                "document '{}' for profile {profile}",
                document.name
            )));
        }
        self.documents.insert(key, document);
        Ok(())
    }

    fn update_document(
        &mut self,
        profile: ProfileId,
        document: &UploadDocument,
    ) -> Result<(), RepositoryError> {
        match self.documents.get_mut(&(profile, document.name.clone())) {
            Some(row) => {
                *row = document.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!(
                "document '{}' for profile {profile}",
                document.name
            ))),
        }
    }

    fn address(
        &self,
        profile: ProfileId,
        kind: AddressKind,
    ) -> Result<Option<Address>, RepositoryError> {
        Ok(self.addresses.get(&(profile, kind)).cloned())
    }

    fn insert_address(
        &mut self,
        profile: ProfileId,
        address: Address,
    ) -> Result<(), RepositoryError> {
        self.require_profile(profile)?;
        let key = (profile, address.kind);
        if self.addresses.contains_key(&key) {
            return Err(RepositoryError::Conflict(format!(
                "{} address for profile {profile}",
                address.kind
            )));
        }
        self.addresses.insert(key, address);
        Ok(())
    }

    fn update_address(
        &mut self,
        profile: ProfileId,
        address: &Address,
    ) -> Result<(), RepositoryError> {
        match self.addresses.get_mut(&(profile, address.kind)) {
            Some(row) => {
                *row = address.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!(
                "{} address for profile {profile}",
                address.kind
            ))),
        }
    }

    fn qualification(
        &self,
        profile: ProfileId,
        key: QualificationKey<'_>,
    ) -> Result<Option<AcademicQualification>, RepositoryError> {
        Ok(self
            .qualifications
            .get(&qualification_row(profile, key))
            .cloned())
    }

    fn insert_qualification(
        &mut self,
        profile: ProfileId,
        qualification: AcademicQualification,
    ) -> Result<(), RepositoryError> {
        self.require_profile(profile)?;
        let row = qualification_row(profile, qualification.key());
        if self.qualifications.contains_key(&row) {
            return Err(RepositoryError::Conflict(format!(
                "{} at {} for profile {profile}",
                qualification.degree, qualification.university
            )));
        }
        self.qualifications.insert(row, qualification);
        Ok(())
    }

    fn update_qualification(
        &mut self,
        profile: ProfileId,
        qualification: &AcademicQualification,
    ) -> Result<(), RepositoryError> {
        match self
            .qualifications
            .get_mut(&qualification_row(profile, qualification.key()))
        {
            Some(row) => {
                *row = qualification.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!(
                "{} at {} for profile {profile}",
                qualification.degree, qualification.university
            ))),
        }
    }
}
