use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::applications::auth::{Credentials, InMemoryUserDirectory};
use crate::workflows::applications::completeness::DraftValidationMode;
use crate::workflows::applications::domain::{
    AcademicQualification, Address, AddressInput, AddressKind, ApplicationId, DocumentInput,
    EducationHistoryInput, NewApplication, ProfileId, QualificationKey, StudentProfile,
    StudentProfileInput, UploadDocument, UserId,
};
use crate::workflows::applications::repository::{
    ApplicationRepository, RepositoryError, StorageSession,
};
use crate::workflows::applications::store::InMemoryApplicationRepository;
use crate::workflows::applications::{application_router, Application, ApplicationService};
use crate::workflows::schemes::{
    CatalogError, Eligibility, InMemorySchemeCatalog, Scheme, SchemeCatalog, SchemeId,
};

pub(super) const STUDENT: UserId = UserId(1);
pub(super) const OTHER_STUDENT: UserId = UserId(2);
pub(super) const MERIT_SCHEME: SchemeId = SchemeId(5);
pub(super) const NEED_SCHEME: SchemeId = SchemeId(7);

pub(super) type MemoryService = ApplicationService<InMemoryApplicationRepository, InMemorySchemeCatalog>;

pub(super) fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 1, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn scheme(id: SchemeId, name: &str) -> Scheme {
    Scheme {
        id,
        name: name.to_string(),
        description: "Support for undergraduate study".to_string(),
        amount: 50_000.0,
        application_link: format!("https://scholarships.example.org/schemes/{id}"),
        start_date: NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date"),
        end_date: NaiveDate::from_ymd_opt(2025, 12, 31).expect("valid date"),
        status: "open".to_string(),
        eligibility: Eligibility {
            income_limit: Some(250_000.0),
            documents_required: vec!["Marksheet".to_string()],
            ..Eligibility::default()
        },
    }
}

pub(super) fn catalog() -> InMemorySchemeCatalog {
    InMemorySchemeCatalog::with_schemes([
        scheme(MERIT_SCHEME, "Merit Scholarship"),
        scheme(NEED_SCHEME, "Need Based Grant"),
    ])
}

pub(super) fn build_service() -> (MemoryService, Arc<InMemoryApplicationRepository>) {
    build_service_with_mode(DraftValidationMode::Advisory)
}

pub(super) fn build_service_with_mode(
    mode: DraftValidationMode,
) -> (MemoryService, Arc<InMemoryApplicationRepository>) {
    let repository = Arc::new(InMemoryApplicationRepository::new());
    let service = ApplicationService::new(repository.clone(), Arc::new(catalog()), mode);
    (service, repository)
}

pub(super) fn permanent_address() -> AddressInput {
    AddressInput {
        kind: "permanent".to_string(),
        street: "12 MG Road".to_string(),
        city: "Pune".to_string(),
        state: "Maharashtra".to_string(),
        postal_code: "411001".to_string(),
        country: "India".to_string(),
    }
}

pub(super) fn marksheet() -> DocumentInput {
    DocumentInput {
        name: "Marksheet".to_string(),
        url: "https://files.example.org/marksheet-v1.pdf".to_string(),
    }
}

pub(super) fn bachelors() -> EducationHistoryInput {
    EducationHistoryInput {
        degree: "B.Sc".to_string(),
        university: "University of Pune".to_string(),
        course: "Physics".to_string(),
        year_of_passing: 2024,
        grade: "A".to_string(),
    }
}

/// Edit carrying every field submission needs.
pub(super) fn complete_edits() -> StudentProfileInput {
    StudentProfileInput {
        full_name: Some("Asha Verma".to_string()),
        date_of_birth: NaiveDate::from_ymd_opt(2003, 4, 12),
        gender: Some("female".to_string()),
        phone_number: Some("+91 98765 43210".to_string()),
        qualification: Some("Undergraduate".to_string()),
        email: Some("asha@example.org".to_string()),
        national_id: Some("1234 5678 9012".to_string()),
        nationality: Some("Indian".to_string()),
        category: Some("General".to_string()),
        income: Some(180_000.0),
        is_international: None,
        documents: vec![marksheet()],
        addresses: vec![permanent_address()],
        education_history: vec![bachelors()],
    }
}

/// Profile that satisfies every submission rule.
pub(super) fn complete_profile() -> StudentProfile {
    let at = timestamp();
    let mut profile = StudentProfile::empty(ProfileId(1), STUDENT, at);
    profile.full_name = "Asha Verma".to_string();
    profile.email = "asha@example.org".to_string();
    profile.national_id = "1234 5678 9012".to_string();
    profile.phone_number = "+91 98765 43210".to_string();
    profile.date_of_birth = NaiveDate::from_ymd_opt(2003, 4, 12);
    profile.qualification = "Undergraduate".to_string();
    profile.nationality = "Indian".to_string();
    profile.category = "General".to_string();
    profile.income = 180_000.0;
    profile.documents = vec![UploadDocument {
        name: "Marksheet".to_string(),
        url: "https://files.example.org/marksheet-v1.pdf".to_string(),
        created_at: at,
        updated_at: at,
    }];
    profile.education_history = vec![AcademicQualification {
        degree: "B.Sc".to_string(),
        university: "University of Pune".to_string(),
        course: "Physics".to_string(),
        year_of_passing: 2024,
        grade: "A".to_string(),
        created_at: at,
        updated_at: at,
    }];
    profile.addresses = vec![Address {
        kind: AddressKind::Permanent,
        street: "12 MG Road".to_string(),
        city: "Pune".to_string(),
        state: "Maharashtra".to_string(),
        postal_code: "411001".to_string(),
        country: "India".to_string(),
        created_at: at,
        updated_at: at,
    }];
    profile
}

/// Opens a draft for `STUDENT` against the merit scheme and fills it in completely.
pub(super) fn completed_draft(service: &MemoryService) -> ApplicationId {
    let record = service
        .initialize(STUDENT, MERIT_SCHEME)
        .expect("draft created");
    service
        .modify(STUDENT, record.application.id, &complete_edits())
        .expect("edits applied");
    record.application.id
}

pub(super) fn load_profile(
    repository: &InMemoryApplicationRepository,
    application: ApplicationId,
) -> StudentProfile {
    repository
        .transaction(|session| {
            let stored = session
                .application(application)?
                .ok_or_else(|| RepositoryError::NotFound(format!("application {application}")))?;
            session
                .profile(stored.student_profile_id)?
                .ok_or_else(|| RepositoryError::NotFound("student profile".to_string()))
        })
        .expect("profile loads")
}

/// Catalog whose backend is down.
pub(super) struct UnavailableCatalog;

impl SchemeCatalog for UnavailableCatalog {
    fn fetch(&self, _id: SchemeId) -> Result<Option<Scheme>, CatalogError> {
        Err(CatalogError::Unavailable("catalog offline".to_string()))
    }
}

/// Repository whose sessions fail every address insert.
#[derive(Default)]
pub(super) struct FlakyRepository {
    pub(super) inner: InMemoryApplicationRepository,
}

impl ApplicationRepository for FlakyRepository {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StorageSession) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        self.inner.transaction(|session| {
            let mut flaky = FlakySession { inner: session };
            work(&mut flaky)
        })
    }
}

struct FlakySession<'a> {
    inner: &'a mut dyn StorageSession,
}

impl StorageSession for FlakySession<'_> {
    fn application(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        self.inner.application(id)
    }

    fn application_for(
        &self,
        user: UserId,
        scheme: SchemeId,
    ) -> Result<Option<Application>, RepositoryError> {
        self.inner.application_for(user, scheme)
    }

    fn applications_for_user(&self, user: UserId) -> Result<Vec<Application>, RepositoryError> {
        self.inner.applications_for_user(user)
    }

    fn insert_application(
        &mut self,
        application: NewApplication,
    ) -> Result<Application, RepositoryError> {
        self.inner.insert_application(application)
    }

    fn update_application(&mut self, application: &Application) -> Result<(), RepositoryError> {
        self.inner.update_application(application)
    }

    fn insert_profile(
        &mut self,
        user: UserId,
        at: DateTime<Utc>,
    ) -> Result<StudentProfile, RepositoryError> {
        self.inner.insert_profile(user, at)
    }

    fn profile(&self, id: ProfileId) -> Result<Option<StudentProfile>, RepositoryError> {
        self.inner.profile(id)
    }

    fn update_profile(&mut self, profile: &StudentProfile) -> Result<(), RepositoryError> {
        self.inner.update_profile(profile)
    }

    fn document(
        &self,
        profile: ProfileId,
        name: &str,
    ) -> Result<Option<UploadDocument>, RepositoryError> {
        self.inner.document(profile, name)
    }

    fn insert_document(
        &mut self,
        profile: ProfileId,
        document: UploadDocument,
    ) -> Result<(), RepositoryError> {
        self.inner.insert_document(profile, document)
    }

    fn update_document(
        &mut self,
        profile: ProfileId,
        document: &UploadDocument,
    ) -> Result<(), RepositoryError> {
        self.inner.update_document(profile, document)
    }

    fn address(
        &self,
        profile: ProfileId,
        kind: AddressKind,
    ) -> Result<Option<Address>, RepositoryError> {
        self.inner.address(profile, kind)
    }

    fn insert_address(
        &mut self,
        _profile: ProfileId,
        _address: Address,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("address table locked".to_string()))
    }

    fn update_address(
        &mut self,
        profile: ProfileId,
        address: &Address,
    ) -> Result<(), RepositoryError> {
        self.inner.update_address(profile, address)
    }

    fn qualification(
        &self,
        profile: ProfileId,
        key: QualificationKey<'_>,
    ) -> Result<Option<AcademicQualification>, RepositoryError> {
        self.inner.qualification(profile, key)
    }

    fn insert_qualification(
        &mut self,
        profile: ProfileId,
        qualification: AcademicQualification,
    ) -> Result<(), RepositoryError> {
        self.inner.insert_qualification(profile, qualification)
    }

    fn update_qualification(
        &mut self,
        profile: ProfileId,
        qualification: &AcademicQualification,
    ) -> Result<(), RepositoryError> {
        self.inner.update_qualification(profile, qualification)
    }
}

pub(super) fn users() -> InMemoryUserDirectory {
    InMemoryUserDirectory::from_credentials([
        Credentials::new("asha", "s3cret"),
        Credentials::new("ravi", "hunter2"),
    ])
}

pub(super) fn build_router() -> Router {
    let (service, _) = build_service();
    application_router(Arc::new(service), Arc::new(users()))
}

pub(super) fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// Request authenticated as `asha` (user 1).
pub(super) fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    request_as("asha", "s3cret", method, uri, body)
}

pub(super) fn request_as(
    username: &str,
    password: &str,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, basic_auth(username, password));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
