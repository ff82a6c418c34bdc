use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use super::auth::{require_basic_auth, AuthenticatedUser, UserDirectory};
use super::domain::{ApplicationId, StudentProfileInput};
use super::repository::{ApplicationRepository, ApplicationStatusView};
use super::service::{ApplicationService, ApplicationServiceError, FailureKind};
use crate::workflows::schemes::{SchemeCatalog, SchemeId};

/// Body accepted when opening a draft.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InitializeRequest {
    pub scheme_id: SchemeId,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    #[serde(flatten)]
    view: ApplicationStatusView,
    message: String,
}

/// Router exposing the application lifecycle behind Basic authentication.
pub fn application_router<R, C, U>(
    service: Arc<ApplicationService<R, C>>,
    users: Arc<U>,
) -> Router
where
    R: ApplicationRepository + 'static,
    C: SchemeCatalog + 'static,
    U: UserDirectory + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications",
            get(list_handler::<R, C>).post(initialize_handler::<R, C>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(get_handler::<R, C>).put(modify_handler::<R, C>),
        )
        .route(
            "/api/v1/applications/:application_id/submit",
            post(submit_handler::<R, C>),
        )
        .route(
            "/api/v1/applications/:application_id/withdraw",
            post(withdraw_handler::<R, C>),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            get(status_handler::<R, C>),
        )
        .route_layer(middleware::from_fn_with_state(
            users,
            require_basic_auth::<U>,
        ))
        .with_state(service)
}

/// HTTP status used for each failure class.
pub fn failure_status(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::NotFound => StatusCode::NOT_FOUND,
        FailureKind::Conflict => StatusCode::CONFLICT,
        FailureKind::Forbidden => StatusCode::FORBIDDEN,
        FailureKind::BadRequest => StatusCode::BAD_REQUEST,
        FailureKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn failure_response(err: ApplicationServiceError) -> Response {
    let status = failure_status(err.kind());
    if status.is_server_error() {
        error!(error = %err, "application request failed");
    } else {
        debug!(error = %err, %status, "application request rejected");
    }

    let mut payload = json!({ "error": err.to_string() });
    if let Some(violation) = err.violation() {
        payload["field"] = json!(violation.field());
    }
    (status, Json(payload)).into_response()
}

fn rejection_response(message: String) -> Response {
    debug!(%message, "malformed application request");
    let payload = json!({ "error": message });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

fn parse_application_id(
    path: Result<Path<u64>, PathRejection>,
) -> Result<ApplicationId, Response> {
    path.map(|Path(id)| ApplicationId(id))
        .map_err(|rejection| rejection_response(rejection.body_text()))
}

pub(crate) async fn list_handler<R, C>(
    State(service): State<Arc<ApplicationService<R, C>>>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: SchemeCatalog + 'static,
{
    match service.list(user) {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(err) => failure_response(err),
    }
}

pub(crate) async fn initialize_handler<R, C>(
    State(service): State<Arc<ApplicationService<R, C>>>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    payload: Result<Json<InitializeRequest>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: SchemeCatalog + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection.body_text()),
    };

    match service.initialize(user, request.scheme_id) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => failure_response(err),
    }
}

pub(crate) async fn get_handler<R, C>(
    State(service): State<Arc<ApplicationService<R, C>>>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    path: Result<Path<u64>, PathRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: SchemeCatalog + 'static,
{
    let application_id = match parse_application_id(path) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match service.get(user, application_id) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => failure_response(err),
    }
}

pub(crate) async fn modify_handler<R, C>(
    State(service): State<Arc<ApplicationService<R, C>>>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    path: Result<Path<u64>, PathRejection>,
    payload: Result<Json<StudentProfileInput>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: SchemeCatalog + 'static,
{
    let application_id = match parse_application_id(path) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let Json(edits) = match payload {
        Ok(payload) => payload,
        // An unknown or foreign application reports 404 before the body is judged.
        Err(rejection) => {
            return match service.get(user, application_id) {
                Ok(_) => rejection_response(rejection.body_text()),
                Err(err) => failure_response(err),
            }
        }
    };

    match service.modify(user, application_id, &edits) {
        Ok(outcome) => {
            let advisory = outcome.advisory.as_ref().map(|violation| {
                json!({
                    "error": violation.to_string(),
                    "field": violation.field(),
                })
            });
            let payload = json!({
                "application": outcome.record.application,
                "profile": outcome.record.profile,
                "merge": outcome.merge,
                "advisory": advisory,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => failure_response(err),
    }
}

pub(crate) async fn submit_handler<R, C>(
    State(service): State<Arc<ApplicationService<R, C>>>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    path: Result<Path<u64>, PathRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: SchemeCatalog + 'static,
{
    let application_id = match parse_application_id(path) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match service.submit(user, application_id) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => failure_response(err),
    }
}

pub(crate) async fn withdraw_handler<R, C>(
    State(service): State<Arc<ApplicationService<R, C>>>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    path: Result<Path<u64>, PathRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: SchemeCatalog + 'static,
{
    let application_id = match parse_application_id(path) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match service.withdraw(user, application_id) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => failure_response(err),
    }
}

pub(crate) async fn status_handler<R, C>(
    State(service): State<Arc<ApplicationService<R, C>>>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    path: Result<Path<u64>, PathRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: SchemeCatalog + 'static,
{
    let application_id = match parse_application_id(path) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match service.status(user, application_id) {
        Ok(view) => {
            let message = view.summary();
            (StatusCode::OK, Json(StatusResponse { view, message })).into_response()
        }
        Err(err) => failure_response(err),
    }
}
