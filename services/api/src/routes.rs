use crate::infra::AppState;
use axum::extract::{rejection::PathRejection, Path};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use beneficiary::workflows::applications::{
    application_router, ApplicationRepository, ApplicationService, UserDirectory,
};
use beneficiary::workflows::schemes::{SchemeCatalog, SchemeId};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

pub(crate) fn with_application_routes<R, C, U>(
    service: Arc<ApplicationService<R, C>>,
    users: Arc<U>,
) -> axum::Router
where
    R: ApplicationRepository + 'static,
    C: SchemeCatalog + 'static,
    U: UserDirectory + 'static,
{
    application_router(service, users)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/schemes/:scheme_id",
            axum::routing::get(scheme_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn scheme_endpoint(
    Extension(state): Extension<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> Response {
    let id = match path {
        Ok(Path(scheme_id)) => SchemeId(scheme_id),
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": rejection.body_text() })),
            )
                .into_response()
        }
    };
    match state.schemes.fetch(id) {
        Ok(Some(scheme)) => (StatusCode::OK, Json(scheme)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("scheme {id} not found") })),
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, scheme_id = %id, "scheme lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}
