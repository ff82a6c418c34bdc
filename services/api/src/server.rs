use crate::cli::ServeArgs;
use crate::infra::{default_scheme_catalog, user_directory, AppState};
use crate::routes::with_application_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use beneficiary::config::AppConfig;
use beneficiary::error::AppError;
use beneficiary::telemetry;
use beneficiary::workflows::applications::{ApplicationService, InMemoryApplicationRepository};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let schemes = Arc::new(default_scheme_catalog());
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        schemes: schemes.clone(),
    };

    let users = Arc::new(user_directory(&config.auth));
    if users.is_empty() {
        warn!("APP_USERS is empty; every application request will be rejected");
    }

    let repository = Arc::new(InMemoryApplicationRepository::new());
    let application_service = Arc::new(ApplicationService::new(
        repository,
        schemes,
        config.applications.draft_validation,
    ));

    let app = with_application_routes(application_service, users)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        draft_validation = %config.applications.draft_validation,
        "beneficiary service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
