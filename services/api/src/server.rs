use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryEventPublisher, InMemoryTenantRequestRepository, InMemoryWorkerRepository,
};
use crate::routes::with_maintenance_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::fs::File;
use std::io::BufReader;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tenant_maintenance::config::AppConfig;
use tenant_maintenance::error::AppError;
use tenant_maintenance::telemetry;
use tenant_maintenance::workflows::maintenance::{load_roster, MaintenanceService};
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let workers = Arc::new(InMemoryWorkerRepository::default());
    if let Some(path) = args.roster.take() {
        let roster = load_roster(BufReader::new(File::open(&path)?))?;
        let seeded = workers.seed(roster);
        info!(path = %path.display(), seeded, "worker roster loaded");
    }

    let service = Arc::new(MaintenanceService::new(
        Arc::new(InMemoryTenantRequestRepository::default()),
        workers,
        Arc::new(InMemoryEventPublisher::default()),
        config.maintenance.service_settings(),
    ));

    let app = with_maintenance_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "tenant maintenance service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
