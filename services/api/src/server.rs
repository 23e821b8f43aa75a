use crate::cli::ServeArgs;
use crate::infra::{default_reference_date, seed_demo_data, AppState};
use crate::routes::with_registration_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use delegation_registry::config::AppConfig;
use delegation_registry::error::AppError;
use delegation_registry::registration::{
    DecisionNotes, MemoryRegistryStore, RegistrationService, RegistryStore, RepositoryError,
};
use delegation_registry::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if args.seed_demo {
        config.registration.seed_demo = true;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(MemoryRegistryStore::new());
    if config.registration.seed_demo {
        store.transaction(|tx| -> Result<(), RepositoryError> {
            seed_demo_data(tx, default_reference_date())
        })?;
        info!("demo registry data seeded");
    }

    let notes = DecisionNotes::from(&config.registration);
    let registration_service = Arc::new(RegistrationService::new(store, notes));

    let app = with_registration_routes(registration_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "delegation registry ready");

    axum::serve(listener, app).await?;
    Ok(())
}
