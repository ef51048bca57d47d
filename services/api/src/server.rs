use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryContactRepository, InboxService, ListingService, TracingContactNotifier,
};
use crate::routes::with_platform_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rorstay::config::AppConfig;
use rorstay::error::AppError;
use rorstay::geocoding::geocoder_from_config;
use rorstay::listings::{seed, MemoryPropertyStore};
use rorstay::telemetry;
use rorstay::users::{Caller, UserRole};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

/// Identity used for listings loaded from a seed file.
const SEED_ACTOR: &str = "seed-import";

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

    let geocoder = Arc::new(geocoder_from_config(&config.maps)?);
    info!(
        provider = geocoder.inner().name(),
        cache_capacity = config.maps.cache_capacity,
        "geocoder configured"
    );
    let listing_service: Arc<ListingService> = Arc::new(ListingService::new(
        Arc::new(MemoryPropertyStore::default()),
        geocoder,
    ));

    if let Some(path) = args.seed.take() {
        let caller = Caller::new(SEED_ACTOR, UserRole::Admin);
        let report = seed::import_file(listing_service.as_ref(), &caller, &path).await?;
        info!(
            path = %path.display(),
            created = report.created,
            rejected = report.rejected,
            "seed listings loaded"
        );
    }

    let contact_service: Arc<InboxService> = Arc::new(InboxService::new(
        Arc::new(InMemoryContactRepository::default()),
        Arc::new(TracingContactNotifier),
    ));

    let app = with_platform_routes(listing_service, contact_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "listing service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
