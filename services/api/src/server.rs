use crate::cli::ServeArgs;
use crate::infra::{apply_capacity_override, AppState};
use crate::routes::with_matching_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use mentorship_engine::config::AppConfig;
use mentorship_engine::error::AppError;
use mentorship_engine::matching::MatchingService;
use mentorship_engine::telemetry;
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
    apply_capacity_override(&mut config, args.strict_capacity);

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let directory = Arc::new(args.roster.load_directory()?);
    let matching_service = Arc::new(MatchingService::new(
        directory.clone(),
        directory,
        config.matching.clone(),
    ));

    let app = with_matching_routes(matching_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        capacity_mode = config.matching.allocation.capacity_mode.label(),
        "mentorship matching service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
