use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use lease_onboarding::config::AppConfig;
use lease_onboarding::error::AppError;
use lease_onboarding::telemetry;
use lease_onboarding::workflows::onboarding::{
    EventBus, NotificationRetryScheduler, ScoringConfig, SubscriberLifecycle,
};
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryAccountRepository, InMemorySubscriberRepository, LoggingNotificationPort,
};
use crate::routes::with_onboarding_routes;

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

    let subscribers = Arc::new(InMemorySubscriberRepository::default());
    let accounts = Arc::new(InMemoryAccountRepository::default());
    let events = EventBus::default();
    let lifecycle = Arc::new(SubscriberLifecycle::new(
        subscribers,
        accounts.clone(),
        events.clone(),
        ScoringConfig::default(),
    ));

    // Drain lifecycle events into the log until a real downstream consumer
    // registers.
    let mut event_feed = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = event_feed.recv().await {
            info!(event_id = %event.id.0, payload = ?event.payload, "lifecycle event");
        }
    });

    let scheduler = NotificationRetryScheduler::new(
        accounts,
        Arc::new(LoggingNotificationPort),
        config.scheduler.settings(),
    );
    tokio::spawn(scheduler.run());

    let app = with_onboarding_routes(lifecycle)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(environment = ?config.environment, %addr, "lease onboarding service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
