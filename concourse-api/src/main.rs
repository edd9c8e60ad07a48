use std::net::SocketAddr;
use std::sync::Arc;

use concourse_api::{app, AppState};
use concourse_gateway::{
    HttpAuthProvider, HttpBookingGateway, HttpFlightSearchGateway, HttpVisaGateway, RetryPolicy,
};
use concourse_saga::{BookingSagaCoordinator, VisaStatusAggregator};
use concourse_store::InMemorySagaStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "concourse_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = concourse_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Concourse gateway on port {}", config.server.port);

    let retry = RetryPolicy::new(config.retry.max_attempts, config.retry.base_delay());

    let auth = Arc::new(HttpAuthProvider::new(
        &config.downstreams.auth.base_url,
        config.downstreams.auth.deadline(),
        retry,
    ));
    let visa = Arc::new(HttpVisaGateway::new(
        &config.downstreams.visa.base_url,
        config.downstreams.visa.deadline(),
        retry,
    ));
    let booking = Arc::new(HttpBookingGateway::new(
        &config.downstreams.booking.base_url,
        config.downstreams.booking.deadline(),
        retry,
    ));
    let flight_search = Arc::new(HttpFlightSearchGateway::new(
        &config.downstreams.flight_search.base_url,
        config.downstreams.flight_search.deadline(),
        retry,
    ));

    let store = Arc::new(InMemorySagaStore::new());
    let coordinator = Arc::new(BookingSagaCoordinator::new(
        visa.clone(),
        booking.clone(),
        auth.clone(),
        store,
    ));
    let aggregator = Arc::new(VisaStatusAggregator::new(visa.clone(), booking.clone()));

    let app_state = AppState {
        auth,
        visa,
        flight_search,
        coordinator,
        aggregator,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
