use std::sync::Arc;

use concourse_core::gateway::{FlightSearchGateway, VisaGateway};
use concourse_core::identity::AuthProvider;
use concourse_saga::{BookingSagaCoordinator, VisaStatusAggregator};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthProvider>,
    pub visa: Arc<dyn VisaGateway>,
    pub flight_search: Arc<dyn FlightSearchGateway>,
    pub coordinator: Arc<BookingSagaCoordinator>,
    pub aggregator: Arc<VisaStatusAggregator>,
}
