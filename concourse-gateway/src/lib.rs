pub mod auth;
pub mod booking;
pub mod flights;
pub mod retry;
pub mod visa;

mod http;

pub use auth::HttpAuthProvider;
pub use booking::HttpBookingGateway;
pub use flights::HttpFlightSearchGateway;
pub use retry::RetryPolicy;
pub use visa::HttpVisaGateway;
