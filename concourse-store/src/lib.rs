pub mod app_config;
pub mod saga_repo;

pub use saga_repo::InMemorySagaStore;
