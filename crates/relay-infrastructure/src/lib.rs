pub mod memory_incident_repository;
pub mod memory_session_store;
pub mod memory_window_store;
pub mod paths;
pub mod secret_service;
pub mod toml_provider_repository;

pub use crate::memory_incident_repository::InMemoryIncidentRepository;
pub use crate::memory_session_store::InMemorySessionStore;
pub use crate::memory_window_store::InMemoryWindowStore;
pub use crate::secret_service::SecretServiceImpl;
pub use crate::toml_provider_repository::TomlProviderRepository;
