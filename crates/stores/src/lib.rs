//! Adapters for the configuration store and the secret store.

pub mod config_service;
pub mod error;
pub mod secrets;

pub use config_service::ConfigurationServiceClient;
pub use error::{ClientError, Result};
pub use secrets::FileSecretStore;
