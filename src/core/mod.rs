pub mod config;
pub mod error;
pub mod types;

pub use config::InitiativeConfig;
pub use error::{ConfigError, HostError, InitiativeError, Result};
