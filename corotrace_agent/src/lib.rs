pub mod agent;
pub mod config;

pub use agent::Agent;
pub use config::{AgentConfig, ConfigError, DumpFormat};
