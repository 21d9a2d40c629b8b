#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{AuditCommand, Cli, Command};
pub use toml_config::AppConfig;
