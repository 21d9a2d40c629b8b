// Adapters layer: concrete implementations of the domain ports (config sources, audit storage).

pub mod audit_store;
pub mod config_source;

pub use audit_store::{FileAuditStore, InMemoryAuditStore};
pub use config_source::{HttpConfigSource, MockParameterSource, StaticConfigSource};
