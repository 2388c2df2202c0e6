//! Sprig Client - HTTP gateway, configuration and CLI wiring
//!
//! Connects the tree cache to the remote service: [`RestTreeGateway`]
//! implements [`sprig_cache::TreeGateway`] over JSON HTTP, and
//! [`ClientConfig`] loads the TOML settings the `sprig` binary runs with.

pub mod config;
pub mod error;
pub mod gateway;
pub mod render;
pub mod telemetry;

pub use config::{AuthConfig, CacheSection, ClientConfig, ConfigError, CONFIG_ENV_VAR};
pub use error::{ClientError, ClientResult};
pub use gateway::RestTreeGateway;
pub use render::{render_entity, render_node};
pub use telemetry::{init_logging, LOG_ENV_VAR};
