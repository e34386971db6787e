//! # fsml
//!
//! Long-lived interpretation sessions for fsml models: layered
//! configuration and an interpreter driven by an async line source.

pub mod config;
pub mod live;

pub use config::{Config, ConfigError, GeneratorConfig, SessionConfig};
pub use live::{LiveSession, SessionError, SessionSummary};
