//! ---
//! cs_section: "01-core-functionality"
//! cs_subsection: "module"
//! cs_type: "source"
//! cs_scope: "code"
//! cs_description: "Shared configuration and tracing bootstrap."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
//! Configuration loading and tracing bootstrap shared by the reconciler
//! libraries and the `cs-primitivectl` binary.

pub mod config;
pub mod logging;

pub use config::{AppConfig, CrmConfig, LoadedAppConfig, LoggingConfig, ReadinessConfig};
pub use logging::{init_tracing, LogFormat};
