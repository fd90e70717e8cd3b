#[cfg(feature = "server")]
pub mod adapters;
pub mod admission;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "server")]
pub use config::cli::CliConfig;

pub use config::WebhookSettings;
pub use crate::core::{
    compliance::{ComplianceChecker, CompliancePolicy},
    pipeline::AdmissionPipeline,
    resolver::TagResolver,
};
pub use domain::ports::{ComplianceSettings, ConfigProvider, ParameterStore, RegistryClient};
pub use utils::error::{Result, WebhookError};
