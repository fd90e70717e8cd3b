#[cfg(feature = "server")]
pub mod cli;
pub mod toml_config;

use crate::core::namespace::KUBE_SYSTEM;
use crate::domain::model::ResourceKind;
use crate::domain::ports::{ComplianceSettings, ConfigProvider};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_aws_region, validate_namespace, validate_range, Validate,
};
use std::time::Duration;

/// Static configuration shared read-only by every admission request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSettings {
    pub region: String,
    pub target_namespace: String,
    pub critical_namespaces: Vec<String>,
    pub resource_kind: ResourceKind,
    pub compliance: ComplianceSettings,
    pub request_timeout: Option<Duration>,
}

impl WebhookSettings {
    pub fn new(region: impl Into<String>, target_namespace: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            target_namespace: target_namespace.into(),
            critical_namespaces: vec![KUBE_SYSTEM.to_string()],
            resource_kind: ResourceKind::default(),
            compliance: ComplianceSettings::default(),
            request_timeout: None,
        }
    }

    pub fn with_resource_kind(mut self, kind: ResourceKind) -> Self {
        self.resource_kind = kind;
        self
    }

    pub fn with_compliance(mut self, compliance: ComplianceSettings) -> Self {
        self.compliance = compliance;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

impl ConfigProvider for WebhookSettings {
    fn target_namespace(&self) -> &str {
        &self.target_namespace
    }

    fn critical_namespaces(&self) -> &[String] {
        &self.critical_namespaces
    }

    fn resource_kind(&self) -> ResourceKind {
        self.resource_kind
    }

    fn compliance(&self) -> ComplianceSettings {
        self.compliance
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }
}

impl Validate for WebhookSettings {
    fn validate(&self) -> Result<()> {
        validate_aws_region("registry_region", &self.region)?;
        validate_namespace("deployment_namespace", &self.target_namespace)?;
        for namespace in &self.critical_namespaces {
            validate_namespace("critical_namespaces", namespace)?;
        }
        if let Some(timeout) = self.request_timeout {
            validate_range("request_timeout_seconds", timeout.as_secs(), 1, 30)?;
        }

        tracing::info!("webhook configuration validation passed");
        Ok(())
    }
}
