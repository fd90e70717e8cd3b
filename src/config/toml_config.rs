use crate::config::WebhookSettings;
use crate::domain::model::ResourceKind;
use crate::utils::error::{Result, WebhookError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex"));

/// Optional file-based overrides, layered on top of flags and environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub namespaces: Option<NamespacesConfig>,
    pub admission: Option<AdmissionConfig>,
    pub compliance: Option<ComplianceConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamespacesConfig {
    pub target: Option<String>,
    pub critical: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdmissionConfig {
    pub resource_kind: Option<ResourceKind>,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplianceConfig {
    pub tag_immutability: Option<bool>,
    pub scan_on_push: Option<bool>,
    pub no_critical_vulnerabilities: Option<bool>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| WebhookError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay
    /// as written.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_PATTERN
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// Overlays every value present in the file onto `settings`.
    pub fn apply(&self, mut settings: WebhookSettings) -> WebhookSettings {
        if let Some(namespaces) = &self.namespaces {
            if let Some(target) = &namespaces.target {
                settings.target_namespace = target.clone();
            }
            if let Some(critical) = &namespaces.critical {
                settings.critical_namespaces = critical.clone();
            }
        }
        if let Some(admission) = &self.admission {
            if let Some(kind) = admission.resource_kind {
                settings.resource_kind = kind;
            }
            match admission.request_timeout_seconds {
                Some(0) => settings.request_timeout = None,
                Some(seconds) => settings.request_timeout = Some(Duration::from_secs(seconds)),
                None => {}
            }
        }
        if let Some(compliance) = &self.compliance {
            let current = &mut settings.compliance;
            current.tag_immutability = compliance.tag_immutability.unwrap_or(current.tag_immutability);
            current.scan_on_push = compliance.scan_on_push.unwrap_or(current.scan_on_push);
            current.no_critical_vulnerabilities = compliance
                .no_critical_vulnerabilities
                .unwrap_or(current.no_critical_vulnerabilities);
        }
        settings
    }
}
