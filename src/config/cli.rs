use crate::config::toml_config::TomlConfig;
use crate::config::WebhookSettings;
use crate::domain::model::ResourceKind;
use crate::domain::ports::ComplianceSettings;
use crate::utils::error::{Result, WebhookError};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{validate_socket_addr, Validate};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "ecr-tag-webhook")]
#[command(about = "Mutating admission webhook pinning ECR images to their sanctioned tag")]
pub struct CliConfig {
    /// Region of the ECR registry and the SSM parameters.
    #[arg(long, env = "REGISTRY_REGION")]
    pub registry_region: Option<String>,

    #[arg(long, env = "AWS_DEFAULT_REGION", hide = true)]
    pub default_region: Option<String>,

    /// The only namespace whose workloads are checked and patched.
    #[arg(long, env = "DEPLOYMENT_NAMESPACE")]
    pub deployment_namespace: String,

    #[arg(long, env = "RESOURCE_KIND", default_value = "Deployment")]
    pub resource_kind: ResourceKind,

    #[arg(long, env = "CRITICAL_NAMESPACES", value_delimiter = ',', default_value = "kube-system")]
    pub critical_namespaces: Vec<String>,

    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// PEM certificate; with `--tls-key-file` the webhook serves HTTPS.
    #[arg(long, env = "TLS_CERT_FILE")]
    pub tls_cert_file: Option<PathBuf>,

    #[arg(long, env = "TLS_KEY_FILE")]
    pub tls_key_file: Option<PathBuf>,

    /// 0 leaves the deadline to the API server's webhook timeout.
    #[arg(long, env = "REQUEST_TIMEOUT_SECONDS", default_value = "0")]
    pub request_timeout_seconds: u64,

    #[arg(long, env = "REQUIRE_TAG_IMMUTABILITY")]
    pub require_tag_immutability: bool,

    #[arg(long, env = "REQUIRE_SCAN_ON_PUSH")]
    pub require_scan_on_push: bool,

    #[arg(long, env = "DENY_CRITICAL_VULNERABILITIES")]
    pub deny_critical_vulnerabilities: bool,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "LOG_FORMAT", default_value = "json")]
    pub log_format: LogFormat,

    /// Optional TOML file overriding namespace, admission and compliance settings.
    #[arg(long, env = "WEBHOOK_CONFIG")]
    pub config: Option<PathBuf>,
}

impl CliConfig {
    pub fn region(&self) -> Option<&str> {
        [&self.registry_region, &self.default_region]
            .into_iter()
            .filter_map(|region| region.as_deref())
            .find(|region| !region.is_empty())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        validate_socket_addr("listen_addr", &self.listen_addr)
    }

    /// Certificate and key paths, or `None` for plain HTTP.
    pub fn tls_files(&self) -> Result<Option<(PathBuf, PathBuf)>> {
        match (&self.tls_cert_file, &self.tls_key_file) {
            (Some(cert), Some(key)) => Ok(Some((cert.clone(), key.clone()))),
            (None, None) => Ok(None),
            _ => Err(WebhookError::ConfigError {
                message: "TLS_CERT_FILE and TLS_KEY_FILE must be set together".to_string(),
            }),
        }
    }

    /// Flags and environment first, then the optional TOML file on top.
    pub fn settings(&self) -> Result<WebhookSettings> {
        let region = self.region().ok_or_else(|| WebhookError::ConfigError {
            message: "REGISTRY_REGION or AWS_DEFAULT_REGION must be set".to_string(),
        })?;

        let mut settings = WebhookSettings::new(region, &self.deployment_namespace)
            .with_resource_kind(self.resource_kind)
            .with_compliance(ComplianceSettings {
                tag_immutability: self.require_tag_immutability,
                scan_on_push: self.require_scan_on_push,
                no_critical_vulnerabilities: self.deny_critical_vulnerabilities,
            });
        settings.critical_namespaces = self.critical_namespaces.clone();
        if self.request_timeout_seconds > 0 {
            settings = settings.with_request_timeout(Duration::from_secs(self.request_timeout_seconds));
        }

        if let Some(path) = &self.config {
            tracing::debug!(path = %path.display(), "loading config file");
            settings = TomlConfig::from_file(path)?.apply(settings);
        }

        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = CliConfig::try_parse_from([
            "ecr-tag-webhook",
            "--registry-region",
            "eu-west-1",
            "--deployment-namespace",
            "apps",
            "--resource-kind",
            "pod",
            "--critical-namespaces",
            "kube-system,kube-public",
            "--request-timeout-seconds",
            "8",
            "--require-scan-on-push",
        ])
        .unwrap();

        let settings = cli.settings().unwrap();
        assert_eq!(settings.region, "eu-west-1");
        assert_eq!(settings.resource_kind, ResourceKind::Pod);
        assert_eq!(settings.critical_namespaces, vec!["kube-system", "kube-public"]);
        assert_eq!(settings.request_timeout, Some(Duration::from_secs(8)));
        assert!(settings.compliance.scan_on_push);
        assert!(!settings.compliance.tag_immutability);
        assert_eq!(cli.listen_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_region_falls_back_to_default_region() {
        let cli = CliConfig::try_parse_from([
            "ecr-tag-webhook",
            "--registry-region",
            "",
            "--default-region",
            "ap-southeast-2",
            "--deployment-namespace",
            "apps",
        ])
        .unwrap();
        assert_eq!(cli.region(), Some("ap-southeast-2"));
    }

    #[test]
    fn test_tls_files_come_in_pairs() {
        let base = [
            "ecr-tag-webhook",
            "--registry-region",
            "us-east-1",
            "--deployment-namespace",
            "apps",
        ];

        let plain = CliConfig::try_parse_from(base).unwrap();
        assert!(plain.tls_files().unwrap().is_none());

        let both = CliConfig::try_parse_from(
            base.iter()
                .copied()
                .chain(["--tls-cert-file", "/certs/tls.crt", "--tls-key-file", "/certs/tls.key"]),
        )
        .unwrap();
        assert_eq!(
            both.tls_files().unwrap(),
            Some((PathBuf::from("/certs/tls.crt"), PathBuf::from("/certs/tls.key")))
        );

        let cert_only = CliConfig::try_parse_from(
            base.iter().copied().chain(["--tls-cert-file", "/certs/tls.crt"]),
        )
        .unwrap();
        assert!(matches!(
            cert_only.tls_files(),
            Err(WebhookError::ConfigError { .. })
        ));
    }
}
