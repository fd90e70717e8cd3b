use crate::domain::model::{RepositoryMetadata, ResourceKind, TagOrDigest};
use crate::utils::error::ServiceError;
use async_trait::async_trait;
use std::time::Duration;

/// Container registry lookups used by the compliance checker.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// `Ok(None)` when the registry has no repository with that name.
    async fn describe_repository(
        &self,
        repository: &str,
    ) -> Result<Option<RepositoryMetadata>, ServiceError>;

    /// Number of CRITICAL findings in the image's latest scan.
    async fn critical_finding_count(
        &self,
        repository: &str,
        version: &TagOrDigest,
    ) -> Result<u32, ServiceError>;
}

/// Hierarchical key/value store holding the sanctioned tag per repository.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// `Ok(None)` when the key does not exist.
    async fn get_parameter(&self, name: &str) -> Result<Option<String>, ServiceError>;
}

/// Which compliance predicates are switched on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComplianceSettings {
    pub tag_immutability: bool,
    pub scan_on_push: bool,
    pub no_critical_vulnerabilities: bool,
}

pub trait ConfigProvider: Send + Sync {
    fn target_namespace(&self) -> &str;
    fn critical_namespaces(&self) -> &[String];
    fn resource_kind(&self) -> ResourceKind;
    fn compliance(&self) -> ComplianceSettings;
    /// Deadline for one admission review; `None` inherits the caller's.
    fn request_timeout(&self) -> Option<Duration>;
}
