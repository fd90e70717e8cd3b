use crate::core::reference::split_reference;
use crate::domain::model::{ComplianceVerdict, RepositoryMetadata, TagMutability, TagOrDigest};
use crate::domain::ports::{ComplianceSettings, RegistryClient};
use crate::utils::error::{ComplianceError, ServiceError};
use async_trait::async_trait;
use futures::future::try_join_all;

/// What a predicate gets to look at for one image.
pub struct PredicateInput<'a> {
    pub image: &'a str,
    pub version: &'a TagOrDigest,
    pub metadata: &'a RepositoryMetadata,
    pub registry: &'a dyn RegistryClient,
}

#[async_trait]
pub trait CompliancePredicate: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` when the image passes, `Ok(Some(reason))` when it does not.
    async fn evaluate(&self, input: &PredicateInput<'_>) -> Result<Option<String>, ServiceError>;
}

pub struct TagImmutability;

#[async_trait]
impl CompliancePredicate for TagImmutability {
    fn name(&self) -> &'static str {
        "tag-immutability"
    }

    async fn evaluate(&self, input: &PredicateInput<'_>) -> Result<Option<String>, ServiceError> {
        Ok(match input.metadata.tag_mutability {
            TagMutability::Immutable => None,
            TagMutability::Mutable => {
                Some("image tag immutability is not enabled".to_string())
            }
        })
    }
}

pub struct ScanOnPush;

#[async_trait]
impl CompliancePredicate for ScanOnPush {
    fn name(&self) -> &'static str {
        "scan-on-push"
    }

    async fn evaluate(&self, input: &PredicateInput<'_>) -> Result<Option<String>, ServiceError> {
        Ok((!input.metadata.scan_on_push).then(|| "image scan on push is not enabled".to_string()))
    }
}

pub struct NoCriticalVulnerabilities;

#[async_trait]
impl CompliancePredicate for NoCriticalVulnerabilities {
    fn name(&self) -> &'static str {
        "no-critical-vulnerabilities"
    }

    async fn evaluate(&self, input: &PredicateInput<'_>) -> Result<Option<String>, ServiceError> {
        let critical = input
            .registry
            .critical_finding_count(&input.metadata.name, input.version)
            .await?;
        Ok((critical > 0)
            .then(|| format!("image '{}' contains {critical} CRITICAL vulnerabilities", input.image)))
    }
}

/// Ordered list of predicates; the first failure decides.
#[derive(Default)]
pub struct CompliancePolicy {
    predicates: Vec<Box<dyn CompliancePredicate>>,
}

impl CompliancePolicy {
    /// Accepts every repository that exists.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: ComplianceSettings) -> Self {
        let mut policy = Self::empty();
        if settings.tag_immutability {
            policy = policy.with(TagImmutability);
        }
        if settings.scan_on_push {
            policy = policy.with(ScanOnPush);
        }
        if settings.no_critical_vulnerabilities {
            policy = policy.with(NoCriticalVulnerabilities);
        }
        policy
    }

    pub fn with(mut self, predicate: impl CompliancePredicate + 'static) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.predicates.iter().map(|p| p.name()).collect()
    }
}

pub struct ComplianceChecker<R: RegistryClient> {
    registry: R,
    policy: CompliancePolicy,
}

impl<R: RegistryClient> ComplianceChecker<R> {
    pub fn new(registry: R, policy: CompliancePolicy) -> Self {
        Self { registry, policy }
    }

    /// Checks one `repository:tag` / `repository@digest` image.
    pub async fn check(&self, image: &str) -> Result<ComplianceVerdict, ComplianceError> {
        let (repository, version) = split_reference(image);
        if repository.is_empty() {
            return Err(ComplianceError::InvalidRepositoryName {
                image: image.to_string(),
            });
        }

        let metadata = self
            .registry
            .describe_repository(repository)
            .await?
            .ok_or_else(|| ComplianceError::RepositoryNotFound {
                repository: repository.to_string(),
            })?;

        let input = PredicateInput {
            image,
            version: &version,
            metadata: &metadata,
            registry: &self.registry,
        };
        for predicate in &self.policy.predicates {
            if let Some(reason) = predicate.evaluate(&input).await? {
                tracing::warn!(
                    image,
                    repository,
                    predicate = predicate.name(),
                    %reason,
                    "compliance predicate failed"
                );
                return Ok(ComplianceVerdict {
                    image: image.to_string(),
                    compliant: false,
                    reason: Some(format!("{}: {reason}", predicate.name())),
                });
            }
        }

        tracing::debug!(image, repository, "repository is compliant");
        Ok(ComplianceVerdict {
            image: image.to_string(),
            compliant: true,
            reason: None,
        })
    }

    /// Checks all images concurrently and ANDs the verdicts. Verdicts keep
    /// input order; the first error drops the checks still in flight and is
    /// returned as is.
    pub async fn check_all(&self, images: &[String]) -> Result<bool, ComplianceError> {
        let verdicts = try_join_all(images.iter().map(|image| self.check(image))).await?;
        Ok(verdicts.iter().all(|verdict| verdict.compliant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct FakeRegistry {
        repositories: HashMap<String, RepositoryMetadata>,
        failing: Option<String>,
        slow: Option<String>,
        critical: u32,
        calls: AtomicUsize,
    }

    impl FakeRegistry {
        fn with_repo(mut self, name: &str, mutability: TagMutability, scan_on_push: bool) -> Self {
            self.repositories.insert(
                name.to_string(),
                RepositoryMetadata {
                    name: name.to_string(),
                    uri: None,
                    tag_mutability: mutability,
                    scan_on_push,
                },
            );
            self
        }
    }

    #[async_trait]
    impl RegistryClient for FakeRegistry {
        async fn describe_repository(
            &self,
            repository: &str,
        ) -> Result<Option<RepositoryMetadata>, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.slow.as_deref() == Some(repository) {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            if self.failing.as_deref() == Some(repository) {
                return Err(ServiceError::new("ecr", format!("throttled on {repository}")));
            }
            Ok(self.repositories.get(repository).cloned())
        }

        async fn critical_finding_count(
            &self,
            _repository: &str,
            _version: &TagOrDigest,
        ) -> Result<u32, ServiceError> {
            Ok(self.critical)
        }
    }

    #[tokio::test]
    async fn test_empty_policy_accepts_existing_repository() {
        let registry = FakeRegistry::default().with_repo("test-frontend", TagMutability::Mutable, false);
        let checker = ComplianceChecker::new(registry, CompliancePolicy::empty());

        let verdict = checker.check("test-frontend:abc").await.unwrap();
        assert!(verdict.compliant);
        assert_eq!(verdict.image, "test-frontend:abc");
    }

    #[tokio::test]
    async fn test_missing_repository() {
        let checker = ComplianceChecker::new(FakeRegistry::default(), CompliancePolicy::empty());
        let err = checker.check("test-frontend:notlatest").await.unwrap_err();
        assert!(err.to_string().contains("no repositories named 'test-frontend'"));
    }

    #[tokio::test]
    async fn test_empty_repository_name_is_rejected_before_lookup() {
        let checker = ComplianceChecker::new(FakeRegistry::default(), CompliancePolicy::empty());
        let err = checker.check(":tag").await.unwrap_err();
        assert!(matches!(err, ComplianceError::InvalidRepositoryName { .. }));
        assert_eq!(checker.registry.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_predicates_run_in_order() {
        let registry = FakeRegistry::default().with_repo("app-api", TagMutability::Mutable, false);
        let settings = ComplianceSettings {
            tag_immutability: true,
            scan_on_push: true,
            no_critical_vulnerabilities: true,
        };
        let policy = CompliancePolicy::from_settings(settings);
        assert_eq!(
            policy.names(),
            vec!["tag-immutability", "scan-on-push", "no-critical-vulnerabilities"]
        );

        let checker = ComplianceChecker::new(registry, policy);
        let verdict = checker.check("app-api:1").await.unwrap();
        assert!(!verdict.compliant);
        assert_eq!(
            verdict.reason.as_deref(),
            Some("tag-immutability: image tag immutability is not enabled")
        );
    }

    #[tokio::test]
    async fn test_critical_vulnerabilities_fail() {
        let mut registry = FakeRegistry::default().with_repo("app-api", TagMutability::Immutable, true);
        registry.critical = 2;
        let checker = ComplianceChecker::new(
            registry,
            CompliancePolicy::empty().with(NoCriticalVulnerabilities),
        );
        let verdict = checker.check("app-api@sha256:abc").await.unwrap();
        assert!(!verdict.compliant);
        assert!(verdict.reason.unwrap().contains("2 CRITICAL"));
    }

    #[tokio::test]
    async fn test_check_all_ands_results() {
        let registry = FakeRegistry::default()
            .with_repo("a-web", TagMutability::Immutable, true)
            .with_repo("b-web", TagMutability::Immutable, true);
        let policy = CompliancePolicy::from_settings(ComplianceSettings {
            tag_immutability: true,
            scan_on_push: true,
            no_critical_vulnerabilities: false,
        });
        let checker = ComplianceChecker::new(registry, policy);
        let images = vec!["a-web:1".to_string(), "b-web:2".to_string()];
        assert!(checker.check_all(&images).await.unwrap());
    }

    #[tokio::test]
    async fn test_check_all_is_false_when_any_image_fails_a_predicate() {
        let registry = FakeRegistry::default()
            .with_repo("a-web", TagMutability::Immutable, true)
            .with_repo("b-web", TagMutability::Immutable, false);
        let checker = ComplianceChecker::new(registry, CompliancePolicy::empty().with(ScanOnPush));

        let images = vec!["a-web:1".to_string(), "b-web:2".to_string()];
        assert!(!checker.check_all(&images).await.unwrap());
    }

    #[tokio::test]
    async fn test_check_all_fails_fast() {
        let mut registry = FakeRegistry::default().with_repo("a-web", TagMutability::Immutable, true);
        registry.slow = Some("a-web".to_string());
        registry.failing = Some("b-web".to_string());
        let checker = ComplianceChecker::new(registry, CompliancePolicy::empty());

        let images = vec!["a-web:1".to_string(), "b-web:2".to_string(), "c-web:3".to_string()];
        let started = Instant::now();
        let err = checker.check_all(&images).await.unwrap_err();

        assert_eq!(
            err,
            ComplianceError::Registry(ServiceError::new("ecr", "throttled on b-web"))
        );
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
