use crate::domain::model::{RepositoryMetadata, TagMutability, TagOrDigest};
use crate::domain::ports::RegistryClient;
use crate::utils::error::ServiceError;
use async_trait::async_trait;
use aws_sdk_ecr::error::DisplayErrorContext;
use aws_sdk_ecr::operation::describe_repositories::DescribeRepositoriesError;
use aws_sdk_ecr::types::{FindingSeverity, ImageIdentifier, Repository};
use aws_sdk_ecr::Client as EcrClient;

const SERVICE: &str = "ecr";

/// [`RegistryClient`] backed by Amazon ECR.
#[derive(Debug, Clone)]
pub struct EcrRegistry {
    client: EcrClient,
}

impl EcrRegistry {
    pub fn new(client: EcrClient) -> Self {
        Self { client }
    }
}

fn to_metadata(repository: &Repository) -> RepositoryMetadata {
    // IMMUTABLE and IMMUTABLE_WITH_EXCLUSION both pin tags.
    let immutable = repository
        .image_tag_mutability()
        .is_some_and(|m| m.as_str().starts_with("IMMUTABLE"));
    RepositoryMetadata {
        name: repository.repository_name().unwrap_or_default().to_string(),
        uri: repository.repository_uri().map(str::to_string),
        tag_mutability: if immutable {
            TagMutability::Immutable
        } else {
            TagMutability::Mutable
        },
        scan_on_push: repository
            .image_scanning_configuration()
            .is_some_and(|c| c.scan_on_push()),
    }
}

#[async_trait]
impl RegistryClient for EcrRegistry {
    async fn describe_repository(
        &self,
        repository: &str,
    ) -> Result<Option<RepositoryMetadata>, ServiceError> {
        let result = self
            .client
            .describe_repositories()
            .repository_names(repository)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output.repositories().first().map(to_metadata)),
            Err(err) => match err.into_service_error() {
                DescribeRepositoriesError::RepositoryNotFoundException(_) => Ok(None),
                err => Err(ServiceError::new(
                    SERVICE,
                    DisplayErrorContext(&err).to_string(),
                )),
            },
        }
    }

    async fn critical_finding_count(
        &self,
        repository: &str,
        version: &TagOrDigest,
    ) -> Result<u32, ServiceError> {
        let image_id = match version {
            TagOrDigest::Tag(tag) => ImageIdentifier::builder().image_tag(tag).build(),
            TagOrDigest::Digest(digest) => ImageIdentifier::builder().image_digest(digest).build(),
        };

        let output = self
            .client
            .describe_image_scan_findings()
            .repository_name(repository)
            .image_id(image_id)
            .send()
            .await
            .map_err(|err| ServiceError::new(SERVICE, DisplayErrorContext(&err).to_string()))?;

        let critical = output
            .image_scan_findings()
            .and_then(|findings| findings.finding_severity_counts())
            .and_then(|counts| counts.get(&FindingSeverity::Critical))
            .copied()
            .unwrap_or(0);
        Ok(u32::try_from(critical).unwrap_or(0))
    }
}
