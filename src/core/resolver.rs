use crate::core::reference::split_reference;
use crate::domain::model::ResolvedImage;
use crate::domain::ports::ParameterStore;
use crate::utils::error::ResolutionError;
use futures::future::try_join_all;

const PROJECT_SEPARATOR: char = '-';

/// Parameter key holding the sanctioned tag of a repository named
/// `<project>-<component>`: `/<project>/<component>/ecr_tag`.
pub fn parameter_key(repository: &str) -> Result<String, ResolutionError> {
    match repository.split_once(PROJECT_SEPARATOR) {
        Some((project, component)) if !project.is_empty() && !component.is_empty() => {
            tracing::trace!(project, component, "derived parameter key");
            Ok(format!("/{project}/{component}/ecr_tag"))
        }
        _ => Err(ResolutionError::MalformedRepositoryName {
            repository: repository.to_string(),
        }),
    }
}

/// Looks up the tag each repository should run from the parameter store.
pub struct TagResolver<P: ParameterStore> {
    parameters: P,
}

impl<P: ParameterStore> TagResolver<P> {
    pub fn new(parameters: P) -> Self {
        Self { parameters }
    }

    /// Resolves `repository:tag` to `repository:<sanctioned tag>`. The
    /// returned `full_reference` is not registry-qualified.
    pub async fn resolve(&self, image: &str) -> Result<ResolvedImage, ResolutionError> {
        let (repository, _) = split_reference(image);
        if repository.is_empty() {
            return Err(ResolutionError::InvalidRepositoryName {
                image: image.to_string(),
            });
        }

        let key = parameter_key(repository)?;
        let tag = self
            .parameters
            .get_parameter(&key)
            .await?
            .ok_or_else(|| ResolutionError::ParameterNotFound { key: key.clone() })?;

        tracing::debug!(repository, %key, %tag, "resolved target tag");
        Ok(ResolvedImage {
            repository: repository.to_string(),
            full_reference: format!("{repository}:{tag}"),
            tag,
        })
    }

    /// Resolves all images concurrently and qualifies each with `registry`.
    /// Output order follows `images`; the first failure wins.
    pub async fn resolve_all(
        &self,
        registry: &str,
        images: &[String],
    ) -> Result<Vec<ResolvedImage>, ResolutionError> {
        try_join_all(images.iter().map(|image| async move {
            let mut resolved = self.resolve(image).await?;
            resolved.full_reference = format!("{registry}/{}", resolved.full_reference);
            Ok::<_, ResolutionError>(resolved)
        }))
        .await
    }
}
