use crate::domain::model::{ImageReference, TagOrDigest, DEFAULT_TAG};
use regex::Regex;
use std::sync::LazyLock;

/// Matches images served by ECR in commercial, China and GovCloud regions,
/// including FIPS endpoints:
/// `<account>.dkr.ecr(-fips).<region>.amazonaws.com(.cn)/<repository>...`
static ECR_IMAGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9][a-zA-Z0-9_-]*\.dkr\.(ecr|ecr-fips)\.[a-z][a-z0-9_-]*\.amazonaws\.com(\.cn)?.*",
    )
    .expect("ECR image pattern is a valid regex")
});

const DIGEST_MARKER: char = '@';

pub fn is_ecr_image(image: &str) -> bool {
    ECR_IMAGE_REGEX.is_match(image)
}

/// Splits `registry/rest` on the first `/`. Images without a path have no
/// repository and yield `None`.
pub fn split_registry(image: &str) -> Option<(&str, &str)> {
    image.split_once('/')
}

/// Splits `repository:tag` or `repository@sha256:digest` into the repository
/// and its version. A bare repository means the implicit `latest` tag.
pub fn split_reference(reference: &str) -> (&str, TagOrDigest) {
    if let Some((repository, digest)) = reference.split_once(DIGEST_MARKER) {
        return (repository, TagOrDigest::Digest(digest.to_string()));
    }
    match reference.split_once(':') {
        Some((repository, tag)) => (repository, TagOrDigest::Tag(tag.to_string())),
        None => (reference, TagOrDigest::Tag(DEFAULT_TAG.to_string())),
    }
}

impl ImageReference {
    /// Parses a full ECR image string. Returns `None` for non-ECR images and
    /// for images that carry no repository path.
    pub fn parse(raw: &str) -> Option<Self> {
        if !is_ecr_image(raw) {
            return None;
        }
        let (registry, remainder) = split_registry(raw)?;
        let (repository, version) = split_reference(remainder);
        tracing::trace!(registry, repository, ?version, "parsed image reference");
        Some(Self {
            raw: raw.to_string(),
            registry: registry.to_string(),
            repository: repository.to_string(),
            version,
        })
    }

    /// `repository:tag` or `repository@digest` exactly as written, without
    /// the registry.
    pub fn path(&self) -> &str {
        self.raw
            .strip_prefix(self.registry.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(&self.raw)
    }
}
