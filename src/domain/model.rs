use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of workload the webhook is registered for.
///
/// The kind decides where the pod spec lives inside the admitted object and,
/// therefore, which JSON pointer the image patch targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResourceKind {
    Pod,
    #[default]
    Deployment,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "Pod",
            ResourceKind::Deployment => "Deployment",
        }
    }

    /// JSON pointer of the first container's image.
    pub fn first_image_path(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "/spec/containers/0/image",
            ResourceKind::Deployment => "/spec/template/spec/containers/0/image",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pod" => Ok(ResourceKind::Pod),
            "deployment" => Ok(ResourceKind::Deployment),
            other => Err(format!("unsupported resource kind: {other}")),
        }
    }
}

/// The parts of an admitted object this webhook reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workload {
    pub namespace: String,
    pub containers: Vec<Container>,
    pub init_containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Container {
    #[serde(default)]
    pub image: String,
}

impl Workload {
    /// Containers followed by init containers.
    pub fn all_containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.iter().chain(self.init_containers.iter())
    }
}

pub const DEFAULT_TAG: &str = "latest";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagOrDigest {
    Tag(String),
    /// Digest including its algorithm marker, e.g. `sha256:e5e2...`.
    Digest(String),
}

impl TagOrDigest {
    /// Suffix that reattaches this version to a repository path.
    pub fn suffix(&self) -> String {
        match self {
            TagOrDigest::Tag(tag) => format!(":{tag}"),
            TagOrDigest::Digest(digest) => format!("@{digest}"),
        }
    }

    pub fn is_digest(&self) -> bool {
        matches!(self, TagOrDigest::Digest(_))
    }
}

/// A fully parsed ECR image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub raw: String,
    pub registry: String,
    pub repository: String,
    pub version: TagOrDigest,
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}{}", self.registry, self.repository, self.version.suffix())
    }
}

/// ECR images found in a workload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    pub registry: String,
    /// `repository:tag` or `repository@digest`, unique, in first-seen order.
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplianceVerdict {
    pub image: String,
    pub compliant: bool,
    /// `<predicate>: <why>` for a non-compliant image.
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagMutability {
    Mutable,
    Immutable,
}

/// What the registry reports about one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryMetadata {
    pub name: String,
    pub uri: Option<String>,
    pub tag_mutability: TagMutability,
    pub scan_on_push: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub repository: String,
    pub tag: String,
    pub full_reference: String,
}

/// Decision returned to the cluster for one admission request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionVerdict {
    pub correlation_id: String,
    pub allowed: bool,
    pub status_code: u16,
    pub status_message: String,
    pub reason: Option<String>,
    pub patch: Option<Vec<u8>>,
}

impl AdmissionVerdict {
    pub fn allow(correlation_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            allowed: true,
            status_code: 200,
            status_message: message.into(),
            reason: None,
            patch: None,
        }
    }

    pub fn with_patch(mut self, patch: Vec<u8>) -> Self {
        self.patch = Some(patch);
        self
    }

    pub fn deny(
        correlation_id: impl Into<String>,
        status_code: u16,
        reason: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            allowed: false,
            status_code,
            status_message: message.into(),
            reason: Some(reason.to_string()),
            patch: None,
        }
    }
}
