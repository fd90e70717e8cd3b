use std::collections::HashSet;

pub const KUBE_SYSTEM: &str = "kube-system";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceDecision {
    /// Cluster-critical namespace, never checked.
    Critical,
    /// Not the namespace this webhook enforces.
    OutOfScope,
    InScope,
}

impl NamespaceDecision {
    pub fn bypasses_checks(&self) -> bool {
        !matches!(self, NamespaceDecision::InScope)
    }
}

#[derive(Debug, Clone)]
pub struct NamespaceFilter {
    critical: HashSet<String>,
    target: String,
}

impl NamespaceFilter {
    pub fn new<I, S>(critical: I, target: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            critical: critical.into_iter().map(Into::into).collect(),
            target: target.into(),
        }
    }

    pub fn classify(&self, namespace: &str) -> NamespaceDecision {
        if self.critical.contains(namespace) {
            NamespaceDecision::Critical
        } else if namespace != self.target {
            // Only the configured namespace is enforced; everything else passes.
            NamespaceDecision::OutOfScope
        } else {
            NamespaceDecision::InScope
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}
