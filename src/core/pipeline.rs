use crate::admission::{
    AdmissionRequest, AdmissionReviewResponse, JsonPatch, RequestDecoder, ResponseBuilder,
};
use crate::core::compliance::{ComplianceChecker, CompliancePolicy};
use crate::core::extractor::ImageExtractor;
use crate::core::namespace::{NamespaceDecision, NamespaceFilter};
use crate::core::resolver::TagResolver;
use crate::domain::model::{AdmissionVerdict, ResourceKind};
use crate::domain::ports::{ConfigProvider, ParameterStore, RegistryClient};
use crate::utils::error::{
    ComplianceError, ExtractionError, ResolutionError, Result, WebhookError,
};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;

pub const COMPLIANT_MESSAGE: &str = "deployment contains compliant ecr repositories and images";

/// One admission decision per request: decode, scope by namespace, extract
/// ECR images, check compliance, resolve the sanctioned tag, patch.
pub struct AdmissionPipeline<R: RegistryClient, P: ParameterStore> {
    decoder: RequestDecoder,
    namespaces: NamespaceFilter,
    extractor: ImageExtractor,
    compliance: ComplianceChecker<R>,
    resolver: TagResolver<P>,
    request_timeout: Option<Duration>,
}

impl<R: RegistryClient, P: ParameterStore> AdmissionPipeline<R, P> {
    pub fn new<C: ConfigProvider>(registry: R, parameters: P, config: &C) -> Self {
        Self::with_policy(
            registry,
            parameters,
            config,
            CompliancePolicy::from_settings(config.compliance()),
        )
    }

    pub fn with_policy<C: ConfigProvider>(
        registry: R,
        parameters: P,
        config: &C,
        policy: CompliancePolicy,
    ) -> Self {
        tracing::info!(
            target_namespace = config.target_namespace(),
            critical_namespaces = ?config.critical_namespaces(),
            resource_kind = %config.resource_kind(),
            predicates = ?policy.names(),
            "admission pipeline configured"
        );
        Self {
            decoder: RequestDecoder::new(config.resource_kind()),
            namespaces: NamespaceFilter::new(
                config.critical_namespaces().iter().cloned(),
                config.target_namespace(),
            ),
            extractor: ImageExtractor::new(),
            compliance: ComplianceChecker::new(registry, policy),
            resolver: TagResolver::new(parameters),
            request_timeout: config.request_timeout(),
        }
    }

    pub fn resource_kind(&self) -> ResourceKind {
        self.decoder.expected_kind()
    }

    /// Answers one webhook call. Never fails: every outcome, including
    /// undecodable input, becomes an AdmissionReview envelope.
    pub async fn review(&self, content_type: Option<&str>, body: &[u8]) -> AdmissionReviewResponse {
        let request = match self.decoder.decode(content_type, body) {
            Ok(request) => request,
            Err(rejected) => {
                tracing::error!(error = %rejected.error, "error creating request from event");
                return ResponseBuilder::bad_request(rejected.schema, None, &rejected.error);
            }
        };

        let span = tracing::info_span!("admission", uid = %request.correlation_id);
        let verdict = self.evaluate(&request).instrument(span).await;
        tracing::info!(
            uid = %verdict.correlation_id,
            allowed = verdict.allowed,
            code = verdict.status_code,
            message = %verdict.status_message,
            patched = verdict.patch.is_some(),
            "responding with admission review"
        );
        ResponseBuilder::build(request.schema, &verdict)
    }

    /// Runs the state machine for an already decoded request.
    pub async fn evaluate(&self, request: &AdmissionRequest) -> AdmissionVerdict {
        match self.decide(request).await {
            Ok(verdict) => verdict,
            Err(err) => {
                tracing::error!(category = ?err.category(), error = %err, "admission denied");
                AdmissionVerdict::deny(
                    request.correlation_id.clone(),
                    err.status_code(),
                    err.reason(),
                    err.to_string(),
                )
            }
        }
    }

    async fn decide(&self, request: &AdmissionRequest) -> Result<AdmissionVerdict> {
        let uid = request.correlation_id.as_str();
        let deadline = self.request_timeout.map(|timeout| Instant::now() + timeout);

        let workload = self
            .decoder
            .decode_workload(request)
            .inspect_err(|err| {
                tracing::error!(stage = "decoding", error = %err, "error unmarshalling workload")
            })?;

        match self.namespaces.classify(&workload.namespace) {
            NamespaceDecision::Critical => {
                tracing::info!(
                    namespace = %workload.namespace,
                    "workload is in critical namespace, automatically passing"
                );
                return Ok(AdmissionVerdict::allow(
                    uid,
                    format!("namespace '{}' is critical, ecr checks skipped", workload.namespace),
                ));
            }
            NamespaceDecision::OutOfScope => {
                tracing::info!(
                    namespace = %workload.namespace,
                    target = self.namespaces.target(),
                    "workload is not in the deployment namespace, automatically passing"
                );
                return Ok(AdmissionVerdict::allow(
                    uid,
                    format!(
                        "namespace '{}' is not enforced, ecr checks skipped",
                        workload.namespace
                    ),
                ));
            }
            NamespaceDecision::InScope => {}
        }

        let extraction = self
            .extractor
            .extract(&workload)
            .inspect_err(|err| {
                tracing::error!(stage = "extraction", error = %err, "image extraction failed")
            })?;
        tracing::debug!(
            registry = %extraction.registry,
            images = ?extraction.images,
            "extracted ecr images"
        );

        let compliant = within(deadline, self.compliance.check_all(&extraction.images))
            .await
            .unwrap_or(Err(ComplianceError::Cancelled))
            .inspect_err(|err| {
                tracing::error!(
                    stage = "compliance",
                    images = ?extraction.images,
                    error = %err,
                    "error during compliance check"
                )
            })?;
        if !compliant {
            tracing::error!(
                stage = "compliance",
                images = ?extraction.images,
                "repository is not compliant"
            );
            return Err(ComplianceError::NotCompliant.into());
        }

        let resolved = within(
            deadline,
            self.resolver.resolve_all(&extraction.registry, &extraction.images),
        )
        .await
        .unwrap_or(Err(ResolutionError::Cancelled))
        .inspect_err(|err| {
            tracing::error!(
                stage = "resolution",
                images = ?extraction.images,
                error = %err,
                "error during parameter fetching"
            )
        })?;

        let target = resolved.first().ok_or(ExtractionError::ImagesNotFound)?;
        let patch = JsonPatch::replace_image(self.resource_kind(), &target.full_reference)
            .to_bytes()
            .map_err(WebhookError::SerializationError)?;
        tracing::info!(image = %target.full_reference, "patching first container image");

        Ok(AdmissionVerdict::allow(uid, COMPLIANT_MESSAGE).with_patch(patch))
    }
}

/// Runs `future` to completion, or until `deadline`, dropping it on expiry.
async fn within<F: Future>(deadline: Option<Instant>, future: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, future).await.ok(),
        None => Some(future.await),
    }
}
