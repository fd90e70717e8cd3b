use thiserror::Error;

/// Admission code for business denials caused by image or repository policy.
pub const NOT_ACCEPTABLE: u16 = 406;
/// Admission code for denials caused by missing operational metadata.
pub const PARAMETER_NOT_FOUND: u16 = 407;
pub const BAD_REQUEST: u16 = 400;

/// Failure reported by an external collaborator (registry or parameter store).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ServiceError {
    pub service: &'static str,
    pub message: String,
}

impl ServiceError {
    pub fn new(service: &'static str, message: impl Into<String>) -> Self {
        Self {
            service,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("webhook: missing Content-Type header")]
    MissingContentType,

    #[error("webhook: invalid content type {found:?}; expected application/json")]
    InvalidContentType { found: String },

    #[error("webhook: request body is empty")]
    EmptyBody,

    #[error("webhook: malformed admission review: {0}")]
    MalformedBody(#[source] serde_json::Error),

    #[error("webhook: unsupported admission api version {0:?}")]
    UnsupportedApiVersion(String),

    #[error("webhook: admission request was nil")]
    InvalidAdmission,

    #[error("webhook: admission request has no uid")]
    MissingCorrelationId,

    #[error("webhook: request did not include object")]
    ObjectNotFound,

    #[error("webhook: expected {expected} resource, got {found:?}")]
    UnexpectedResource { expected: &'static str, found: String },

    #[error("webhook: cannot decode {kind} object: {source}")]
    MalformedObject {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("webhook: no ecr images found in pod specification")]
    ImagesNotFound,

    #[error("webhook: only one ecr image is supported, found {count}")]
    MultiImagesNotSupported { count: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComplianceError {
    #[error("invalid repository name in image '{image}'")]
    InvalidRepositoryName { image: String },

    #[error(transparent)]
    Registry(#[from] ServiceError),

    #[error("no repositories named '{repository}' found")]
    RepositoryNotFound { repository: String },

    #[error("webhook: repository fails ecr criteria")]
    NotCompliant,

    #[error("compliance check cancelled: admission deadline exceeded")]
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("invalid repository name in image '{image}'")]
    InvalidRepositoryName { image: String },

    #[error("repository '{repository}' does not follow the <project>-<component> naming convention")]
    MalformedRepositoryName { repository: String },

    #[error(transparent)]
    ParameterStore(#[from] ServiceError),

    #[error("parameter '{key}' not found")]
    ParameterNotFound { key: String },

    #[error("tag resolution cancelled: admission deadline exceeded")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Compliance(#[from] ComplianceError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for {field}: {value:?} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Protocol,
    Extraction,
    Compliance,
    Resolution,
    Configuration,
    Internal,
}

impl WebhookError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            WebhookError::Protocol(_) => ErrorCategory::Protocol,
            WebhookError::Extraction(_) => ErrorCategory::Extraction,
            WebhookError::Compliance(_) => ErrorCategory::Compliance,
            WebhookError::Resolution(_) => ErrorCategory::Resolution,
            WebhookError::ConfigError { .. } | WebhookError::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            WebhookError::IoError(_) | WebhookError::SerializationError(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// Numeric code placed in the admission status object.
    pub fn status_code(&self) -> u16 {
        match self.category() {
            ErrorCategory::Protocol => BAD_REQUEST,
            ErrorCategory::Extraction | ErrorCategory::Compliance => NOT_ACCEPTABLE,
            ErrorCategory::Resolution => PARAMETER_NOT_FOUND,
            ErrorCategory::Configuration | ErrorCategory::Internal => 500,
        }
    }

    /// Kubernetes `StatusReason` string matching [`Self::status_code`].
    pub fn reason(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Protocol => "BadRequest",
            ErrorCategory::Extraction | ErrorCategory::Compliance => "NotAcceptable",
            ErrorCategory::Resolution => "NotFound",
            ErrorCategory::Configuration | ErrorCategory::Internal => "InternalError",
        }
    }
}

pub type Result<T> = std::result::Result<T, WebhookError>;
