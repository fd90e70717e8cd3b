// Adapters layer: AWS collaborators and the HTTP surface of the webhook.

pub mod ecr;
pub mod http;
pub mod ssm;

pub use ecr::EcrRegistry;
pub use http::create_webhook_router;
pub use ssm::SsmParameterStore;
