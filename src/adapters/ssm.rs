use crate::domain::ports::ParameterStore;
use crate::utils::error::ServiceError;
use async_trait::async_trait;
use aws_sdk_ssm::error::DisplayErrorContext;
use aws_sdk_ssm::operation::get_parameter::GetParameterError;
use aws_sdk_ssm::Client as SsmClient;

/// [`ParameterStore`] backed by AWS Systems Manager Parameter Store.
#[derive(Debug, Clone)]
pub struct SsmParameterStore {
    client: SsmClient,
}

impl SsmParameterStore {
    pub fn new(client: SsmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn get_parameter(&self, name: &str) -> Result<Option<String>, ServiceError> {
        match self.client.get_parameter().name(name).send().await {
            Ok(output) => Ok(output
                .parameter()
                .and_then(|parameter| parameter.value())
                .map(str::to_string)),
            Err(err) => match err.into_service_error() {
                GetParameterError::ParameterNotFound(_) => Ok(None),
                err => Err(ServiceError::new(
                    "ssm",
                    DisplayErrorContext(&err).to_string(),
                )),
            },
        }
    }
}
