pub mod compliance;
pub mod extractor;
pub mod namespace;
pub mod pipeline;
pub mod reference;
pub mod resolver;

pub use crate::domain::model::{AdmissionVerdict, ExtractionResult, ImageReference, Workload};
pub use crate::domain::ports::{ConfigProvider, ParameterStore, RegistryClient};
pub use crate::utils::error::Result;
