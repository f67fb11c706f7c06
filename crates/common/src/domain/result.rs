use thiserror::Error;
use ultralight::PayloadError;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    #[error("Payload decode error: {0}")]
    PayloadDecodeError(String),

    #[error("Device not found: device {device_id} with api key {api_key}")]
    DeviceNotFound { api_key: String, device_id: String },

    #[error("Mapping error: {0}")]
    MappingError(String),

    #[error("Dispatch error: {0}")]
    DispatchError(String),

    #[error("Broker connection error: {0}")]
    ConnectionError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}

impl From<PayloadError> for DomainError {
    fn from(err: PayloadError) -> Self {
        DomainError::PayloadDecodeError(err.to_string())
    }
}
