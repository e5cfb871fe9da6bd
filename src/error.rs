use crate::codec::UnknownCategory;
use crate::features::FeatureError;
use crate::model::ModelError;

/// Failures the service core reports to its callers
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("User not found")]
    NotFound,

    #[error("Prediction failed: {0}")]
    Prediction(#[from] ModelError),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid code")]
    InvalidCode,

    #[error("Invalid email address: {0}")]
    EmailSyntax(String),

    #[error("Failed to deliver verification email: {0}")]
    EmailDelivery(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    UnknownCategory(UnknownCategory),

    #[error("storage failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl From<FeatureError> for ServiceError {
    fn from(err: FeatureError) -> Self {
        match err {
            FeatureError::UnknownCategory(unknown) => ServiceError::UnknownCategory(unknown),
            other => ServiceError::Validation(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
