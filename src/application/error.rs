use thiserror::Error;

use crate::{
    domain::error::DomainError,
    infra::error::{InfraError, describe_status},
    store::StoreError,
};

/// Failures surfaced to the user by application services.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{}", describe_status(*status, message.as_deref()))]
    Http { status: u16, message: Option<String> },
    #[error("invalid JSON in {origin}: {reason}")]
    DataParse { origin: String, reason: String },
    #[error("render job {job_id} did not finish within {timeout_ms} ms")]
    Timeout { job_id: String, timeout_ms: u64 },
    #[error("{kind} `{name}` not found")]
    NotFound { kind: &'static str, name: String },
    #[error(transparent)]
    Infra(InfraError),
    #[error(transparent)]
    Store(StoreError),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn data_parse(origin: impl Into<String>, err: &serde_json::Error) -> Self {
        Self::DataParse {
            origin: origin.into(),
            reason: err.to_string(),
        }
    }

    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// HTTP status of a server rejection, if this error is one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<InfraError> for AppError {
    fn from(err: InfraError) -> Self {
        match err {
            InfraError::Status { status, message } => Self::Http { status, message },
            other => Self::Infra(other),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, name } => Self::NotFound { kind, name },
            StoreError::Invalid(domain) => Self::from(domain),
            other => Self::Store(other),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Infra(InfraError::Io(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_become_http_errors() {
        let err = AppError::from(InfraError::status(402, Some("quota exceeded".into())));
        assert_eq!(err.http_status(), Some(402));
        assert_eq!(err.to_string(), "request failed (402): quota exceeded");

        let err = AppError::from(InfraError::status(500, None));
        assert_eq!(err.to_string(), "request failed with status 500");
    }

    #[test]
    fn store_not_found_maps_to_not_found() {
        let err = AppError::from(StoreError::NotFound {
            kind: "profile",
            name: "prod".into(),
        });
        assert!(matches!(err, AppError::NotFound { kind: "profile", .. }));
    }
}
