use thiserror::Error;

use crate::domain::approval::ApprovalStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid approval transition from {from} to {to}")]
    InvalidTransition { from: ApprovalStatus, to: ApprovalStatus },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("failed to write storage key `{key}`: {message}")]
    Write { key: String, message: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<StorageError> for ApplicationError {
    fn from(value: StorageError) -> Self {
        Self::Persistence(value.to_string())
    }
}

/// Outward-facing error shape shared by every command surface.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String },
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl InterfaceError {
    /// Stable machine-readable class for command outcomes.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "invalid_argument",
            Self::ServiceUnavailable { .. } => "storage",
            Self::Internal { .. } => "internal",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message }
            | Self::ServiceUnavailable { message }
            | Self::Internal { message } => message,
        }
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(error) => Self::BadRequest { message: error.to_string() },
            ApplicationError::Persistence(message) => Self::ServiceUnavailable { message },
            ApplicationError::Configuration(message) => Self::Internal { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::approval::ApprovalStatus;
    use crate::errors::{ApplicationError, DomainError, InterfaceError, StorageError};

    #[test]
    fn domain_error_maps_to_bad_request_interface_error() {
        let interface = InterfaceError::from(ApplicationError::from(
            DomainError::InvalidArgument("approval title must not be empty".to_owned()),
        ));

        assert!(matches!(interface, InterfaceError::BadRequest { .. }));
        assert_eq!(interface.error_class(), "invalid_argument");
        assert!(interface.message().contains("title must not be empty"));
    }

    #[test]
    fn invalid_transition_names_both_statuses() {
        let error = DomainError::InvalidTransition {
            from: ApprovalStatus::Approved,
            to: ApprovalStatus::Rejected,
        };

        assert_eq!(error.to_string(), "invalid approval transition from approved to rejected");
    }

    #[test]
    fn storage_error_maps_to_service_unavailable() {
        let interface = InterfaceError::from(ApplicationError::from(StorageError::Unavailable(
            "database is locked".to_owned(),
        )));

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(interface.error_class(), "storage");
        assert_eq!(
            interface.message(),
            "storage backend unavailable: database is locked"
        );
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface =
            InterfaceError::from(ApplicationError::Configuration("unknown profile".to_owned()));

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.error_class(), "internal");
        assert_eq!(interface.message(), "unknown profile");
    }
}
