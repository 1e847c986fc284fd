//! Handle and credential error types.

use thiserror::Error;

use crate::status::Status;

/// Errors returned by [`Handle`](crate::Handle) operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// The service context could not be allocated.
    #[error("failed to allocate credential context")]
    Allocation,

    /// The credential service returned a non-success code.
    #[error("credential service error: {0}")]
    Service(Status),

    /// Input was rejected before reaching the service.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl HandleError {
    /// Returns the service status carried by this error, if any.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Service(status) => Some(*status),
            _ => None,
        }
    }
}

/// Errors returned by the high-level [`Credential`](crate::Credential) API.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The credential is invalid (already decoded and flagged by the service).
    #[error("invalid credential")]
    CredInvalid,

    /// The credential's time-to-live has elapsed.
    #[error("expired credential")]
    CredExpired,

    /// The credential was encoded in the future relative to the decoder.
    #[error("rewound credential")]
    CredRewound,

    /// The credential has already been decoded.
    #[error("replayed credential")]
    CredReplayed,

    /// The caller is not permitted to decode this credential.
    #[error("unauthorized credential decode")]
    CredUnauthorized,

    /// Time-to-live outside the accepted range.
    #[error("invalid time-to-live: {0}")]
    InvalidTtl(i32),

    /// Encoding failed.
    #[error("failed to encode: {message}")]
    Encode {
        /// Service status.
        status: Status,
        /// Service description of the failure.
        message: String,
    },

    /// Decoding failed for a reason other than the credential checks above.
    #[error("failed to decode: {message}")]
    Decode {
        /// Service status.
        status: Status,
        /// Service description of the failure.
        message: String,
    },

    /// Setting or reading a context option failed.
    #[error("failed to configure context: {message}")]
    Option {
        /// Service status.
        status: Status,
        /// Service description of the failure.
        message: String,
    },

    /// Handle-level failure.
    #[error(transparent)]
    Handle(#[from] HandleError),
}

impl CredentialError {
    /// Returns the service status behind this error, if one exists.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::CredInvalid => Some(Status::CRED_INVALID),
            Self::CredExpired => Some(Status::CRED_EXPIRED),
            Self::CredRewound => Some(Status::CRED_REWOUND),
            Self::CredReplayed => Some(Status::CRED_REPLAYED),
            Self::CredUnauthorized => Some(Status::CRED_UNAUTHORIZED),
            Self::Encode { status, .. }
            | Self::Decode { status, .. }
            | Self::Option { status, .. } => Some(*status),
            Self::Handle(e) => e.status(),
            Self::InvalidTtl(_) => None,
        }
    }
}
