//! Error types for delegation token bindings.

use thiserror::Error;

use crate::constants::{
    E_ALREADY_BOUND, E_NO_ARN, E_NO_CANONICAL_URI, E_NO_SESSION_TOKENS_FOR_ROLE_BINDING,
};
use crate::credentials::CredentialError;
use crate::service::ServiceState;
use crate::sts::StsError;
use crate::token::{ServiceName, TokenKind};

/// Errors raised while binding, issuing or redeeming delegation tokens.
///
/// Lifecycle violations ([`IllegalState`](Self::IllegalState),
/// [`AlreadyBound`](Self::AlreadyBound), [`NotBound`](Self::NotBound)) are
/// programming errors and must not be retried. Configuration errors name the
/// missing setting. Remote failures carry the [`StsError`] unchanged.
#[derive(Debug, Error)]
pub enum DelegationError {
    /// The service is not in the state the operation requires.
    #[error("Required State: {expected}; Actual State {actual}")]
    IllegalState {
        /// State the operation requires
        expected: ServiceState,
        /// State the service is in
        actual: ServiceState,
    },

    /// `bind_to_file_system` was invoked on an already bound service.
    #[error("{}", E_ALREADY_BOUND)]
    AlreadyBound,

    /// The service was initialized before being bound to a filesystem.
    #[error("{}", E_NO_CANONICAL_URI)]
    NotBound,

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The role binding has no role ARN to assume.
    #[error("{}", E_NO_ARN)]
    NoRoleArn,

    /// The role binding was asked to issue a token over session credentials.
    #[error("{}", E_NO_SESSION_TOKENS_FOR_ROLE_BINDING)]
    NoFullCredentialsForRole,

    /// A token was registered under the expected service but with another kind.
    #[error("Token under service {service} is of kind {found}; expected {expected}")]
    TokenKindMismatch {
        /// Service the token was registered under
        service: ServiceName,
        /// Kind the caller expected
        expected: TokenKind,
        /// Kind of the token found
        found: TokenKind,
    },

    /// A token identifier of another kind was presented to a binding.
    #[error("Token identifier is of kind {found}; binding expects {expected}")]
    IdentifierKindMismatch {
        /// Kind of the binding
        expected: TokenKind,
        /// Kind of the identifier
        found: TokenKind,
    },

    /// A token identifier lacks the material its kind requires.
    #[error("Invalid token identifier: {0}")]
    InvalidIdentifier(String),

    /// Credentials could not be resolved or failed validation.
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    /// The remote credential service failed.
    #[error("Remote credential service failure: {0}")]
    Remote(#[from] StsError),
}

impl DelegationError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
