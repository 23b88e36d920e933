//! Remote credential service (AWS STS).
//!
//! Session and role bindings mint credentials through a
//! [`SecurityTokenService`]. [`StsClient`] is the HTTP implementation;
//! anything else honoring the trait can stand in for it. Calls are made
//! once: retry and backoff belong to the transport, not to this crate.

mod client;
mod response;
mod signer;

pub use client::{SignedRequest, StsClient};

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::credentials::AwsCredentials;

/// Errors reported by the remote credential service.
#[derive(Debug, Clone, Error)]
pub enum StsError {
    /// The caller is not permitted to perform the request.
    #[error("STS denied the request: {code}: {message}")]
    Denied {
        /// AWS error code
        code: String,
        /// AWS error message
        message: String,
    },

    /// The caller has been throttled.
    #[error("STS throttled the request: {code}: {message}")]
    Throttled {
        /// AWS error code
        code: String,
        /// AWS error message
        message: String,
    },

    /// Any other service side failure.
    #[error("STS request failed with status {status}: {code}: {message}")]
    Service {
        /// HTTP status
        status: u16,
        /// AWS error code
        code: String,
        /// AWS error message
        message: String,
    },

    /// The request could not be delivered.
    #[error("STS transport error: {0}")]
    Transport(String),

    /// The response could not be parsed.
    #[error("Malformed STS response: {0}")]
    Response(String),

    /// The endpoint is not a usable URL.
    #[error("Invalid STS endpoint: {0}")]
    Endpoint(String),
}

/// Temporary credentials issued by STS.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    expiration: DateTime<Utc>,
}

impl SessionCredentials {
    /// Create session credentials.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
        expiration: DateTime<Utc>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.into(),
            expiration,
        }
    }

    /// Access key ID.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Session token.
    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    /// Expiry time.
    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    /// Convert into signing credentials.
    pub fn into_credentials(self) -> AwsCredentials {
        AwsCredentials::session(
            self.access_key_id,
            self.secret_access_key,
            self.session_token,
        )
    }
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

/// Parameters of an `AssumeRole` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleRequest {
    /// ARN of the role to assume
    pub role_arn: String,
    /// Session name recorded in CloudTrail
    pub session_name: String,
    /// Lifetime of the issued credentials
    pub duration: Duration,
    /// Optional JSON policy narrowing the role's permissions
    pub policy: Option<String>,
}

/// The remote service minting session and role credentials.
#[async_trait]
pub trait SecurityTokenService: Send + Sync {
    /// Request session credentials for the caller.
    async fn get_session_token(
        &self,
        caller: &AwsCredentials,
        duration: Duration,
    ) -> Result<SessionCredentials, StsError>;

    /// Assume a role on behalf of the caller.
    async fn assume_role(
        &self,
        caller: &AwsCredentials,
        request: &AssumeRoleRequest,
    ) -> Result<SessionCredentials, StsError>;
}
