//! Credentials as carried inside a token identifier.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AwsCredentials, CredentialError, CredentialProvider};
use crate::sts::SessionCredentials;

/// What kind of credentials a consumer will accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialTypeRequired {
    /// Anything with an access key and a secret key.
    AnyNonEmpty,
    /// Long-lived credentials without a session token.
    FullOnly,
    /// Session credentials with a session token.
    SessionOnly,
}

impl fmt::Display for CredentialTypeRequired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AnyNonEmpty => "any credentials",
            Self::FullOnly => "full credentials",
            Self::SessionOnly => "session credentials",
        })
    }
}

/// Credential material marshalled into a token identifier.
///
/// Empty strings stand for absent values so that a zero-valued instance is a
/// valid placeholder.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarshalledCredentials {
    access_key: String,
    secret_key: String,
    session_token: String,
    expiration: Option<DateTime<Utc>>,
    role_arn: Option<String>,
}

impl MarshalledCredentials {
    /// Marshall credentials resolved from a provider.
    pub fn from_credentials(credentials: &AwsCredentials) -> Self {
        Self {
            access_key: credentials.access_key_id().to_string(),
            secret_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().unwrap_or_default().to_string(),
            expiration: None,
            role_arn: None,
        }
    }

    /// Record the ARN of the role these credentials were issued for.
    pub fn with_role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self
    }

    /// Record when the credentials expire.
    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Access key.
    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// Secret key.
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    /// Session token, for session credentials.
    pub fn session_token(&self) -> Option<&str> {
        Some(self.session_token.as_str()).filter(|token| !token.is_empty())
    }

    /// Expiry time, for session credentials.
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    /// Role ARN the credentials were issued for.
    pub fn role_arn(&self) -> Option<&str> {
        self.role_arn.as_deref()
    }

    /// Whether no access or secret key is set.
    pub fn is_empty(&self) -> bool {
        self.access_key.is_empty() || self.secret_key.is_empty()
    }

    /// Whether a session token is present.
    pub fn has_session_token(&self) -> bool {
        !self.session_token.is_empty()
    }

    /// Check the credentials against `required` and the current time.
    pub fn validate(&self, required: CredentialTypeRequired) -> Result<(), CredentialError> {
        self.validate_at(required, Utc::now())
    }

    /// Check the credentials against `required` at `now`.
    pub fn validate_at(
        &self,
        required: CredentialTypeRequired,
        now: DateTime<Utc>,
    ) -> Result<(), CredentialError> {
        if self.is_empty() {
            return Err(CredentialError::Invalid(format!(
                "{required} required; no access key or secret key"
            )));
        }
        match required {
            CredentialTypeRequired::FullOnly if self.has_session_token() => {
                return Err(CredentialError::Invalid(format!(
                    "{required} required; found session credentials"
                )));
            }
            CredentialTypeRequired::SessionOnly if !self.has_session_token() => {
                return Err(CredentialError::Invalid(format!(
                    "{required} required; no session token"
                )));
            }
            _ => {}
        }
        match self.expiration {
            Some(expiration) if expiration <= now => Err(CredentialError::Expired(expiration)),
            _ => Ok(()),
        }
    }

    /// Convert into AWS credentials after validating them.
    pub fn to_credentials(
        &self,
        required: CredentialTypeRequired,
    ) -> Result<AwsCredentials, CredentialError> {
        self.validate(required)?;
        Ok(match self.session_token() {
            Some(token) => AwsCredentials::session(&self.access_key, &self.secret_key, token),
            None => AwsCredentials::new(&self.access_key, &self.secret_key),
        })
    }
}

impl From<SessionCredentials> for MarshalledCredentials {
    fn from(credentials: SessionCredentials) -> Self {
        let expiration = credentials.expiration();
        Self::from_credentials(&credentials.into_credentials()).with_expiration(expiration)
    }
}

impl fmt::Debug for MarshalledCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarshalledCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("session_token", &self.has_session_token())
            .field("expiration", &self.expiration)
            .field("role_arn", &self.role_arn)
            .finish()
    }
}

/// Provider serving credentials unmarshalled from a token.
#[derive(Debug, Clone)]
pub struct MarshalledCredentialProvider {
    name: String,
    credentials: MarshalledCredentials,
    required: CredentialTypeRequired,
}

impl MarshalledCredentialProvider {
    /// Create a provider for `credentials`, validated against `required` on
    /// every lookup.
    pub fn new(
        name: impl Into<String>,
        credentials: MarshalledCredentials,
        required: CredentialTypeRequired,
    ) -> Self {
        Self {
            name: name.into(),
            credentials,
            required,
        }
    }
}

impl CredentialProvider for MarshalledCredentialProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn credentials(&self) -> Result<AwsCredentials, CredentialError> {
        self.credentials.to_credentials(self.required)
    }
}
