//! AWS credentials and credential provider chains.
//!
//! A [`CredentialProviderList`] is the output of deploying or redeeming a
//! binding: an ordered chain of [`CredentialProvider`]s consulted when
//! signing requests. The first provider that yields credentials wins.

mod marshalled;

pub use marshalled::{CredentialTypeRequired, MarshalledCredentialProvider, MarshalledCredentials};

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Configuration;
use crate::constants::{ACCESS_KEY, SECRET_KEY, SESSION_TOKEN};

/// Provider reading full credentials from [`ACCESS_KEY`] and [`SECRET_KEY`].
pub const SIMPLE_CREDENTIALS_PROVIDER: &str = "simple";

/// Provider reading session credentials from [`ACCESS_KEY`], [`SECRET_KEY`]
/// and [`SESSION_TOKEN`].
pub const TEMPORARY_CREDENTIALS_PROVIDER: &str = "temporary";

/// Provider reading `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and
/// `AWS_SESSION_TOKEN` from the process environment.
pub const ENVIRONMENT_CREDENTIALS_PROVIDER: &str = "environment";

/// Providers consulted when none are configured.
pub const DEFAULT_CREDENTIALS_PROVIDERS: &[&str] = &[
    TEMPORARY_CREDENTIALS_PROVIDER,
    SIMPLE_CREDENTIALS_PROVIDER,
    ENVIRONMENT_CREDENTIALS_PROVIDER,
];

/// Errors raised by credential providers.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// A single provider has no credentials to offer.
    #[error("{provider}: {reason}")]
    Unavailable {
        /// Provider name
        provider: String,
        /// Why nothing was provided
        reason: String,
    },

    /// No provider in a chain yielded credentials.
    #[error("No AWS Credentials provided by {0}")]
    NoneProvided(String),

    /// A provider name could not be resolved.
    #[error("Unknown credential provider \"{0}\"")]
    UnknownProvider(String),

    /// Credentials are not of the required type.
    #[error("Invalid credentials: {0}")]
    Invalid(String),

    /// Credentials have expired.
    #[error("Credentials expired at {0}")]
    Expired(DateTime<Utc>),
}

/// AWS access key, secret key and optional session token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl AwsCredentials {
    /// Long-lived credentials.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Temporary session credentials.
    pub fn session(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            session_token: Some(session_token.into()),
            ..Self::new(access_key_id, secret_access_key)
        }
    }

    /// Access key ID.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Secret access key.
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Session token, for temporary credentials.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// Whether these are session (temporary) credentials.
    pub fn is_session(&self) -> bool {
        self.session_token.as_deref().is_some_and(|token| !token.is_empty())
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A source of AWS credentials.
pub trait CredentialProvider: Send + Sync {
    /// Provider name, used in error messages and logs.
    fn name(&self) -> &str;

    /// Resolve credentials.
    fn credentials(&self) -> Result<AwsCredentials, CredentialError>;
}

/// Credentials from a key/value source: configuration or the environment.
#[derive(Clone)]
struct KeyedCredentialsProvider {
    name: &'static str,
    access_key: Option<String>,
    secret_key: Option<String>,
    session_token: Option<String>,
    require_session: bool,
}

impl KeyedCredentialsProvider {
    fn unavailable(&self, reason: impl Into<String>) -> CredentialError {
        CredentialError::Unavailable {
            provider: self.name.to_string(),
            reason: reason.into(),
        }
    }
}

impl CredentialProvider for KeyedCredentialsProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn credentials(&self) -> Result<AwsCredentials, CredentialError> {
        let (Some(access_key), Some(secret_key)) = (&self.access_key, &self.secret_key) else {
            return Err(self.unavailable("access key or secret key is unset"));
        };
        if !self.require_session {
            return Ok(AwsCredentials::new(access_key, secret_key));
        }
        match &self.session_token {
            Some(token) => Ok(AwsCredentials::session(access_key, secret_key, token)),
            None => Err(self.unavailable("session token is unset")),
        }
    }
}

/// Full credentials from [`ACCESS_KEY`] and [`SECRET_KEY`]; any session
/// token is ignored.
pub fn simple_provider(config: &Configuration) -> Arc<dyn CredentialProvider> {
    Arc::new(KeyedCredentialsProvider {
        name: SIMPLE_CREDENTIALS_PROVIDER,
        access_key: config.get_trimmed(ACCESS_KEY).map(String::from),
        secret_key: config.get_trimmed(SECRET_KEY).map(String::from),
        session_token: None,
        require_session: false,
    })
}

/// Session credentials from [`ACCESS_KEY`], [`SECRET_KEY`] and
/// [`SESSION_TOKEN`].
pub fn temporary_provider(config: &Configuration) -> Arc<dyn CredentialProvider> {
    Arc::new(KeyedCredentialsProvider {
        name: TEMPORARY_CREDENTIALS_PROVIDER,
        access_key: config.get_trimmed(ACCESS_KEY).map(String::from),
        secret_key: config.get_trimmed(SECRET_KEY).map(String::from),
        session_token: config.get_trimmed(SESSION_TOKEN).map(String::from),
        require_session: true,
    })
}

/// Credentials from environment-style variables.
///
/// A session token is used when present.
pub fn environment_provider_from<I, K, V>(vars: I) -> Arc<dyn CredentialProvider>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut provider = KeyedCredentialsProvider {
        name: ENVIRONMENT_CREDENTIALS_PROVIDER,
        access_key: None,
        secret_key: None,
        session_token: None,
        require_session: false,
    };
    for (key, value) in vars {
        let value = value.into();
        if value.trim().is_empty() {
            continue;
        }
        match key.as_ref() {
            "AWS_ACCESS_KEY_ID" => provider.access_key = Some(value),
            "AWS_SECRET_ACCESS_KEY" => provider.secret_key = Some(value),
            "AWS_SESSION_TOKEN" => provider.session_token = Some(value),
            _ => {}
        }
    }
    provider.require_session = provider.session_token.is_some();
    Arc::new(provider)
}

/// Credentials from the process environment, captured at call time.
pub fn environment_provider() -> Arc<dyn CredentialProvider> {
    environment_provider_from(std::env::vars())
}

/// Resolve a provider by name against the configuration.
pub fn provider_by_name(
    name: &str,
    config: &Configuration,
) -> Result<Arc<dyn CredentialProvider>, CredentialError> {
    match name {
        SIMPLE_CREDENTIALS_PROVIDER => Ok(simple_provider(config)),
        TEMPORARY_CREDENTIALS_PROVIDER => Ok(temporary_provider(config)),
        ENVIRONMENT_CREDENTIALS_PROVIDER => Ok(environment_provider()),
        other => Err(CredentialError::UnknownProvider(other.to_string())),
    }
}

/// Ordered chain of credential providers.
#[derive(Clone, Default)]
pub struct CredentialProviderList {
    providers: Vec<Arc<dyn CredentialProvider>>,
}

impl CredentialProviderList {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a chain from the provider names listed under `key`, falling
    /// back to `defaults` when the key is unset.
    pub fn from_configuration(
        config: &Configuration,
        key: &str,
        defaults: &[&str],
    ) -> Result<Self, CredentialError> {
        let mut names = config.get_list(key);
        if names.is_empty() {
            names = defaults.iter().map(|name| name.to_string()).collect();
        }
        Self::from_names(&names, config)
    }

    /// Build a chain from provider names.
    pub fn from_names<S: AsRef<str>>(
        names: &[S],
        config: &Configuration,
    ) -> Result<Self, CredentialError> {
        names
            .iter()
            .map(|name| provider_by_name(name.as_ref(), config))
            .collect::<Result<Vec<_>, _>>()
            .map(|providers| Self { providers })
    }

    /// Append a provider, returning the updated chain.
    pub fn with(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.push(provider);
        self
    }

    /// Append a provider.
    pub fn push(&mut self, provider: Arc<dyn CredentialProvider>) {
        self.providers.push(provider);
    }

    /// Number of providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the chain has no providers.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Names of the providers, in order.
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|provider| provider.name()).collect()
    }

    /// Resolve credentials from the first provider that has them.
    pub fn credentials(&self) -> Result<AwsCredentials, CredentialError> {
        for provider in &self.providers {
            match provider.credentials() {
                Ok(credentials) => return Ok(credentials),
                Err(error) => {
                    tracing::debug!(provider = provider.name(), %error, "Provider has no credentials");
                }
            }
        }
        Err(CredentialError::NoneProvided(format!(
            "[{}]",
            self.names().join(", ")
        )))
    }
}

impl fmt::Debug for CredentialProviderList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialProviderList")
            .field("providers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Configuration {
        Configuration::new()
            .with(ACCESS_KEY, "AKIAEXAMPLE")
            .with(SECRET_KEY, "secret")
            .with(SESSION_TOKEN, "token")
    }

    #[test]
    fn it_returns_credentials_from_the_first_provider_that_has_them() {
        let chain = CredentialProviderList::from_names(
            &[TEMPORARY_CREDENTIALS_PROVIDER, SIMPLE_CREDENTIALS_PROVIDER],
            &Configuration::new()
                .with(ACCESS_KEY, "AKIAEXAMPLE")
                .with(SECRET_KEY, "secret"),
        )
        .unwrap();

        let credentials = chain.credentials().unwrap();
        assert_eq!(credentials.access_key_id(), "AKIAEXAMPLE");
        assert!(!credentials.is_session());
    }

    #[test]
    fn it_prefers_session_credentials_when_listed_first() {
        let chain = CredentialProviderList::from_configuration(
            &config(),
            "unset.key",
            DEFAULT_CREDENTIALS_PROVIDERS,
        )
        .unwrap();

        let credentials = chain.credentials().unwrap();
        assert_eq!(credentials.session_token(), Some("token"));
    }

    #[test]
    fn it_names_every_provider_when_none_has_credentials() {
        let chain = CredentialProviderList::from_names(
            &[TEMPORARY_CREDENTIALS_PROVIDER, SIMPLE_CREDENTIALS_PROVIDER],
            &Configuration::new(),
        )
        .unwrap();

        let error = chain.credentials().unwrap_err();
        assert_eq!(
            error.to_string(),
            "No AWS Credentials provided by [temporary, simple]"
        );
    }

    #[test]
    fn it_rejects_unknown_provider_names() {
        let error =
            CredentialProviderList::from_names(&["instance-profile"], &Configuration::new())
                .unwrap_err();
        assert!(matches!(error, CredentialError::UnknownProvider(name) if name == "instance-profile"));
    }

    #[test]
    fn it_reads_environment_variables() {
        let provider = environment_provider_from([
            ("AWS_ACCESS_KEY_ID", "AKIAENV"),
            ("AWS_SECRET_ACCESS_KEY", "env-secret"),
            ("AWS_SESSION_TOKEN", ""),
            ("HOME", "/root"),
        ]);
        let credentials = provider.credentials().unwrap();
        assert_eq!(credentials.access_key_id(), "AKIAENV");
        assert!(!credentials.is_session());
    }

    #[test]
    fn it_redacts_secrets_in_debug_output() {
        let credentials = AwsCredentials::session("AKIAEXAMPLE", "secret-value", "token-value");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("AKIAEXAMPLE"));
        assert!(!debug.contains("secret-value"));
        assert!(!debug.contains("token-value"));
    }
}
