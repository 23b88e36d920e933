//! Tokens and the credentials bundle they are registered in.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    ENCRYPTING_TOKEN_NAME, FULL_TOKEN_NAME, INJECTING_TOKEN_NAME, ROLE_TOKEN_NAME,
    SESSION_TOKEN_NAME,
};
use crate::identifier::TokenIdentifier;

/// Tag distinguishing the credential shape a token carries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenKind(Cow<'static, str>);

impl TokenKind {
    /// Full long-lived credentials.
    pub const FULL: Self = Self(Cow::Borrowed(FULL_TOKEN_NAME));
    /// Session credentials.
    pub const SESSION: Self = Self(Cow::Borrowed(SESSION_TOKEN_NAME));
    /// Assumed role credentials.
    pub const ROLE: Self = Self(Cow::Borrowed(ROLE_TOKEN_NAME));
    /// Encryption secrets only.
    pub const ENCRYPTING: Self = Self(Cow::Borrowed(ENCRYPTING_TOKEN_NAME));
    /// Injected provider.
    pub const INJECTING: Self = Self(Cow::Borrowed(INJECTING_TOKEN_NAME));

    /// A kind with an arbitrary name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Kind name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key under which a token is registered in a [`CredentialsBundle`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceName(String);

impl ServiceName {
    /// A service name from text.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Service name of a filesystem: `scheme://host`.
    pub fn from_uri(uri: &Url) -> Self {
        Self(format!("{}://{}", uri.scheme(), uri.host_str().unwrap_or_default()))
    }

    /// Service name text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A transmittable token: an identifier tagged with its kind and service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    kind: TokenKind,
    service: ServiceName,
    identifier: TokenIdentifier,
}

impl Token {
    /// Wrap `identifier` for `service`; the kind is taken from the identifier.
    pub fn new(identifier: TokenIdentifier, service: ServiceName) -> Self {
        Self {
            kind: identifier.kind().clone(),
            service,
            identifier,
        }
    }

    /// Token kind.
    pub fn kind(&self) -> &TokenKind {
        &self.kind
    }

    /// Service the token was issued for.
    pub fn service(&self) -> &ServiceName {
        &self.service
    }

    /// Decoded identifier.
    pub fn identifier(&self) -> &TokenIdentifier {
        &self.identifier
    }

    /// Take the identifier out of the token.
    pub fn into_identifier(self) -> TokenIdentifier {
        self.identifier
    }
}

/// Tokens held by a process, keyed by service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialsBundle {
    tokens: BTreeMap<ServiceName, Token>,
}

impl CredentialsBundle {
    /// Create an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `token` under `alias`, replacing any token already there.
    pub fn add_token(&mut self, alias: ServiceName, token: Token) -> Option<Token> {
        self.tokens.insert(alias, token)
    }

    /// Token registered under `service`.
    pub fn token(&self, service: &ServiceName) -> Option<&Token> {
        self.tokens.get(service)
    }

    /// Remove the token registered under `service`.
    pub fn remove(&mut self, service: &ServiceName) -> Option<Token> {
        self.tokens.remove(service)
    }

    /// All tokens with the service they are registered under.
    pub fn tokens(&self) -> impl Iterator<Item = (&ServiceName, &Token)> {
        self.tokens.iter()
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the bundle has no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
