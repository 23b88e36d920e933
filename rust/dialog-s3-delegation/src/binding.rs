//! Delegation token bindings.
//!
//! A binding decides how a token's credential material is produced and how a
//! presented token is turned back into credentials. Every binding implements
//! [`TokenBinding`]; [`Binding`] is the closed set of bindings selectable by
//! configuration. Callers drive a binding through the trait only:
//!
//! ```text
//! bind_to_file_system -> init -> start -> create_delegation_token / bind_to_token_identifier -> stop
//! ```

mod encrypting;
mod full;
mod injecting;
mod role;
mod secondary;
mod session;

pub use encrypting::EncryptingBinding;
pub use full::FullCredentialsBinding;
pub use injecting::InjectingBinding;
pub use role::RoleBinding;
pub use secondary::SecondaryBinding;
pub use session::SessionBinding;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use url::Url;

use crate::DelegationError;
use crate::config::Configuration;
use crate::constants::{
    DELEGATION_TOKEN_ENCRYPTING_BINDING, DELEGATION_TOKEN_FULL_CREDENTIALS_BINDING,
    DELEGATION_TOKEN_INJECTING_BINDING, DELEGATION_TOKEN_ROLE_BINDING,
    DELEGATION_TOKEN_SESSION_BINDING,
};
use crate::context::StoreContext;
use crate::credentials::CredentialProviderList;
use crate::encryption::EncryptionSecrets;
use crate::identifier::TokenIdentifier;
use crate::lookup::lookup_token;
use crate::policy::Policy;
use crate::service::{ServiceBase, ServiceState};
use crate::sts::SecurityTokenService;
use crate::token::{CredentialsBundle, ServiceName, Token, TokenKind};

/// Whether a binding can mint tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenIssuingPolicy {
    /// Tokens carrying credentials may be issued.
    MayIssueTokens,
    /// Tokens may be requested but carry no AWS credentials.
    RequestsOnly,
    /// No tokens are issued.
    NoTokensAvailable,
}

/// State every binding carries: its lifecycle, the bound token and the
/// identifier it was last bound to.
#[derive(Debug)]
pub struct BindingCore {
    base: ServiceBase,
    bound_token: Option<Token>,
    decoded_identifier: Option<TokenIdentifier>,
}

impl BindingCore {
    /// Core for a binding called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: ServiceBase::new(name),
            bound_token: None,
            decoded_identifier: None,
        }
    }

    /// Lifecycle of the binding.
    pub fn base(&self) -> &ServiceBase {
        &self.base
    }

    /// Mutable lifecycle of the binding.
    pub fn base_mut(&mut self) -> &mut ServiceBase {
        &mut self.base
    }

    /// Run the base init then `init`; the service is stopped if either fails.
    pub fn init_with<T>(
        &mut self,
        config: &Configuration,
        init: impl FnOnce(&Configuration) -> Result<T, DelegationError>,
    ) -> Result<T, DelegationError> {
        self.base.init(config)?;
        init(config).inspect_err(|_| self.base.fail())
    }

    /// Fresh identifier of `kind` for the bound filesystem.
    pub fn new_identifier(
        &self,
        kind: TokenKind,
        secrets: &EncryptionSecrets,
        renewer: Option<&str>,
    ) -> Result<TokenIdentifier, DelegationError> {
        let (Some(uri), Some(owner)) = (self.base.canonical_uri(), self.base.owner()) else {
            return Err(DelegationError::NotBound);
        };
        let origin = format!(
            "Created by {} for {} at {}",
            owner,
            uri,
            Utc::now().to_rfc3339()
        );
        Ok(TokenIdentifier::new(kind, uri.clone(), owner.clone())
            .with_renewer(renewer)
            .with_origin(origin)
            .with_encryption_secrets(secrets.clone()))
    }

    /// Remember the identifier the binding was bound to.
    pub fn record_decoded(&mut self, identifier: TokenIdentifier) {
        self.decoded_identifier = Some(identifier);
    }

    /// Remember the token most recently created or bound.
    pub fn set_bound_token(&mut self, token: Option<Token>) {
        self.bound_token = token;
    }
}

/// User agent suffix naming the session a binding was bound to.
fn session_user_agent(identifier: Option<&TokenIdentifier>) -> String {
    identifier
        .map(|identifier| format!("; session ID {}", identifier.uuid()))
        .unwrap_or_default()
}

/// A delegation token binding.
#[async_trait]
pub trait TokenBinding: Send + Sync {
    /// Shared binding state.
    fn core(&self) -> &BindingCore;

    /// Mutable shared binding state.
    fn core_mut(&mut self) -> &mut BindingCore;

    /// Kind of token this binding issues and accepts.
    fn kind(&self) -> TokenKind;

    /// Name used in logs.
    fn name(&self) -> &str {
        self.core().base.name()
    }

    /// Lifecycle state.
    fn state(&self) -> ServiceState {
        self.core().base.state()
    }

    /// Service tokens are registered under; derived from the filesystem URI
    /// once bound.
    fn service_text(&self) -> Option<ServiceName> {
        self.core().base.canonical_uri().map(ServiceName::from_uri)
    }

    /// Owner of the filesystem the binding is bound to.
    fn owner_text(&self) -> Option<String> {
        self.core()
            .base
            .owner()
            .map(|owner| owner.user_name().to_string())
    }

    /// Whether the binding can mint tokens.
    fn token_issuing_policy(&self) -> TokenIssuingPolicy {
        TokenIssuingPolicy::MayIssueTokens
    }

    /// Token most recently created or bound.
    fn bound_token(&self) -> Option<&Token> {
        self.core().bound_token.as_ref()
    }

    /// Identifier the binding was last bound to.
    fn decoded_identifier(&self) -> Option<&TokenIdentifier> {
        self.core().decoded_identifier.as_ref()
    }

    /// Attach the owning filesystem; must precede [`init`](Self::init).
    fn bind_to_file_system(
        &mut self,
        uri: Url,
        store_context: StoreContext,
    ) -> Result<(), DelegationError> {
        self.core_mut().base.bind_to_file_system(uri, store_context)
    }

    /// Read configuration.
    fn init(&mut self, config: &Configuration) -> Result<(), DelegationError>;

    /// Go live.
    fn start(&mut self) -> Result<(), DelegationError> {
        self.core_mut().base.start()
    }

    /// Shut down.
    fn stop(&mut self) {
        self.core_mut().base.stop()
    }

    /// Build an identifier carrying this binding's credential material.
    ///
    /// `policy` narrows the permissions of issued credentials where the
    /// binding supports it.
    async fn create_token_identifier(
        &self,
        policy: Option<&Policy>,
        secrets: &EncryptionSecrets,
        renewer: Option<&str>,
    ) -> Result<TokenIdentifier, DelegationError>;

    /// Create a token for this binding's service and record it as the bound
    /// token.
    async fn create_delegation_token(
        &mut self,
        policy: Option<&Policy>,
        secrets: &EncryptionSecrets,
        renewer: Option<&str>,
    ) -> Result<Token, DelegationError> {
        let identifier = self
            .create_token_identifier(policy, secrets, renewer)
            .await?;
        let service = self.service_text().ok_or(DelegationError::NotBound)?;
        debug!(binding = self.name(), %service, %identifier, "Created delegation token");
        let token = Token::new(identifier, service);
        self.core_mut().set_bound_token(Some(token.clone()));
        Ok(token)
    }

    /// Credentials for a process holding no token, from local configuration.
    fn deploy_unbonded(&self) -> Result<CredentialProviderList, DelegationError>;

    /// Redeem an identifier into credentials, recording it as the decoded
    /// identifier.
    fn bind_to_token_identifier(
        &mut self,
        identifier: TokenIdentifier,
    ) -> Result<CredentialProviderList, DelegationError>;

    /// Look up this binding's token in `bundle` and record it as the bound
    /// token. Absence is not an error.
    fn bind_to_token(
        &mut self,
        bundle: &CredentialsBundle,
    ) -> Result<Option<Token>, DelegationError> {
        self.core().base.require_started()?;
        let service = self.service_text().ok_or(DelegationError::NotBound)?;
        let token = lookup_token(bundle, &service, &self.kind())?;
        self.core_mut().set_bound_token(token.clone());
        Ok(token)
    }

    /// Zero valued identifier for a decoder to fill in.
    fn create_empty_identifier(&self) -> TokenIdentifier {
        TokenIdentifier::empty(self.kind())
    }

    /// Human readable description.
    fn description(&self) -> String;

    /// Suffix for the user agent of requests signed with this binding.
    fn user_agent_field(&self) -> String {
        String::new()
    }
}

/// Bindings selectable by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// [`FullCredentialsBinding`]
    Full,
    /// [`SessionBinding`]
    Session,
    /// [`RoleBinding`]
    Role,
    /// [`EncryptingBinding`]
    Encrypting,
    /// [`InjectingBinding`]
    Injecting,
}

impl BindingKind {
    /// Configuration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => DELEGATION_TOKEN_FULL_CREDENTIALS_BINDING,
            Self::Session => DELEGATION_TOKEN_SESSION_BINDING,
            Self::Role => DELEGATION_TOKEN_ROLE_BINDING,
            Self::Encrypting => DELEGATION_TOKEN_ENCRYPTING_BINDING,
            Self::Injecting => DELEGATION_TOKEN_INJECTING_BINDING,
        }
    }

    /// Kind of the tokens the binding issues.
    pub fn token_kind(&self) -> TokenKind {
        match self {
            Self::Full => TokenKind::FULL,
            Self::Session => TokenKind::SESSION,
            Self::Role => TokenKind::ROLE,
            Self::Encrypting => TokenKind::ENCRYPTING,
            Self::Injecting => TokenKind::INJECTING,
        }
    }
}

impl FromStr for BindingKind {
    type Err = DelegationError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            DELEGATION_TOKEN_FULL_CREDENTIALS_BINDING => Ok(Self::Full),
            DELEGATION_TOKEN_SESSION_BINDING => Ok(Self::Session),
            DELEGATION_TOKEN_ROLE_BINDING => Ok(Self::Role),
            DELEGATION_TOKEN_ENCRYPTING_BINDING => Ok(Self::Encrypting),
            DELEGATION_TOKEN_INJECTING_BINDING => Ok(Self::Injecting),
            other => Err(DelegationError::configuration(format!(
                "Unknown delegation token binding \"{other}\""
            ))),
        }
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured binding.
#[derive(Debug)]
pub enum Binding {
    /// Full long-lived credentials.
    Full(FullCredentialsBinding),
    /// STS session credentials.
    Session(SessionBinding),
    /// STS assumed role credentials.
    Role(RoleBinding),
    /// Encryption secrets only.
    Encrypting(EncryptingBinding),
    /// Configurable providers, for tests.
    Injecting(InjectingBinding),
    /// Another binding under its own service.
    Secondary(SecondaryBinding),
}

impl Binding {
    /// Create a binding of `kind`.
    ///
    /// Session and role bindings use `sts` when given and otherwise build an
    /// [`StsClient`](crate::sts::StsClient) from configuration at init.
    pub fn from_kind(kind: BindingKind, sts: Option<Arc<dyn SecurityTokenService>>) -> Self {
        match kind {
            BindingKind::Full => Self::Full(FullCredentialsBinding::new()),
            BindingKind::Session => Self::Session(SessionBinding::new(sts)),
            BindingKind::Role => Self::Role(RoleBinding::new(sts)),
            BindingKind::Encrypting => Self::Encrypting(EncryptingBinding::new()),
            BindingKind::Injecting => Self::Injecting(InjectingBinding::new()),
        }
    }

    /// Wrap `inner` to register its tokens under `service`.
    pub fn secondary(service: ServiceName, inner: Binding) -> Self {
        Self::Secondary(SecondaryBinding::new(service, inner))
    }
}

/// Forward to the binding held by each variant. Every trait method is
/// forwarded so that overrides in the variants are honored.
macro_rules! dispatch {
    ($self:ident, $binding:ident => $call:expr) => {
        match $self {
            Binding::Full($binding) => $call,
            Binding::Session($binding) => $call,
            Binding::Role($binding) => $call,
            Binding::Encrypting($binding) => $call,
            Binding::Injecting($binding) => $call,
            Binding::Secondary($binding) => $call,
        }
    };
}

#[async_trait]
impl TokenBinding for Binding {
    fn core(&self) -> &BindingCore {
        dispatch!(self, binding => binding.core())
    }

    fn core_mut(&mut self) -> &mut BindingCore {
        dispatch!(self, binding => binding.core_mut())
    }

    fn kind(&self) -> TokenKind {
        dispatch!(self, binding => binding.kind())
    }

    fn name(&self) -> &str {
        dispatch!(self, binding => binding.name())
    }

    fn state(&self) -> ServiceState {
        dispatch!(self, binding => binding.state())
    }

    fn service_text(&self) -> Option<ServiceName> {
        dispatch!(self, binding => binding.service_text())
    }

    fn owner_text(&self) -> Option<String> {
        dispatch!(self, binding => binding.owner_text())
    }

    fn token_issuing_policy(&self) -> TokenIssuingPolicy {
        dispatch!(self, binding => binding.token_issuing_policy())
    }

    fn bound_token(&self) -> Option<&Token> {
        dispatch!(self, binding => binding.bound_token())
    }

    fn decoded_identifier(&self) -> Option<&TokenIdentifier> {
        dispatch!(self, binding => binding.decoded_identifier())
    }

    fn bind_to_file_system(
        &mut self,
        uri: Url,
        store_context: StoreContext,
    ) -> Result<(), DelegationError> {
        dispatch!(self, binding => binding.bind_to_file_system(uri, store_context))
    }

    fn init(&mut self, config: &Configuration) -> Result<(), DelegationError> {
        dispatch!(self, binding => binding.init(config))
    }

    fn start(&mut self) -> Result<(), DelegationError> {
        dispatch!(self, binding => binding.start())
    }

    fn stop(&mut self) {
        dispatch!(self, binding => binding.stop())
    }

    async fn create_token_identifier(
        &self,
        policy: Option<&Policy>,
        secrets: &EncryptionSecrets,
        renewer: Option<&str>,
    ) -> Result<TokenIdentifier, DelegationError> {
        dispatch!(self, binding => binding.create_token_identifier(policy, secrets, renewer).await)
    }

    async fn create_delegation_token(
        &mut self,
        policy: Option<&Policy>,
        secrets: &EncryptionSecrets,
        renewer: Option<&str>,
    ) -> Result<Token, DelegationError> {
        dispatch!(self, binding => binding.create_delegation_token(policy, secrets, renewer).await)
    }

    fn deploy_unbonded(&self) -> Result<CredentialProviderList, DelegationError> {
        dispatch!(self, binding => binding.deploy_unbonded())
    }

    fn bind_to_token_identifier(
        &mut self,
        identifier: TokenIdentifier,
    ) -> Result<CredentialProviderList, DelegationError> {
        dispatch!(self, binding => binding.bind_to_token_identifier(identifier))
    }

    fn bind_to_token(
        &mut self,
        bundle: &CredentialsBundle,
    ) -> Result<Option<Token>, DelegationError> {
        dispatch!(self, binding => binding.bind_to_token(bundle))
    }

    fn create_empty_identifier(&self) -> TokenIdentifier {
        dispatch!(self, binding => binding.create_empty_identifier())
    }

    fn description(&self) -> String {
        dispatch!(self, binding => binding.description())
    }

    fn user_agent_field(&self) -> String {
        dispatch!(self, binding => binding.user_agent_field())
    }
}
