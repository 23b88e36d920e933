//! A binding republished under its own service name.
//!
//! Lets one process hold tokens of several bindings for the same filesystem
//! without their registrations colliding. The inner binding's kind, issuing
//! policy and tokens pass through unchanged; only the service used to
//! register and find tokens differs.

use async_trait::async_trait;
use url::Url;

use super::{Binding, BindingCore, TokenBinding, TokenIssuingPolicy};
use crate::DelegationError;
use crate::config::Configuration;
use crate::context::StoreContext;
use crate::credentials::CredentialProviderList;
use crate::encryption::EncryptionSecrets;
use crate::identifier::TokenIdentifier;
use crate::issuer::{TokenIssueCallbacks, TokenIssuer};
use crate::lookup::lookup_token;
use crate::policy::Policy;
use crate::token::{CredentialsBundle, ServiceName, Token, TokenKind};

/// Wraps a binding to register its tokens under `service`.
#[derive(Debug)]
pub struct SecondaryBinding {
    core: BindingCore,
    service: ServiceName,
    inner: Box<Binding>,
}

impl SecondaryBinding {
    /// Wrap `inner` under `service`.
    pub fn new(service: ServiceName, inner: Binding) -> Self {
        Self {
            core: BindingCore::new(inner.name()),
            service,
            inner: Box::new(inner),
        }
    }

    /// Service tokens are registered under.
    pub fn service(&self) -> &ServiceName {
        &self.service
    }

    /// Service name as text.
    pub fn canonical_service_name(&self) -> &str {
        self.service.as_str()
    }

    /// The wrapped binding.
    pub fn inner(&self) -> &Binding {
        &self.inner
    }

    /// Find the token registered under this binding's service without
    /// binding to it.
    pub fn lookup_token(
        &self,
        bundle: &CredentialsBundle,
    ) -> Result<Option<Token>, DelegationError> {
        self.core.base().require_started()?;
        lookup_token(bundle, &self.service, &self.kind())
    }

    /// An issuer for tokens of the inner binding registered under this
    /// binding's service.
    pub fn create_token_issuer<'a>(
        &'a mut self,
        policy: Option<&'a Policy>,
        secrets: &'a EncryptionSecrets,
        callbacks: &'a dyn TokenIssueCallbacks,
    ) -> TokenIssuer<'a, Self> {
        let service = self.service.clone();
        TokenIssuer::new(self, policy, secrets, service, callbacks)
    }
}

#[async_trait]
impl TokenBinding for SecondaryBinding {
    fn core(&self) -> &BindingCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BindingCore {
        &mut self.core
    }

    fn kind(&self) -> TokenKind {
        self.inner.kind()
    }

    fn service_text(&self) -> Option<ServiceName> {
        Some(self.service.clone())
    }

    fn owner_text(&self) -> Option<String> {
        self.inner.owner_text()
    }

    fn token_issuing_policy(&self) -> TokenIssuingPolicy {
        self.inner.token_issuing_policy()
    }

    fn bind_to_file_system(
        &mut self,
        uri: Url,
        store_context: StoreContext,
    ) -> Result<(), DelegationError> {
        self.core
            .base_mut()
            .bind_to_file_system(uri.clone(), store_context.clone())?;
        self.inner.bind_to_file_system(uri, store_context)
    }

    fn init(&mut self, config: &Configuration) -> Result<(), DelegationError> {
        let inner = &mut self.inner;
        self.core.init_with(config, |config| inner.init(config))
    }

    fn start(&mut self) -> Result<(), DelegationError> {
        self.core.base_mut().start()?;
        self.inner
            .start()
            .inspect_err(|_| self.core.base_mut().fail())
    }

    fn stop(&mut self) {
        self.core.base_mut().stop();
        self.inner.stop();
    }

    async fn create_token_identifier(
        &self,
        policy: Option<&Policy>,
        secrets: &EncryptionSecrets,
        renewer: Option<&str>,
    ) -> Result<TokenIdentifier, DelegationError> {
        self.core.base().require_started()?;
        self.inner
            .create_token_identifier(policy, secrets, renewer)
            .await
    }

    async fn create_delegation_token(
        &mut self,
        policy: Option<&Policy>,
        secrets: &EncryptionSecrets,
        renewer: Option<&str>,
    ) -> Result<Token, DelegationError> {
        self.core.base().require_started()?;
        self.inner
            .create_delegation_token(policy, secrets, renewer)
            .await
    }

    fn deploy_unbonded(&self) -> Result<CredentialProviderList, DelegationError> {
        self.core.base().require_started()?;
        self.inner.deploy_unbonded()
    }

    fn bind_to_token_identifier(
        &mut self,
        identifier: TokenIdentifier,
    ) -> Result<CredentialProviderList, DelegationError> {
        self.core.base().require_started()?;
        let providers = self.inner.bind_to_token_identifier(identifier.clone())?;
        self.core.record_decoded(identifier);
        Ok(providers)
    }

    fn create_empty_identifier(&self) -> TokenIdentifier {
        self.inner.create_empty_identifier()
    }

    fn description(&self) -> String {
        self.inner.description()
    }

    fn user_agent_field(&self) -> String {
        self.inner.user_agent_field()
    }
}
