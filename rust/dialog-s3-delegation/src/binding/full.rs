//! Tokens carrying the caller's long-lived credentials.
//!
//! No remote call is made: the access and secret keys found through the
//! configured providers are marshalled into the token as they are. Anyone
//! holding the token holds those keys.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{BindingCore, TokenBinding};
use crate::DelegationError;
use crate::config::Configuration;
use crate::constants::DELEGATION_TOKEN_CREDENTIALS_PROVIDER;
use crate::credentials::{
    CredentialProviderList, CredentialTypeRequired, DEFAULT_CREDENTIALS_PROVIDERS,
    MarshalledCredentialProvider, MarshalledCredentials,
};
use crate::encryption::EncryptionSecrets;
use crate::identifier::{TokenIdentifier, TokenPayload};
use crate::policy::Policy;
use crate::token::TokenKind;

/// Binding issuing [`TokenKind::FULL`] tokens.
#[derive(Debug)]
pub struct FullCredentialsBinding {
    core: BindingCore,
    upstream: CredentialProviderList,
}

impl FullCredentialsBinding {
    /// Create an unbound binding.
    pub fn new() -> Self {
        Self {
            core: BindingCore::new("FullCredentialsTokenBinding"),
            upstream: CredentialProviderList::new(),
        }
    }
}

impl Default for FullCredentialsBinding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenBinding for FullCredentialsBinding {
    fn core(&self) -> &BindingCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BindingCore {
        &mut self.core
    }

    fn kind(&self) -> TokenKind {
        TokenKind::FULL
    }

    fn init(&mut self, config: &Configuration) -> Result<(), DelegationError> {
        self.upstream = self.core.init_with(config, |config| {
            Ok(CredentialProviderList::from_configuration(
                config,
                DELEGATION_TOKEN_CREDENTIALS_PROVIDER,
                DEFAULT_CREDENTIALS_PROVIDERS,
            )?)
        })?;
        Ok(())
    }

    async fn create_token_identifier(
        &self,
        policy: Option<&Policy>,
        secrets: &EncryptionSecrets,
        renewer: Option<&str>,
    ) -> Result<TokenIdentifier, DelegationError> {
        self.core.base().require_started()?;
        if policy.is_some() {
            warn!("Full credential tokens cannot be restricted by a policy");
        }
        let credentials = self.upstream.credentials()?;
        let marshalled = MarshalledCredentials::from_credentials(&credentials);
        marshalled.validate(CredentialTypeRequired::FullOnly)?;

        Ok(self
            .core
            .new_identifier(self.kind(), secrets, renewer)?
            .with_payload(TokenPayload::Credentials(marshalled)))
    }

    fn deploy_unbonded(&self) -> Result<CredentialProviderList, DelegationError> {
        self.core.base().require_started()?;
        Ok(self.upstream.clone())
    }

    fn bind_to_token_identifier(
        &mut self,
        identifier: TokenIdentifier,
    ) -> Result<CredentialProviderList, DelegationError> {
        self.core.base().require_started()?;
        identifier.ensure_kind(&self.kind())?;
        let marshalled = identifier.marshalled_credentials().cloned().ok_or_else(|| {
            DelegationError::InvalidIdentifier("no credentials in full credentials token".into())
        })?;
        marshalled.validate(CredentialTypeRequired::AnyNonEmpty)?;
        self.core.record_decoded(identifier);

        Ok(CredentialProviderList::new().with(Arc::new(MarshalledCredentialProvider::new(
            "full credentials token",
            marshalled,
            CredentialTypeRequired::AnyNonEmpty,
        ))))
    }

    fn description(&self) -> String {
        "Token binding with full credentials".to_string()
    }
}
