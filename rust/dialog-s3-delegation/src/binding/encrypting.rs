//! Tokens carrying encryption secrets and no AWS credentials.

use async_trait::async_trait;

use super::{BindingCore, TokenBinding, TokenIssuingPolicy};
use crate::DelegationError;
use crate::config::Configuration;
use crate::constants::DELEGATION_TOKEN_CREDENTIALS_PROVIDER;
use crate::credentials::{CredentialProviderList, DEFAULT_CREDENTIALS_PROVIDERS};
use crate::encryption::EncryptionSecrets;
use crate::identifier::TokenIdentifier;
use crate::policy::Policy;
use crate::token::TokenKind;

/// Binding issuing [`TokenKind::ENCRYPTING`] tokens.
///
/// The receiving process keeps using its own credentials.
#[derive(Debug)]
pub struct EncryptingBinding {
    core: BindingCore,
    upstream: CredentialProviderList,
}

impl EncryptingBinding {
    /// Create an unbound binding.
    pub fn new() -> Self {
        Self {
            core: BindingCore::new("EncryptingTokenBinding"),
            upstream: CredentialProviderList::new(),
        }
    }
}

impl Default for EncryptingBinding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenBinding for EncryptingBinding {
    fn core(&self) -> &BindingCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BindingCore {
        &mut self.core
    }

    fn kind(&self) -> TokenKind {
        TokenKind::ENCRYPTING
    }

    fn token_issuing_policy(&self) -> TokenIssuingPolicy {
        TokenIssuingPolicy::RequestsOnly
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
        _policy: Option<&Policy>,
        secrets: &EncryptionSecrets,
        renewer: Option<&str>,
    ) -> Result<TokenIdentifier, DelegationError> {
        self.core.base().require_started()?;
        self.core.new_identifier(self.kind(), secrets, renewer)
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
        self.core.record_decoded(identifier);
        Ok(self.upstream.clone())
    }

    fn description(&self) -> String {
        "Encrypting token binding".to_string()
    }
}
