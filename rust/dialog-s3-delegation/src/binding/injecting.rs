//! A binding whose providers and issuing are set by configuration.
//!
//! Used to exercise token plumbing in tests: tokens name the providers to
//! deploy rather than carry credentials, and issuing can be switched off.

use async_trait::async_trait;
use tracing::debug;

use super::{BindingCore, TokenBinding, TokenIssuingPolicy};
use crate::DelegationError;
use crate::config::Configuration;
use crate::constants::{
    DELEGATION_TOKEN_CREDENTIALS_PROVIDER, INJECTING_CREDENTIALS_PROVIDER,
    INJECTING_ISSUE_TOKENS, INJECTING_ISSUE_TOKENS_DEFAULT, INJECTING_SERVICE_NAME,
};
use crate::credentials::{CredentialProviderList, DEFAULT_CREDENTIALS_PROVIDERS};
use crate::encryption::EncryptionSecrets;
use crate::identifier::{TokenIdentifier, TokenPayload};
use crate::policy::Policy;
use crate::token::{ServiceName, TokenKind};

/// Binding issuing [`TokenKind::INJECTING`] tokens.
#[derive(Debug)]
pub struct InjectingBinding {
    core: BindingCore,
    providers: Vec<String>,
    issue_tokens: bool,
    service: Option<ServiceName>,
}

impl InjectingBinding {
    /// Create an unbound binding.
    pub fn new() -> Self {
        Self {
            core: BindingCore::new("InjectingTokenBinding"),
            providers: Vec::new(),
            issue_tokens: INJECTING_ISSUE_TOKENS_DEFAULT,
            service: None,
        }
    }

    /// Provider names deployed when no token is bound.
    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    fn provider_list<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<CredentialProviderList, DelegationError> {
        let config = self
            .core
            .base()
            .config()
            .ok_or(DelegationError::NotBound)?;
        Ok(CredentialProviderList::from_names(names, config)?)
    }
}

impl Default for InjectingBinding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenBinding for InjectingBinding {
    fn core(&self) -> &BindingCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BindingCore {
        &mut self.core
    }

    fn kind(&self) -> TokenKind {
        TokenKind::INJECTING
    }

    fn service_text(&self) -> Option<ServiceName> {
        self.service.clone().or_else(|| {
            self.core
                .base()
                .canonical_uri()
                .map(ServiceName::from_uri)
        })
    }

    fn token_issuing_policy(&self) -> TokenIssuingPolicy {
        if self.issue_tokens {
            TokenIssuingPolicy::MayIssueTokens
        } else {
            TokenIssuingPolicy::NoTokensAvailable
        }
    }

    fn init(&mut self, config: &Configuration) -> Result<(), DelegationError> {
        let (providers, issue_tokens) = self.core.init_with(config, |config| {
            let mut providers = config.get_list(INJECTING_CREDENTIALS_PROVIDER);
            if providers.is_empty() {
                providers = config.get_list(DELEGATION_TOKEN_CREDENTIALS_PROVIDER);
            }
            if providers.is_empty() {
                providers = DEFAULT_CREDENTIALS_PROVIDERS
                    .iter()
                    .map(|name| name.to_string())
                    .collect();
            }
            // Resolve once so unknown names fail at init.
            CredentialProviderList::from_names(&providers, config)?;
            let issue_tokens =
                config.get_bool(INJECTING_ISSUE_TOKENS, INJECTING_ISSUE_TOKENS_DEFAULT)?;
            Ok((providers, issue_tokens))
        })?;
        debug!(?providers, issue_tokens, "Injecting binding initialized");
        self.providers = providers;
        self.issue_tokens = issue_tokens;
        self.service = config.get_trimmed(INJECTING_SERVICE_NAME).map(ServiceName::new);
        Ok(())
    }

    async fn create_token_identifier(
        &self,
        _policy: Option<&Policy>,
        secrets: &EncryptionSecrets,
        renewer: Option<&str>,
    ) -> Result<TokenIdentifier, DelegationError> {
        self.core.base().require_started()?;
        if !self.issue_tokens {
            return Err(DelegationError::configuration(format!(
                "Token issuing disabled by {INJECTING_ISSUE_TOKENS}"
            )));
        }
        Ok(self
            .core
            .new_identifier(self.kind(), secrets, renewer)?
            .with_payload(TokenPayload::Injected {
                provider: self.providers.join(","),
            }))
    }

    fn deploy_unbonded(&self) -> Result<CredentialProviderList, DelegationError> {
        self.core.base().require_started()?;
        self.provider_list(&self.providers)
    }

    fn bind_to_token_identifier(
        &mut self,
        identifier: TokenIdentifier,
    ) -> Result<CredentialProviderList, DelegationError> {
        self.core.base().require_started()?;
        identifier.ensure_kind(&self.kind())?;
        let TokenPayload::Injected { provider } = identifier.payload() else {
            return Err(DelegationError::InvalidIdentifier(
                "no provider in injecting token".into(),
            ));
        };
        let names: Vec<&str> = provider
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect();
        let providers = self.provider_list(&names)?;
        self.core.record_decoded(identifier);
        Ok(providers)
    }

    fn description(&self) -> String {
        format!("Injecting token binding deploying [{}]", self.providers.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{OwnerIdentity, StoreContext};
    use url::Url;

    fn started(config: &Configuration) -> InjectingBinding {
        let uri = Url::parse("s3a://example-bucket/").unwrap();
        let context = StoreContext::new(uri.clone(), OwnerIdentity::new("alice")).unwrap();
        let mut binding = InjectingBinding::new();
        binding.bind_to_file_system(uri, context).unwrap();
        binding.init(config).unwrap();
        binding.start().unwrap();
        binding
    }

    #[test]
    fn it_overrides_the_service_name() {
        let binding = started(&Configuration::new().with(INJECTING_SERVICE_NAME, "injected"));
        assert_eq!(binding.service_text(), Some(ServiceName::new("injected")));

        let binding = started(&Configuration::new());
        assert_eq!(
            binding.service_text(),
            Some(ServiceName::new("s3a://example-bucket"))
        );
    }

    #[tokio::test]
    async fn it_refuses_to_issue_when_disabled() {
        let binding = started(&Configuration::new().with(INJECTING_ISSUE_TOKENS, "false"));
        assert_eq!(
            binding.token_issuing_policy(),
            TokenIssuingPolicy::NoTokensAvailable
        );
        assert!(matches!(
            binding
                .create_token_identifier(None, &EncryptionSecrets::none(), None)
                .await,
            Err(DelegationError::Configuration(_))
        ));
        // Deployment still works
        assert_eq!(binding.deploy_unbonded().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn it_names_its_providers_in_issued_tokens() {
        let config = Configuration::new().with(INJECTING_CREDENTIALS_PROVIDER, "simple");
        let binding = started(&config);
        let identifier = binding
            .create_token_identifier(None, &EncryptionSecrets::none(), None)
            .await
            .unwrap();
        assert_eq!(
            identifier.payload(),
            &TokenPayload::Injected {
                provider: "simple".into()
            }
        );
    }
}
