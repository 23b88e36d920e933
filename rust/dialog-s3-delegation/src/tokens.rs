//! Delegation token support for one filesystem instance.
//!
//! [`DelegationTokens`] reads which bindings are configured, drives their
//! lifecycle together with its own, collects the tokens they issue into a
//! [`CredentialsBundle`] and redeems a bundle back into credentials.
//!
//! The primary binding registers tokens under the filesystem's service; each
//! secondary binding under its own. Bindings with nothing to issue are
//! skipped.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};
use url::Url;

use crate::DelegationError;
use crate::binding::{Binding, BindingKind, SecondaryBinding, TokenBinding, TokenIssuingPolicy};
use crate::config::Configuration;
use crate::constants::{DELEGATION_SECONDARY_BINDINGS, DELEGATION_TOKEN_BINDING};
use crate::context::StoreContext;
use crate::credentials::CredentialProviderList;
use crate::encryption::EncryptionSecrets;
use crate::issuer::{LoggingIssueCallbacks, TokenIssueCallbacks, TokenIssuer};
use crate::policy::Policy;
use crate::service::{ServiceBase, ServiceState};
use crate::sts::SecurityTokenService;
use crate::token::{CredentialsBundle, ServiceName};

/// Delegation token bindings of a filesystem.
pub struct DelegationTokens {
    base: ServiceBase,
    sts: Option<Arc<dyn SecurityTokenService>>,
    callbacks: Arc<dyn TokenIssueCallbacks>,
    primary: Option<Binding>,
    secondaries: Vec<SecondaryBinding>,
}

impl DelegationTokens {
    /// Create the manager; `sts` replaces the configured STS client of
    /// session and role bindings.
    pub fn new(sts: Option<Arc<dyn SecurityTokenService>>) -> Self {
        Self {
            base: ServiceBase::new("DelegationTokens"),
            sts,
            callbacks: Arc::new(LoggingIssueCallbacks),
            primary: None,
            secondaries: Vec::new(),
        }
    }

    /// Replace the callbacks notified of each issue.
    pub fn with_callbacks(mut self, callbacks: Arc<dyn TokenIssueCallbacks>) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Lifecycle state.
    pub fn state(&self) -> ServiceState {
        self.base.state()
    }

    /// Whether a primary binding is configured.
    pub fn is_enabled(&self) -> bool {
        self.primary.is_some()
    }

    /// The primary binding, once initialized.
    pub fn primary(&self) -> Option<&Binding> {
        self.primary.as_ref()
    }

    /// The secondary bindings, once initialized.
    pub fn secondaries(&self) -> &[SecondaryBinding] {
        &self.secondaries
    }

    /// Attach the owning filesystem.
    pub fn bind_to_file_system(
        &mut self,
        uri: Url,
        store_context: StoreContext,
    ) -> Result<(), DelegationError> {
        self.base.bind_to_file_system(uri, store_context)
    }

    /// Create, bind and initialize the configured bindings.
    pub fn init(&mut self, config: &Configuration) -> Result<(), DelegationError> {
        self.base.init(config)?;
        self.init_bindings(config)
            .inspect_err(|_| self.base.fail())
    }

    fn init_bindings(&mut self, config: &Configuration) -> Result<(), DelegationError> {
        let (Some(uri), Some(context)) = (
            self.base.canonical_uri().cloned(),
            self.base.store_context().cloned(),
        ) else {
            return Err(DelegationError::NotBound);
        };
        let Some(primary_kind) = config.get_trimmed(DELEGATION_TOKEN_BINDING) else {
            debug!(%uri, "Delegation tokens disabled");
            return Ok(());
        };
        let primary_kind = primary_kind.parse::<BindingKind>()?;
        let canonical = ServiceName::from_uri(&uri);
        let mut services = BTreeSet::new();

        let mut primary = Binding::from_kind(primary_kind, self.sts.clone());
        primary.bind_to_file_system(uri.clone(), context.clone())?;
        primary.init(config)?;
        if let Some(service) = primary.service_text() {
            services.insert(service);
        }
        info!(%uri, binding = %primary_kind, "Delegation tokens enabled");

        let mut secondaries = Vec::new();
        for entry in config.get_list(DELEGATION_SECONDARY_BINDINGS) {
            let (service, kind) = match entry.split_once('=') {
                Some((service, kind)) => {
                    (ServiceName::new(service.trim()), kind.parse::<BindingKind>()?)
                }
                None => {
                    let kind: BindingKind = entry.parse()?;
                    (ServiceName::new(format!("{canonical}/{kind}")), kind)
                }
            };
            if !services.insert(service.clone()) {
                return Err(DelegationError::configuration(format!(
                    "Service {service} is claimed by more than one binding"
                )));
            }
            let mut secondary =
                SecondaryBinding::new(service, Binding::from_kind(kind, self.sts.clone()));
            secondary.bind_to_file_system(uri.clone(), context.clone())?;
            secondary.init(config)?;
            debug!(service = %secondary.service(), binding = %kind, "Secondary binding added");
            secondaries.push(secondary);
        }

        self.primary = Some(primary);
        self.secondaries = secondaries;
        Ok(())
    }

    /// Start every binding.
    pub fn start(&mut self) -> Result<(), DelegationError> {
        self.base.start()?;
        let started = self
            .primary
            .iter_mut()
            .map(|primary| primary as &mut dyn TokenBinding)
            .chain(
                self.secondaries
                    .iter_mut()
                    .map(|secondary| secondary as &mut dyn TokenBinding),
            )
            .try_for_each(|binding| binding.start());
        started.inspect_err(|_| self.base.fail())
    }

    /// Stop every binding.
    pub fn stop(&mut self) {
        self.base.stop();
        if let Some(primary) = &mut self.primary {
            primary.stop();
        }
        for secondary in &mut self.secondaries {
            secondary.stop();
        }
    }

    /// Issue a token from every binding able to, restricted to the bucket of
    /// the filesystem.
    pub async fn create_delegation_tokens(
        &mut self,
        renewer: Option<&str>,
        secrets: &EncryptionSecrets,
    ) -> Result<CredentialsBundle, DelegationError> {
        self.base.require_started()?;
        let policy = self
            .base
            .store_context()
            .map(|context| Policy::bucket_read_write(context.bucket()));
        let callbacks = self.callbacks.as_ref();
        let mut bundle = CredentialsBundle::new();

        if let Some(primary) = &mut self.primary {
            if primary.token_issuing_policy() != TokenIssuingPolicy::NoTokensAvailable {
                let service = primary.service_text().ok_or(DelegationError::NotBound)?;
                let token = TokenIssuer::new(
                    primary,
                    policy.as_ref(),
                    secrets,
                    service.clone(),
                    callbacks,
                )
                .with_renewer(renewer)
                .issue()
                .await?;
                bundle.add_token(service, token);
            }
        }
        for secondary in &mut self.secondaries {
            if secondary.token_issuing_policy() == TokenIssuingPolicy::NoTokensAvailable {
                continue;
            }
            let service = secondary.service().clone();
            let token = secondary
                .create_token_issuer(policy.as_ref(), secrets, callbacks)
                .with_renewer(renewer)
                .issue()
                .await?;
            bundle.add_token(service, token);
        }
        Ok(bundle)
    }

    /// Redeem `bundle` into credentials for every binding, under the service
    /// of each. Bindings without a token in the bundle deploy unbonded
    /// credentials.
    pub fn bind_to_any_delegation_token(
        &mut self,
        bundle: &CredentialsBundle,
    ) -> Result<Vec<(ServiceName, CredentialProviderList)>, DelegationError> {
        self.base.require_started()?;
        let bindings = self
            .primary
            .iter_mut()
            .map(|primary| primary as &mut dyn TokenBinding)
            .chain(
                self.secondaries
                    .iter_mut()
                    .map(|secondary| secondary as &mut dyn TokenBinding),
            );

        let mut deployed = Vec::new();
        for binding in bindings {
            let service = binding.service_text().ok_or(DelegationError::NotBound)?;
            let providers = match binding.bind_to_token(bundle)? {
                Some(token) => {
                    debug!(%service, identifier = %token.identifier(), "Binding to token");
                    binding.bind_to_token_identifier(token.into_identifier())?
                }
                None => {
                    debug!(%service, "No token; deploying unbonded credentials");
                    binding.deploy_unbonded()?
                }
            };
            deployed.push((service, providers));
        }
        Ok(deployed)
    }
}
