//! Tokens carrying STS session credentials.
//!
//! The caller's full credentials are exchanged for a session triple through
//! `GetSessionToken`; only the session credentials leave the process.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{BindingCore, TokenBinding, session_user_agent};
use crate::DelegationError;
use crate::config::Configuration;
use crate::constants::{
    DEFAULT_DELEGATION_TOKEN_DURATION, DELEGATION_TOKEN_CREDENTIALS_PROVIDER,
    DELEGATION_TOKEN_DURATION, MAX_SESSION_DURATION, MIN_SESSION_DURATION,
};
use crate::credentials::{
    CredentialProviderList, CredentialTypeRequired, DEFAULT_CREDENTIALS_PROVIDERS,
    MarshalledCredentialProvider, MarshalledCredentials,
};
use crate::encryption::EncryptionSecrets;
use crate::identifier::{TokenIdentifier, TokenPayload};
use crate::policy::Policy;
use crate::service::ServiceState;
use crate::sts::{SecurityTokenService, StsClient};
use crate::token::TokenKind;

/// STS access shared by the session and role bindings.
pub(super) struct StsSettings {
    pub(super) sts: Arc<dyn SecurityTokenService>,
    pub(super) duration: Duration,
    pub(super) upstream: CredentialProviderList,
}

impl StsSettings {
    /// Read the duration and upstream providers, using `sts` if given and a
    /// configured [`StsClient`] otherwise.
    pub(super) fn from_configuration(
        config: &Configuration,
        sts: Option<Arc<dyn SecurityTokenService>>,
        max_duration: Duration,
    ) -> Result<Self, DelegationError> {
        let duration =
            config.get_duration(DELEGATION_TOKEN_DURATION, DEFAULT_DELEGATION_TOKEN_DURATION)?;
        if !(MIN_SESSION_DURATION..=max_duration).contains(&duration) {
            return Err(DelegationError::configuration(format!(
                "{DELEGATION_TOKEN_DURATION} of {}s is outside {}s..={}s",
                duration.as_secs(),
                MIN_SESSION_DURATION.as_secs(),
                max_duration.as_secs()
            )));
        }
        let sts = match sts {
            Some(sts) => sts,
            None => Arc::new(
                StsClient::from_configuration(config)
                    .map_err(|e| DelegationError::configuration(e.to_string()))?,
            ),
        };
        let upstream = CredentialProviderList::from_configuration(
            config,
            DELEGATION_TOKEN_CREDENTIALS_PROVIDER,
            DEFAULT_CREDENTIALS_PROVIDERS,
        )?;
        Ok(Self {
            sts,
            duration,
            upstream,
        })
    }

    /// Settings of a binding, failing if it has not been initialized.
    pub(super) fn require<'a>(
        settings: &'a Option<StsSettings>,
        core: &BindingCore,
    ) -> Result<&'a StsSettings, DelegationError> {
        settings.as_ref().ok_or(DelegationError::IllegalState {
            expected: ServiceState::Started,
            actual: core.base().state(),
        })
    }
}

impl fmt::Debug for StsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StsSettings")
            .field("duration", &self.duration)
            .field("upstream", &self.upstream)
            .finish_non_exhaustive()
    }
}

/// Binding issuing [`TokenKind::SESSION`] tokens.
pub struct SessionBinding {
    core: BindingCore,
    sts: Option<Arc<dyn SecurityTokenService>>,
    settings: Option<StsSettings>,
}

impl SessionBinding {
    /// Create an unbound binding; `sts` replaces the configured STS client.
    pub fn new(sts: Option<Arc<dyn SecurityTokenService>>) -> Self {
        Self {
            core: BindingCore::new("SessionTokenBinding"),
            sts,
            settings: None,
        }
    }

    /// Lifetime of issued session credentials, once initialized.
    pub fn duration(&self) -> Option<Duration> {
        self.settings.as_ref().map(|settings| settings.duration)
    }
}

impl fmt::Debug for SessionBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBinding")
            .field("core", &self.core)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenBinding for SessionBinding {
    fn core(&self) -> &BindingCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BindingCore {
        &mut self.core
    }

    fn kind(&self) -> TokenKind {
        TokenKind::SESSION
    }

    fn init(&mut self, config: &Configuration) -> Result<(), DelegationError> {
        let sts = self.sts.clone();
        let settings = self.core.init_with(config, |config| {
            StsSettings::from_configuration(config, sts, MAX_SESSION_DURATION)
        })?;
        debug!(duration = ?settings.duration, "Session binding initialized");
        self.settings = Some(settings);
        Ok(())
    }

    async fn create_token_identifier(
        &self,
        _policy: Option<&Policy>,
        secrets: &EncryptionSecrets,
        renewer: Option<&str>,
    ) -> Result<TokenIdentifier, DelegationError> {
        self.core.base().require_started()?;
        let settings = StsSettings::require(&self.settings, &self.core)?;
        let caller = settings.upstream.credentials()?;

        let marshalled = if caller.is_session() {
            warn!(
                access_key = caller.access_key_id(),
                "Forwarding existing session credentials"
            );
            MarshalledCredentials::from_credentials(&caller)
        } else {
            MarshalledCredentials::from(
                settings
                    .sts
                    .get_session_token(&caller, settings.duration)
                    .await?,
            )
        };

        Ok(self
            .core
            .new_identifier(self.kind(), secrets, renewer)?
            .with_expiry(marshalled.expiration())
            .with_payload(TokenPayload::Credentials(marshalled)))
    }

    fn deploy_unbonded(&self) -> Result<CredentialProviderList, DelegationError> {
        self.core.base().require_started()?;
        Ok(StsSettings::require(&self.settings, &self.core)?.upstream.clone())
    }

    fn bind_to_token_identifier(
        &mut self,
        identifier: TokenIdentifier,
    ) -> Result<CredentialProviderList, DelegationError> {
        self.core.base().require_started()?;
        identifier.ensure_kind(&self.kind())?;
        let marshalled = identifier.marshalled_credentials().cloned().ok_or_else(|| {
            DelegationError::InvalidIdentifier("no credentials in session token".into())
        })?;
        marshalled.validate(CredentialTypeRequired::SessionOnly)?;
        self.core.record_decoded(identifier);

        Ok(CredentialProviderList::new().with(Arc::new(MarshalledCredentialProvider::new(
            "session token",
            marshalled,
            CredentialTypeRequired::SessionOnly,
        ))))
    }

    fn description(&self) -> String {
        match self.duration() {
            Some(duration) => format!(
                "Session token binding with duration {}s",
                duration.as_secs()
            ),
            None => "Session token binding".to_string(),
        }
    }

    fn user_agent_field(&self) -> String {
        session_user_agent(self.decoded_identifier())
    }
}
