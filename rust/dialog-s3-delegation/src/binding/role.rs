//! Tokens carrying credentials of an assumed IAM role.
//!
//! The caller's full credentials are used to `AssumeRole`, optionally with a
//! policy narrowing the role's permissions. Session credentials cannot
//! assume a role on behalf of a token holder, so they are rejected.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use ulid::Ulid;

use super::session::StsSettings;
use super::{BindingCore, TokenBinding, session_user_agent};
use crate::DelegationError;
use crate::config::Configuration;
use crate::constants::{DELEGATION_TOKEN_ROLE_ARN, MAX_ROLE_SESSION_DURATION};
use crate::credentials::{
    CredentialProviderList, CredentialTypeRequired, MarshalledCredentialProvider,
    MarshalledCredentials,
};
use crate::encryption::EncryptionSecrets;
use crate::identifier::{TokenIdentifier, TokenPayload};
use crate::policy::Policy;
use crate::sts::{AssumeRoleRequest, SecurityTokenService};
use crate::token::TokenKind;

/// Binding issuing [`TokenKind::ROLE`] tokens.
pub struct RoleBinding {
    core: BindingCore,
    sts: Option<Arc<dyn SecurityTokenService>>,
    settings: Option<StsSettings>,
    role_arn: Option<String>,
}

impl RoleBinding {
    /// Create an unbound binding; `sts` replaces the configured STS client.
    pub fn new(sts: Option<Arc<dyn SecurityTokenService>>) -> Self {
        Self {
            core: BindingCore::new("RoleTokenBinding"),
            sts,
            settings: None,
            role_arn: None,
        }
    }

    /// Role to assume: the configured ARN, else the one recorded in the
    /// identifier the binding was bound to.
    pub fn role_arn(&self) -> Option<&str> {
        self.role_arn
            .as_deref()
            .or_else(|| self.core.decoded_identifier.as_ref()?.role_arn())
    }
}

impl fmt::Debug for RoleBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleBinding")
            .field("core", &self.core)
            .field("settings", &self.settings)
            .field("role_arn", &self.role_arn)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenBinding for RoleBinding {
    fn core(&self) -> &BindingCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut BindingCore {
        &mut self.core
    }

    fn kind(&self) -> TokenKind {
        TokenKind::ROLE
    }

    fn init(&mut self, config: &Configuration) -> Result<(), DelegationError> {
        let sts = self.sts.clone();
        let settings = self.core.init_with(config, |config| {
            StsSettings::from_configuration(config, sts, MAX_ROLE_SESSION_DURATION)
        })?;
        self.settings = Some(settings);
        self.role_arn = config.get_trimmed(DELEGATION_TOKEN_ROLE_ARN).map(String::from);
        Ok(())
    }

    async fn create_token_identifier(
        &self,
        policy: Option<&Policy>,
        secrets: &EncryptionSecrets,
        renewer: Option<&str>,
    ) -> Result<TokenIdentifier, DelegationError> {
        self.core.base().require_started()?;
        let settings = StsSettings::require(&self.settings, &self.core)?;
        let role_arn = self.role_arn().ok_or(DelegationError::NoRoleArn)?;
        let caller = settings.upstream.credentials()?;
        if caller.is_session() {
            return Err(DelegationError::NoFullCredentialsForRole);
        }

        let request = AssumeRoleRequest {
            role_arn: role_arn.to_string(),
            session_name: format!("s3a-role-{}", Ulid::new()),
            duration: settings.duration,
            policy: policy.map(Policy::to_json).transpose()?,
        };
        debug!(role = role_arn, session = %request.session_name, "Assuming role");
        let marshalled = MarshalledCredentials::from(
            settings.sts.assume_role(&caller, &request).await?,
        )
        .with_role_arn(role_arn);

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
            DelegationError::InvalidIdentifier("no credentials in role token".into())
        })?;
        marshalled.validate(CredentialTypeRequired::SessionOnly)?;
        self.core.record_decoded(identifier);

        Ok(CredentialProviderList::new().with(Arc::new(MarshalledCredentialProvider::new(
            "role token",
            marshalled,
            CredentialTypeRequired::SessionOnly,
        ))))
    }

    fn description(&self) -> String {
        match self.role_arn() {
            Some(role_arn) => format!("Role token binding for {role_arn}"),
            None => "Role token binding".to_string(),
        }
    }

    fn user_agent_field(&self) -> String {
        session_user_agent(self.decoded_identifier())
    }
}
