//! Issuing a token from a started binding.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::DelegationError;
use crate::binding::TokenBinding;
use crate::encryption::EncryptionSecrets;
use crate::policy::Policy;
use crate::token::{ServiceName, Token, TokenKind};

/// Notified around each issue.
pub trait TokenIssueCallbacks: Send + Sync {
    /// A token of `kind` is about to be issued for `service`.
    fn token_issuing(&self, _service: &ServiceName, _kind: &TokenKind) {}

    /// `token` was issued for `service` in `elapsed`.
    fn token_issued(&self, _service: &ServiceName, _token: &Token, _elapsed: Duration) {}
}

/// Logs issuance and its duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingIssueCallbacks;

impl TokenIssueCallbacks for LoggingIssueCallbacks {
    fn token_issuing(&self, service: &ServiceName, kind: &TokenKind) {
        debug!(%service, %kind, "Issuing delegation token");
    }

    fn token_issued(&self, service: &ServiceName, token: &Token, elapsed: Duration) {
        info!(%service, kind = %token.kind(), ?elapsed, "Issued delegation token");
    }
}

/// Issues one token from a binding and reports it to callbacks.
pub struct TokenIssuer<'a, B: TokenBinding + ?Sized> {
    binding: &'a mut B,
    policy: Option<&'a Policy>,
    secrets: &'a EncryptionSecrets,
    renewer: Option<&'a str>,
    service: ServiceName,
    callbacks: &'a dyn TokenIssueCallbacks,
}

impl<'a, B: TokenBinding + ?Sized> TokenIssuer<'a, B> {
    /// Issuer for tokens of `binding` destined for `service`.
    pub fn new(
        binding: &'a mut B,
        policy: Option<&'a Policy>,
        secrets: &'a EncryptionSecrets,
        service: ServiceName,
        callbacks: &'a dyn TokenIssueCallbacks,
    ) -> Self {
        Self {
            binding,
            policy,
            secrets,
            renewer: None,
            service,
            callbacks,
        }
    }

    /// Name the principal allowed to renew the token.
    pub fn with_renewer(mut self, renewer: Option<&'a str>) -> Self {
        self.renewer = renewer;
        self
    }

    /// Service the token is destined for.
    pub fn service(&self) -> &ServiceName {
        &self.service
    }

    /// Issue the token.
    pub async fn issue(self) -> Result<Token, DelegationError> {
        self.callbacks
            .token_issuing(&self.service, &self.binding.kind());
        let started = Instant::now();
        let token = self
            .binding
            .create_delegation_token(self.policy, self.secrets, self.renewer)
            .await?;
        self.callbacks
            .token_issued(&self.service, &token, started.elapsed());
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::EncryptingBinding;
    use crate::config::Configuration;
    use crate::constants::DELEGATION_TOKEN_CREDENTIALS_PROVIDER;
    use crate::context::{OwnerIdentity, StoreContext};
    use std::sync::Mutex;
    use url::Url;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl TokenIssueCallbacks for Recorder {
        fn token_issuing(&self, service: &ServiceName, kind: &TokenKind) {
            self.events
                .lock()
                .unwrap()
                .push(format!("issuing {kind} for {service}"));
        }

        fn token_issued(&self, service: &ServiceName, token: &Token, _elapsed: Duration) {
            self.events
                .lock()
                .unwrap()
                .push(format!("issued {} for {service}", token.kind()));
        }
    }

    fn started() -> EncryptingBinding {
        let uri = Url::parse("s3a://example-bucket/").unwrap();
        let context = StoreContext::new(uri.clone(), OwnerIdentity::new("alice")).unwrap();
        let mut binding = EncryptingBinding::new();
        binding.bind_to_file_system(uri, context).unwrap();
        binding
            .init(&Configuration::new().with(DELEGATION_TOKEN_CREDENTIALS_PROVIDER, "simple"))
            .unwrap();
        binding.start().unwrap();
        binding
    }

    #[tokio::test]
    async fn it_notifies_callbacks_around_issue() {
        let mut binding = started();
        let recorder = Recorder::default();
        let secrets = EncryptionSecrets::none();
        let service = ServiceName::new("s3a://example-bucket/encrypting");
        let token = TokenIssuer::new(&mut binding, None, &secrets, service, &recorder)
            .with_renewer(Some("yarn"))
            .issue()
            .await
            .unwrap();

        assert_eq!(token.identifier().renewer(), Some("yarn"));
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec![
                "issuing S3ADelegationToken/Encrypting for s3a://example-bucket/encrypting",
                "issued S3ADelegationToken/Encrypting for s3a://example-bucket/encrypting",
            ]
        );
        assert_eq!(binding.bound_token(), Some(&token));
    }

    #[tokio::test]
    async fn it_reports_nothing_issued_on_failure() {
        let mut binding = started();
        binding.stop();
        let recorder = Recorder::default();
        let secrets = EncryptionSecrets::none();
        let result = TokenIssuer::new(
            &mut binding,
            None,
            &secrets,
            ServiceName::new("s3a://example-bucket"),
            &recorder,
        )
        .issue()
        .await;

        assert!(matches!(result, Err(DelegationError::IllegalState { .. })));
        assert_eq!(recorder.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn it_logs_issues_of_any_duration() {
        let mut binding = started();
        let secrets = EncryptionSecrets::none();
        let service = ServiceName::new("s3a://example-bucket");
        let token = TokenIssuer::new(
            &mut binding,
            None,
            &secrets,
            service.clone(),
            &LoggingIssueCallbacks,
        )
        .issue()
        .await
        .unwrap();

        LoggingIssueCallbacks.token_issued(&service, &token, Duration::MAX);
        LoggingIssueCallbacks.token_issued(&service, &token, Duration::ZERO);
    }
}
