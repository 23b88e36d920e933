//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dialog_s3_delegation::constants::{
    ACCESS_KEY, DELEGATION_TOKEN_CREDENTIALS_PROVIDER, SECRET_KEY, SESSION_TOKEN,
};
use dialog_s3_delegation::{
    AssumeRoleRequest, AwsCredentials, Binding, BindingKind, Configuration, OwnerIdentity,
    SecurityTokenService, SessionCredentials, StoreContext, StsError, TokenBinding,
};
use url::Url;

pub const BUCKET_URI: &str = "s3a://example-bucket/";
pub const ROLE_ARN: &str = "arn:aws:iam::123456789012:role/delegation-tests";

/// A call received by [`MockSts`].
#[derive(Debug, Clone, PartialEq)]
pub enum StsCall {
    GetSessionToken {
        caller: String,
        duration: Duration,
    },
    AssumeRole {
        caller: String,
        request: AssumeRoleRequest,
    },
}

/// In-memory STS recording every call.
#[derive(Debug, Default)]
pub struct MockSts {
    calls: Mutex<Vec<StsCall>>,
    failure: Option<StsError>,
}

impl MockSts {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// An STS failing every call with `error`.
    pub fn failing(error: StsError) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            failure: Some(error),
        })
    }

    pub fn calls(&self) -> Vec<StsCall> {
        self.calls.lock().unwrap().clone()
    }

    fn issue(&self, call: StsCall, duration: Duration) -> Result<SessionCredentials, StsError> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(call);
            calls.len()
        };
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(SessionCredentials::new(
            format!("ASIAMOCK{count}"),
            format!("mock-secret-{count}"),
            format!("mock-session-token-{count}"),
            Utc::now() + chrono::Duration::seconds(duration.as_secs() as i64),
        ))
    }
}

#[async_trait]
impl SecurityTokenService for MockSts {
    async fn get_session_token(
        &self,
        caller: &AwsCredentials,
        duration: Duration,
    ) -> Result<SessionCredentials, StsError> {
        self.issue(
            StsCall::GetSessionToken {
                caller: caller.access_key_id().to_string(),
                duration,
            },
            duration,
        )
    }

    async fn assume_role(
        &self,
        caller: &AwsCredentials,
        request: &AssumeRoleRequest,
    ) -> Result<SessionCredentials, StsError> {
        self.issue(
            StsCall::AssumeRole {
                caller: caller.access_key_id().to_string(),
                request: request.clone(),
            },
            request.duration,
        )
    }
}

/// `sts` as the trait object bindings take.
pub fn as_sts(sts: Arc<MockSts>) -> Option<Arc<dyn SecurityTokenService>> {
    let sts: Arc<dyn SecurityTokenService> = sts;
    Some(sts)
}

pub fn uri() -> Url {
    Url::parse(BUCKET_URI).unwrap()
}

pub fn context() -> StoreContext {
    StoreContext::new(uri(), OwnerIdentity::new("alice")).unwrap()
}

/// Long-lived credentials from the `simple` provider only.
pub fn full_config() -> Configuration {
    Configuration::new()
        .with(DELEGATION_TOKEN_CREDENTIALS_PROVIDER, "simple")
        .with(ACCESS_KEY, "AKIAEXAMPLE")
        .with(SECRET_KEY, "full-secret")
}

/// Session credentials from the `temporary` provider only.
pub fn session_config() -> Configuration {
    Configuration::new()
        .with(DELEGATION_TOKEN_CREDENTIALS_PROVIDER, "temporary")
        .with(ACCESS_KEY, "ASIAUPSTREAM")
        .with(SECRET_KEY, "session-secret")
        .with(SESSION_TOKEN, "upstream-session-token")
}

/// A binding of `kind` bound to [`BUCKET_URI`] and initialized.
pub fn inited(kind: BindingKind, config: &Configuration, sts: Arc<MockSts>) -> Binding {
    let mut binding = Binding::from_kind(kind, as_sts(sts));
    binding.bind_to_file_system(uri(), context()).unwrap();
    binding.init(config).unwrap();
    binding
}

/// A binding of `kind` bound to [`BUCKET_URI`] and started.
pub fn started(kind: BindingKind, config: &Configuration, sts: Arc<MockSts>) -> Binding {
    let mut binding = inited(kind, config, sts);
    binding.start().unwrap();
    binding
}
