//! HTTP client for the STS query API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;
use url::Url;

use super::response::{parse_assume_role, parse_error, parse_session_token};
use super::signer::sign_post;
use super::{AssumeRoleRequest, SecurityTokenService, SessionCredentials, StsError};
use crate::config::Configuration;
use crate::constants::{
    DEFAULT_DELEGATION_TOKEN_REGION, DELEGATION_TOKEN_ENDPOINT, DELEGATION_TOKEN_REGION,
    STS_STANDARD,
};
use crate::credentials::AwsCredentials;

/// STS API version.
const API_VERSION: &str = "2011-06-15";

/// A signed request ready to be sent.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// Endpoint URL
    pub url: Url,
    /// Headers, including `authorization`
    pub headers: Vec<(String, String)>,
    /// Form encoded body
    pub body: String,
}

/// STS client issuing SigV4 signed query API calls.
#[derive(Debug, Clone)]
pub struct StsClient {
    /// Endpoint URL, e.g. `https://sts.amazonaws.com/`
    endpoint: Url,
    /// Signing region
    region: String,
    /// HTTP client for making requests.
    client: reqwest::Client,
}

impl StsClient {
    /// Create a client for `endpoint`, which may be a bare host name.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid URL.
    pub fn new(endpoint: &str, region: impl Into<String>) -> Result<Self, StsError> {
        let endpoint = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("https://{}", endpoint)
        };
        let endpoint = Url::parse(&endpoint).map_err(|e| StsError::Endpoint(e.to_string()))?;
        if endpoint.host_str().is_none() {
            return Err(StsError::Endpoint(format!("{} has no host", endpoint)));
        }

        Ok(Self {
            endpoint,
            region: region.into(),
            client: reqwest::Client::new(),
        })
    }

    /// Create a client from [`DELEGATION_TOKEN_ENDPOINT`] and
    /// [`DELEGATION_TOKEN_REGION`].
    pub fn from_configuration(config: &Configuration) -> Result<Self, StsError> {
        let endpoint = config.get_trimmed_or(DELEGATION_TOKEN_ENDPOINT, STS_STANDARD);
        let region = config.get_trimmed_or(DELEGATION_TOKEN_REGION, DEFAULT_DELEGATION_TOKEN_REGION);
        Self::new(endpoint, region)
    }

    /// Endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Signing region.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Build and sign a request for `action` at `time`.
    pub fn build_request(
        &self,
        caller: &AwsCredentials,
        action: &str,
        params: &[(&str, String)],
        time: DateTime<Utc>,
    ) -> Result<SignedRequest, StsError> {
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        form.append_pair("Action", action);
        form.append_pair("Version", API_VERSION);
        for (key, value) in params {
            form.append_pair(key, value);
        }
        let body = form.finish();

        let host = match (self.endpoint.host_str(), self.endpoint.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(StsError::Endpoint("URL missing host".into())),
        };
        let headers = sign_post(caller, &self.region, &host, &body, time);

        Ok(SignedRequest {
            url: self.endpoint.clone(),
            headers,
            body,
        })
    }

    async fn send(&self, request: SignedRequest) -> Result<(u16, String), StsError> {
        let mut builder = self.client.post(request.url);
        for (name, value) in &request.headers {
            // reqwest derives host from the URL
            if name != "host" {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        let response = builder
            .body(request.body)
            .send()
            .await
            .map_err(|e| StsError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| StsError::Transport(e.to_string()))?;
        Ok((status, body))
    }
}

fn duration_param(duration: Duration) -> (&'static str, String) {
    ("DurationSeconds", duration.as_secs().to_string())
}

#[async_trait]
impl SecurityTokenService for StsClient {
    async fn get_session_token(
        &self,
        caller: &AwsCredentials,
        duration: Duration,
    ) -> Result<SessionCredentials, StsError> {
        debug!(endpoint = %self.endpoint, ?duration, "Requesting session token");
        let request = self.build_request(
            caller,
            "GetSessionToken",
            &[duration_param(duration)],
            Utc::now(),
        )?;
        match self.send(request).await? {
            (200, body) => parse_session_token(&body),
            (status, body) => Err(parse_error(status, &body)),
        }
    }

    async fn assume_role(
        &self,
        caller: &AwsCredentials,
        request: &AssumeRoleRequest,
    ) -> Result<SessionCredentials, StsError> {
        debug!(endpoint = %self.endpoint, role = %request.role_arn, "Assuming role");
        let mut params = vec![
            ("RoleArn", request.role_arn.clone()),
            ("RoleSessionName", request.session_name.clone()),
            duration_param(request.duration),
        ];
        if let Some(policy) = &request.policy {
            params.push(("Policy", policy.clone()));
        }
        let signed = self.build_request(caller, "AssumeRole", &params, Utc::now())?;
        match self.send(signed).await? {
            (200, body) => parse_assume_role(&body),
            (status, body) => Err(parse_error(status, &body)),
        }
    }
}
