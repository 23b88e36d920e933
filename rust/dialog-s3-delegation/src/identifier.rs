//! Token identifiers: the portable record a binding issues and redeems.
//!
//! An identifier is immutable once issued. It carries the issuing
//! filesystem, the owner, the encryption secrets to propagate and a
//! kind-specific payload. Encoding is left to the caller through `serde`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use url::Url;

use crate::DelegationError;
use crate::context::OwnerIdentity;
use crate::credentials::MarshalledCredentials;
use crate::encryption::EncryptionSecrets;
use crate::token::TokenKind;

/// Kind-specific material carried by an identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenPayload {
    /// Nothing beyond the common fields.
    #[default]
    None,
    /// Marshalled AWS credentials.
    Credentials(MarshalledCredentials),
    /// Names of the providers to deploy on redemption.
    Injected {
        /// Comma separated provider names
        provider: String,
    },
}

/// Identifier of an issued delegation token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenIdentifier {
    kind: TokenKind,
    uri: Option<Url>,
    owner: Option<OwnerIdentity>,
    renewer: Option<String>,
    issue_date: DateTime<Utc>,
    expiry: Option<DateTime<Utc>>,
    uuid: String,
    origin: String,
    encryption_secrets: EncryptionSecrets,
    payload: TokenPayload,
}

impl TokenIdentifier {
    /// Zero valued identifier of `kind`, filled in by a decoder.
    pub fn empty(kind: TokenKind) -> Self {
        Self {
            kind,
            uri: None,
            owner: None,
            renewer: None,
            issue_date: DateTime::<Utc>::default(),
            expiry: None,
            uuid: String::new(),
            origin: String::new(),
            encryption_secrets: EncryptionSecrets::default(),
            payload: TokenPayload::None,
        }
    }

    /// New identifier issued now for the filesystem at `uri`.
    pub fn new(kind: TokenKind, uri: Url, owner: OwnerIdentity) -> Self {
        Self {
            uri: Some(uri),
            owner: Some(owner),
            issue_date: Utc::now(),
            uuid: Ulid::new().to_string(),
            ..Self::empty(kind)
        }
    }

    /// Set the renewer.
    pub fn with_renewer(mut self, renewer: Option<&str>) -> Self {
        self.renewer = renewer.map(String::from);
        self
    }

    /// Set the expiry time.
    pub fn with_expiry(mut self, expiry: Option<DateTime<Utc>>) -> Self {
        self.expiry = expiry;
        self
    }

    /// Describe where the token was issued.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Set the encryption secrets to propagate.
    pub fn with_encryption_secrets(mut self, secrets: EncryptionSecrets) -> Self {
        self.encryption_secrets = secrets;
        self
    }

    /// Set the kind-specific payload.
    pub fn with_payload(mut self, payload: TokenPayload) -> Self {
        self.payload = payload;
        self
    }

    /// Token kind.
    pub fn kind(&self) -> &TokenKind {
        &self.kind
    }

    /// URI of the issuing filesystem.
    pub fn uri(&self) -> Option<&Url> {
        self.uri.as_ref()
    }

    /// Owner of the issuing filesystem.
    pub fn owner(&self) -> Option<&OwnerIdentity> {
        self.owner.as_ref()
    }

    /// Principal allowed to renew the token.
    pub fn renewer(&self) -> Option<&str> {
        self.renewer.as_deref()
    }

    /// Issue time.
    pub fn issue_date(&self) -> DateTime<Utc> {
        self.issue_date
    }

    /// Expiry time, if the payload expires.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }

    /// Unique id of this token.
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Where the token was issued.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Encryption secrets.
    pub fn encryption_secrets(&self) -> &EncryptionSecrets {
        &self.encryption_secrets
    }

    /// Kind-specific payload.
    pub fn payload(&self) -> &TokenPayload {
        &self.payload
    }

    /// Marshalled credentials, if the payload carries them.
    pub fn marshalled_credentials(&self) -> Option<&MarshalledCredentials> {
        match &self.payload {
            TokenPayload::Credentials(credentials) => Some(credentials),
            _ => None,
        }
    }

    /// Role ARN recorded with marshalled credentials.
    pub fn role_arn(&self) -> Option<&str> {
        self.marshalled_credentials()
            .and_then(MarshalledCredentials::role_arn)
    }

    /// Fail unless this identifier is of `expected` kind.
    pub fn ensure_kind(&self, expected: &TokenKind) -> Result<(), DelegationError> {
        if &self.kind == expected {
            Ok(())
        } else {
            Err(DelegationError::IdentifierKindMismatch {
                expected: expected.clone(),
                found: self.kind.clone(),
            })
        }
    }
}

impl fmt::Display for TokenIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(uri) = &self.uri {
            write!(f, "; uri={uri}")?;
        }
        if let Some(owner) = &self.owner {
            write!(f, "; owner={owner}")?;
        }
        write!(f, "; issued={}", self.issue_date.to_rfc3339())?;
        if let Some(expiry) = self.expiry {
            write!(f, "; expires={}", expiry.to_rfc3339())?;
        }
        if !self.uuid.is_empty() {
            write!(f, "; uuid={}", self.uuid)?;
        }
        if !self.origin.is_empty() {
            write!(f, "; origin=\"{}\"", self.origin)?;
        }
        write!(f, "; {}", self.encryption_secrets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::AwsCredentials;
    use crate::encryption::EncryptionMethod;
    use pretty_assertions::assert_eq;

    fn identifier() -> TokenIdentifier {
        TokenIdentifier::new(
            TokenKind::SESSION,
            Url::parse("s3a://example-bucket/").unwrap(),
            OwnerIdentity::new("alice"),
        )
    }

    #[test]
    fn it_assigns_unique_ids() {
        assert_ne!(identifier().uuid(), identifier().uuid());
        assert!(TokenIdentifier::empty(TokenKind::FULL).uuid().is_empty());
    }

    #[test]
    fn it_checks_its_kind() {
        let identifier = identifier();
        assert!(identifier.ensure_kind(&TokenKind::SESSION).is_ok());
        assert!(matches!(
            identifier.ensure_kind(&TokenKind::ROLE),
            Err(DelegationError::IdentifierKindMismatch { .. })
        ));
    }

    #[test]
    fn it_survives_a_serde_round_trip() {
        let credentials = MarshalledCredentials::from_credentials(&AwsCredentials::session(
            "ASIAEXAMPLE",
            "secret",
            "token",
        ))
        .with_role_arn("arn:aws:iam::123456789012:role/reader");
        let identifier = identifier()
            .with_renewer(Some("yarn"))
            .with_payload(TokenPayload::Credentials(credentials));

        let json = serde_json::to_string(&identifier).unwrap();
        let decoded: TokenIdentifier = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, identifier);
        assert_eq!(decoded.role_arn(), Some("arn:aws:iam::123456789012:role/reader"));
    }

    #[test]
    fn it_keeps_secrets_out_of_its_display_form() {
        let credentials = MarshalledCredentials::from_credentials(&AwsCredentials::new(
            "AKIAEXAMPLE",
            "secret-value",
        ));
        let identifier = identifier()
            .with_encryption_secrets(EncryptionSecrets::new(EncryptionMethod::SseC, "sse-c-key"))
            .with_payload(TokenPayload::Credentials(credentials));
        let text = identifier.to_string();
        assert!(text.starts_with("S3ADelegationToken/Session; uri=s3a://example-bucket/"));
        assert!(!text.contains("secret-value"));
        assert!(!text.contains("sse-c-key"));
    }
}
