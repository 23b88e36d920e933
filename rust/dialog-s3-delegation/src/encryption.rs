//! Object encryption settings propagated inside delegation tokens.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DelegationError;

/// Server-side encryption method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncryptionMethod {
    /// No encryption.
    #[default]
    None,
    /// SSE-S3 with S3 managed keys.
    SseS3,
    /// SSE-KMS with a KMS key.
    SseKms,
    /// SSE-C with a client supplied key.
    SseC,
}

impl EncryptionMethod {
    /// Method name as used in configuration.
    pub fn method(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::SseS3 => "AES256",
            Self::SseKms => "SSE-KMS",
            Self::SseC => "SSE-C",
        }
    }
}

impl FromStr for EncryptionMethod {
    type Err = DelegationError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_uppercase().as_str() {
            "" | "NONE" => Ok(Self::None),
            "AES256" | "SSE-S3" => Ok(Self::SseS3),
            "SSE-KMS" => Ok(Self::SseKms),
            "SSE-C" => Ok(Self::SseC),
            other => Err(DelegationError::configuration(format!(
                "Unknown encryption method \"{other}\""
            ))),
        }
    }
}

impl fmt::Display for EncryptionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            other => f.write_str(other.method()),
        }
    }
}

/// Encryption method and key handed to a peer process through a token.
///
/// The key is never printed.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionSecrets {
    method: EncryptionMethod,
    key: String,
}

impl EncryptionSecrets {
    /// Secrets for `method` with `key` (a KMS key ARN or an SSE-C key).
    pub fn new(method: EncryptionMethod, key: impl Into<String>) -> Self {
        Self {
            method,
            key: key.into(),
        }
    }

    /// No encryption.
    pub fn none() -> Self {
        Self::default()
    }

    /// Encryption method.
    pub fn method(&self) -> EncryptionMethod {
        self.method
    }

    /// Encryption key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether a key is set.
    pub fn has_key(&self) -> bool {
        !self.key.is_empty()
    }

    /// Whether an encryption method is set.
    pub fn has_method(&self) -> bool {
        self.method != EncryptionMethod::None
    }
}

impl fmt::Debug for EncryptionSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionSecrets")
            .field("method", &self.method)
            .field("has_key", &self.has_key())
            .finish()
    }
}

impl fmt::Display for EncryptionSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "encryption method {} with {}",
            self.method,
            if self.has_key() { "key" } else { "no key" }
        )
    }
}
