//! Values supplied by the owning storage client when a binding is bound to it.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::DelegationError;

/// Identity of the user owning a filesystem instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerIdentity {
    /// Full user name, possibly a Kerberos style principal
    user_name: String,
    /// User acting on behalf of the owner, if any
    real_user: Option<String>,
}

impl OwnerIdentity {
    /// Create an identity for the given user.
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            real_user: None,
        }
    }

    /// Record the real user behind a proxied identity.
    pub fn with_real_user(mut self, real_user: impl Into<String>) -> Self {
        self.real_user = Some(real_user.into());
        self
    }

    /// Full user name.
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// User name without realm or host components, so `alice/host@REALM`
    /// becomes `alice`.
    pub fn short_user_name(&self) -> &str {
        self.user_name
            .split(['/', '@'])
            .next()
            .unwrap_or(&self.user_name)
    }

    /// Real user behind a proxied identity.
    pub fn real_user(&self) -> Option<&str> {
        self.real_user.as_deref()
    }
}

impl fmt::Display for OwnerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.real_user {
            Some(real) => write!(f, "{} (via {})", self.user_name, real),
            None => f.write_str(&self.user_name),
        }
    }
}

/// Store context of the owning filesystem: bucket, owner and path
/// resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreContext {
    /// Filesystem URI, e.g. `s3a://bucket/`
    fs_uri: Url,
    /// Bucket name taken from the URI host
    bucket: String,
    /// Owner of the filesystem
    owner: OwnerIdentity,
}

impl StoreContext {
    /// Create a store context for the filesystem at `fs_uri`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI has no host to take the bucket name from.
    pub fn new(fs_uri: Url, owner: OwnerIdentity) -> Result<Self, DelegationError> {
        let bucket = fs_uri
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| {
                DelegationError::configuration(format!("No bucket in filesystem URI {fs_uri}"))
            })?
            .to_string();

        Ok(Self {
            fs_uri,
            bucket,
            owner,
        })
    }

    /// Filesystem URI.
    pub fn fs_uri(&self) -> &Url {
        &self.fs_uri
    }

    /// Bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Owner of the filesystem.
    pub fn owner(&self) -> &OwnerIdentity {
        &self.owner
    }

    /// Qualify an object key into a full URI within the bucket.
    pub fn make_qualified(&self, key: &str) -> Url {
        let mut url = self.fs_uri.clone();
        url.set_path(&format!("/{}", key.trim_start_matches('/')));
        url.set_query(None);
        url.set_fragment(None);
        url
    }

    /// Convert a URI within this bucket back into an object key.
    pub fn path_to_key(&self, url: &Url) -> Option<String> {
        if url.scheme() != self.fs_uri.scheme() || url.host_str() != Some(self.bucket.as_str()) {
            return None;
        }
        Some(url.path().trim_start_matches('/').to_string())
    }
}
