//! Lifecycle state shared by every binding.
//!
//! A service is created in [`ServiceState::NotInited`], bound to its owning
//! filesystem, then moved through init, start and stop:
//!
//! ```text
//! NotInited --bind_to_file_system--> NotInited --init--> Inited --start--> Started --stop--> Stopped
//! ```
//!
//! Binding attributes are write-once: they are set by
//! [`ServiceBase::bind_to_file_system`] and read-only afterwards.

use std::fmt;

use tracing::debug;
use url::Url;

use crate::config::Configuration;
use crate::context::{OwnerIdentity, StoreContext};
use crate::DelegationError;

/// Lifecycle state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceState {
    /// No service instance exists yet.
    NotCreated,
    /// Created; may be bound to a filesystem.
    NotInited,
    /// Configured, not yet live.
    Inited,
    /// Live: issuance and redemption are permitted.
    Started,
    /// Stopped; terminal.
    Stopped,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotCreated => "NOTCREATED",
            Self::NotInited => "NOTINITED",
            Self::Inited => "INITED",
            Self::Started => "STARTED",
            Self::Stopped => "STOPPED",
        })
    }
}

/// Attributes attached by [`ServiceBase::bind_to_file_system`].
#[derive(Debug, Clone)]
struct FileSystemBinding {
    canonical_uri: Url,
    owner: OwnerIdentity,
    store_context: StoreContext,
}

/// Start/stop/init state machine with a bind-to-filesystem pre-init step.
#[derive(Debug)]
pub struct ServiceBase {
    name: String,
    state: ServiceState,
    binding: Option<FileSystemBinding>,
    config: Option<Configuration>,
}

impl ServiceBase {
    /// Create a service in [`ServiceState::NotInited`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: ServiceState::NotInited,
            binding: None,
            config: None,
        }
    }

    /// Service name, used for logging.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Bind to the owning filesystem.
    ///
    /// Must be called exactly once, before [`init`](Self::init). The owner
    /// identity is taken from the store context.
    pub fn bind_to_file_system(
        &mut self,
        uri: Url,
        store_context: StoreContext,
    ) -> Result<(), DelegationError> {
        if self.binding.is_some() {
            return Err(DelegationError::AlreadyBound);
        }
        if !matches!(self.state, ServiceState::NotCreated | ServiceState::NotInited) {
            return Err(DelegationError::IllegalState {
                expected: ServiceState::NotInited,
                actual: self.state,
            });
        }

        debug!(service = %self.name, %uri, "Binding to filesystem");
        self.binding = Some(FileSystemBinding {
            canonical_uri: uri,
            owner: store_context.owner().clone(),
            store_context,
        });
        Ok(())
    }

    /// Canonical URI of the filesystem; set once bound.
    pub fn canonical_uri(&self) -> Option<&Url> {
        self.binding.as_ref().map(|binding| &binding.canonical_uri)
    }

    /// Owner of the filesystem; set once bound.
    pub fn owner(&self) -> Option<&OwnerIdentity> {
        self.binding.as_ref().map(|binding| &binding.owner)
    }

    /// Store context of the filesystem; set once bound.
    pub fn store_context(&self) -> Option<&StoreContext> {
        self.binding.as_ref().map(|binding| &binding.store_context)
    }

    /// Configuration the service was initialized with.
    pub fn config(&self) -> Option<&Configuration> {
        self.config.as_ref()
    }

    /// Fail unless the service is in `expected`.
    pub fn require_state(&self, expected: ServiceState) -> Result<(), DelegationError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(DelegationError::IllegalState {
                expected,
                actual: self.state,
            })
        }
    }

    /// Fail unless the service is started.
    pub fn require_started(&self) -> Result<(), DelegationError> {
        self.require_state(ServiceState::Started)
    }

    /// Initialize the service.
    ///
    /// Fails if the service has not been bound to a filesystem; a failed init
    /// stops the service.
    pub fn init(&mut self, config: &Configuration) -> Result<(), DelegationError> {
        self.require_state(ServiceState::NotInited)?;
        if self.binding.is_none() {
            self.fail();
            return Err(DelegationError::NotBound);
        }
        self.config = Some(config.clone());
        self.state = ServiceState::Inited;
        debug!(service = %self.name, "Initialized");
        Ok(())
    }

    /// Start an initialized service.
    pub fn start(&mut self) -> Result<(), DelegationError> {
        self.require_state(ServiceState::Inited)?;
        self.state = ServiceState::Started;
        debug!(service = %self.name, "Started");
        Ok(())
    }

    /// Stop the service. Stopping is valid from every state and idempotent.
    pub fn stop(&mut self) {
        if self.state != ServiceState::Stopped {
            debug!(service = %self.name, from = %self.state, "Stopping");
            self.state = ServiceState::Stopped;
        }
    }

    /// Move to [`ServiceState::Stopped`] after a failed transition.
    pub fn fail(&mut self) {
        debug!(service = %self.name, state = %self.state, "Service failed");
        self.state = ServiceState::Stopped;
    }
}
