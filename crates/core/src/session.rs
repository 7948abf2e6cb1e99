//! Session Gate
//!
//! The controller never talks to an identity provider directly. It consumes a
//! `SessionGate`, which answers "who is signed in" and can end the session.

use crate::model::Identity;
use async_trait::async_trait;
use std::sync::RwLock;
use tracing::info;

/// Capability surface of an authentication session.
#[async_trait]
pub trait SessionGate: Send + Sync {
    /// Prepares the gate before the first identity lookup.
    async fn initialize(&self) {}

    /// Returns the signed-in identity, if the stored session is still valid.
    async fn current_identity(&self) -> Option<Identity>;

    /// Ends the session with the identity provider.
    async fn sign_out(&self);
}

/// A gate that trusts whatever label it is given.
///
/// Credential exchange is left to whoever calls `sign_in`; this gate only
/// remembers the outcome for the lifetime of the process.
#[derive(Debug, Default)]
pub struct LocalSessionGate {
    identity: RwLock<Option<Identity>>,
}

impl LocalSessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts out signed in as `label`.
    pub fn signed_in(label: impl Into<String>) -> Self {
        Self {
            identity: RwLock::new(Some(Identity::new(label))),
        }
    }

    pub fn sign_in(&self, label: impl Into<String>) {
        let identity = Identity::new(label);
        info!(identity = %identity, "Signed in");
        *self.identity.write().unwrap_or_else(|e| e.into_inner()) = Some(identity);
    }
}

#[async_trait]
impl SessionGate for LocalSessionGate {
    async fn current_identity(&self) -> Option<Identity> {
        self.identity
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn sign_out(&self) {
        if let Some(identity) = self
            .identity
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            info!(identity = %identity, "Signed out");
        }
    }
}
