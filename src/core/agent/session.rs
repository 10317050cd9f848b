//! SSH agent protocol session.
//!
//! `ssh-agent-lib` clones [`AgentSession`] once per accepted connection, so
//! per-connection state (whether the reload already ran) lives in the
//! clone while the key cache is shared.

use std::sync::Arc;

use ssh_agent_lib::agent::Session;
use ssh_agent_lib::error::AgentError as WireError;
use ssh_agent_lib::proto::{
    AddIdentity, AddIdentityConstrained, Extension, Identity, RemoveIdentity, SignRequest,
};
use ssh_key::Signature;
use tracing::{debug, warn};

use super::keycache::{KeyCache, KeySnapshot};
use super::sign;
use crate::error::{AgentError, Error, Result};

/// One agent connection.
#[derive(Clone, Debug)]
pub struct AgentSession {
    cache: Arc<KeyCache>,
    reload: bool,
    reloaded: bool,
}

impl AgentSession {
    /// Create the session prototype.
    ///
    /// With `reload` set, every connection rescans the keys directory
    /// before answering its first request.
    pub fn new(cache: Arc<KeyCache>, reload: bool) -> Self {
        Self {
            cache,
            reload,
            reloaded: false,
        }
    }

    /// The snapshot this request should be answered from.
    async fn snapshot(&mut self) -> Arc<KeySnapshot> {
        if self.reload && !self.reloaded {
            self.reloaded = true;
            let cache = Arc::clone(&self.cache);
            match tokio::task::spawn_blocking(move || cache.reload()).await {
                Ok(snapshot) => return snapshot,
                Err(e) => warn!(error = %e, "reload task failed, keeping previous keys"),
            }
        }
        self.cache.snapshot()
    }
}

/// Identities advertised for a snapshot, in cache order.
pub fn identities(snapshot: &KeySnapshot) -> Vec<Identity> {
    snapshot
        .keys()
        .iter()
        .map(|entry| Identity {
            pubkey: entry.public_key().key_data().clone(),
            comment: entry.comment.clone(),
        })
        .collect()
}

/// Answer a sign request from a snapshot.
///
/// # Errors
///
/// Returns `AgentError::KeyNotFound` when no cached key has exactly the
/// requested public key.
pub fn sign_request(snapshot: &KeySnapshot, request: &SignRequest) -> Result<Signature> {
    let entry = snapshot.find_key_data(&request.pubkey).ok_or_else(|| {
        let fingerprint = request
            .pubkey
            .fingerprint(ssh_key::HashAlg::Sha256)
            .to_string();
        AgentError::KeyNotFound(fingerprint)
    })?;

    debug!(
        fingerprint = %entry.fingerprint,
        comment = %entry.comment,
        data_len = request.data.len(),
        flags = request.flags,
        "sign"
    );
    sign::sign(entry.private_key(), &request.data, request.flags)
}

fn to_wire(e: Error) -> WireError {
    match e {
        Error::Agent(AgentError::Unsupported(_)) => WireError::Failure,
        Error::Agent(AgentError::UnsupportedExtension(_)) => WireError::ExtensionFailure,
        other => WireError::other(other),
    }
}

fn reject(operation: &'static str) -> WireError {
    debug!(operation, "rejecting request, this agent is read-only");
    to_wire(AgentError::Unsupported(operation).into())
}

#[ssh_agent_lib::async_trait]
impl Session for AgentSession {
    async fn request_identities(&mut self) -> std::result::Result<Vec<Identity>, WireError> {
        let snapshot = self.snapshot().await;
        let identities = identities(&snapshot);
        debug!(count = identities.len(), "request_identities");
        Ok(identities)
    }

    async fn sign(&mut self, request: SignRequest) -> std::result::Result<Signature, WireError> {
        let snapshot = self.snapshot().await;
        sign_request(&snapshot, &request).map_err(|e| {
            debug!(error = %e, "sign request failed");
            to_wire(e)
        })
    }

    async fn add_identity(&mut self, _identity: AddIdentity) -> std::result::Result<(), WireError> {
        Err(reject("add identity"))
    }

    async fn add_identity_constrained(
        &mut self,
        _identity: AddIdentityConstrained,
    ) -> std::result::Result<(), WireError> {
        Err(reject("add constrained identity"))
    }

    async fn remove_identity(
        &mut self,
        _identity: RemoveIdentity,
    ) -> std::result::Result<(), WireError> {
        Err(reject("remove identity"))
    }

    async fn remove_all_identities(&mut self) -> std::result::Result<(), WireError> {
        Err(reject("remove all identities"))
    }

    async fn lock(&mut self, _key: String) -> std::result::Result<(), WireError> {
        Err(reject("lock"))
    }

    async fn unlock(&mut self, _key: String) -> std::result::Result<(), WireError> {
        Err(reject("unlock"))
    }

    async fn extension(
        &mut self,
        extension: Extension,
    ) -> std::result::Result<Option<Extension>, WireError> {
        debug!(name = %extension.name, "rejecting extension request");
        Err(to_wire(
            AgentError::UnsupportedExtension(extension.name).into(),
        ))
    }
}
