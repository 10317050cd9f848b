//! Key-serving SSH agent.
//!
//! Serves SSH private keys stored as vault envelopes (`*.age`) in a
//! directory. The agent is read-only: it lists and signs, and rejects every
//! request that would change its key set.

mod keycache;
mod server;
mod session;
mod sign;

pub use keycache::{candidates, scan, KeyCache, KeyEntry, KeySnapshot, SkippedEntry};
pub use server::{bind, default_socket_path, serve, shutdown_signal, RetryingListener};
pub use session::{identities, sign_request, AgentSession};
pub use sign::sign;
