//! Unix socket listener.

use std::fs;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ssh_agent_lib::agent::{Agent, ListeningSocket, Session};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

use super::keycache::KeyCache;
use super::session::AgentSession;
use crate::error::{AgentError, Result};

/// Pause after a failed accept before trying again.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Default socket path: `$TMPDIR/age-vault-ssh-agent-<pid>.sock`.
pub fn default_socket_path() -> PathBuf {
    std::env::temp_dir().join(format!("age-vault-ssh-agent-{}.sock", std::process::id()))
}

/// Removes the socket file when the agent stops.
struct SocketGuard {
    path: PathBuf,
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed agent socket"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove agent socket"),
        }
    }
}

/// Bind the agent socket, owner-only.
///
/// A stale socket file left by a previous run is removed first. The socket
/// is bound inside a fresh 0700 directory, restricted to 0600 there, and
/// only then renamed to `path`, so it is never reachable with
/// umask-derived permissions.
///
/// # Errors
///
/// Returns `AgentError::Socket` on any bind, chmod or rename failure.
pub fn bind(path: &Path) -> Result<UnixListener> {
    let socket_err = |source: io::Error| AgentError::Socket {
        path: path.to_path_buf(),
        source,
    };

    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed stale agent socket"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(socket_err(e).into()),
    }

    let parent = match path.parent().filter(|d| !d.as_os_str().is_empty()) {
        Some(dir) => dir,
        None => Path::new("."),
    };
    let staging = tempfile::Builder::new()
        .prefix(".age-vault-agent")
        .tempdir_in(parent)
        .map_err(socket_err)?;
    let staged = staging.path().join("s");

    let listener = UnixListener::bind(&staged).map_err(socket_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&staged, fs::Permissions::from_mode(0o600)).map_err(socket_err)?;
    }

    fs::rename(&staged, path).map_err(socket_err)?;
    Ok(listener)
}

/// A listener that logs failed accepts and keeps going.
///
/// `ssh_agent_lib::agent::listen` stops at the first accept error, and
/// errors such as `EMFILE` clear up once other connections close.
#[derive(Debug)]
pub struct RetryingListener<S>(pub S);

#[ssh_agent_lib::async_trait]
impl<S> ListeningSocket for RetryingListener<S>
where
    S: ListeningSocket + std::fmt::Debug + Send,
{
    type Stream = S::Stream;

    async fn accept(&mut self) -> io::Result<Self::Stream> {
        loop {
            match self.0.accept().await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    warn!(error = %e, "failed to accept agent connection, retrying");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            }
        }
    }
}

impl Agent<RetryingListener<UnixListener>> for AgentSession {
    fn new_session(&mut self, _socket: &UnixStream) -> impl Session {
        self.clone()
    }
}

/// Serve the agent protocol on a listener from [`bind`] until `shutdown`
/// resolves.
///
/// The socket file at `socket_path` is removed when this returns, whether
/// the listener stopped on its own or `shutdown` fired. Open connections
/// are not drained.
pub async fn serve<F>(
    listener: UnixListener,
    socket_path: &Path,
    cache: Arc<KeyCache>,
    reload: bool,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    let _guard = SocketGuard {
        path: socket_path.to_path_buf(),
    };

    info!(
        socket = %socket_path.display(),
        keys = cache.snapshot().len(),
        reload,
        "SSH agent listening"
    );

    let session = AgentSession::new(cache, reload);
    tokio::select! {
        result = ssh_agent_lib::agent::listen(RetryingListener(listener), session) => {
            result.map_err(|e| AgentError::Socket {
                path: socket_path.to_path_buf(),
                source: io::Error::other(e.to_string()),
            })?;
        }
        () = shutdown => {
            info!("received shutdown signal, stopping agent");
        }
    }

    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to register SIGTERM handler, using SIGINT only");
                ctrl_c.await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vault::VaultKey;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_bind_replaces_stale_socket() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("agent.sock");
        fs::write(&path, b"stale").unwrap();

        let _listener = bind(&path).unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
        }
    }

    #[tokio::test]
    async fn test_bind_leaves_no_staging_directory() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("agent.sock");

        let _listener = bind(&path).unwrap();
        UnixStream::connect(&path).await.unwrap();

        let entries: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("agent.sock")]);
    }

    /// Fails `failures` times, then hands out one end of a duplex pipe.
    #[derive(Debug)]
    struct FlakyListener {
        failures: usize,
        attempts: usize,
    }

    #[ssh_agent_lib::async_trait]
    impl ListeningSocket for FlakyListener {
        type Stream = tokio::io::DuplexStream;

        async fn accept(&mut self) -> io::Result<Self::Stream> {
            self.attempts += 1;
            if self.attempts <= self.failures {
                return Err(io::Error::other("too many open files"));
            }
            Ok(tokio::io::duplex(64).0)
        }
    }

    #[tokio::test]
    async fn test_accept_errors_are_retried() {
        let mut listener = RetryingListener(FlakyListener {
            failures: 2,
            attempts: 0,
        });

        listener.accept().await.unwrap();
        assert_eq!(listener.0.attempts, 3);
    }

    #[tokio::test]
    async fn test_bind_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing").join("agent.sock");

        let result = bind(&path);
        assert!(matches!(
            result,
            Err(crate::error::Error::Agent(AgentError::Socket { .. }))
        ));
    }

    #[tokio::test]
    async fn test_serve_removes_socket_on_shutdown() {
        let tmp = TempDir::new().unwrap();
        let keys = tmp.path().join("keys");
        fs::create_dir(&keys).unwrap();
        let cache = Arc::new(KeyCache::open(&keys, Arc::new(VaultKey::generate())).unwrap());
        let path = tmp.path().join("agent.sock");

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server_path = path.clone();
        let listener = bind(&path).unwrap();
        let server = tokio::spawn(async move {
            serve(listener, &server_path, cache, false, async {
                rx.await.ok();
            })
            .await
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(path.exists());

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
        assert!(!path.exists());
    }
}
