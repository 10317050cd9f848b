//! SSH agent commands.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::{open_vault, output};
use crate::core::agent::{self, KeyCache};
use crate::core::config::Config;
use crate::error::Result;

/// Start the key-serving agent and block until SIGINT/SIGTERM.
///
/// Prints shell `export` lines on stdout so the output can be `eval`ed.
pub fn start_agent(keys_dir: Option<PathBuf>, socket: Option<PathBuf>, reload: bool) -> Result<()> {
    let config = Config::load()?;
    let dir = config.ssh_keys_dir(keys_dir)?;
    let vault = Arc::new(open_vault(&config)?);

    let cache = Arc::new(KeyCache::open(&dir, vault)?);
    let snapshot = cache.snapshot();
    output::success(&format!(
        "loaded {} SSH key(s) from {}",
        snapshot.len(),
        output::path(&dir)
    ));
    for skipped in snapshot.skipped() {
        output::warn(&format!("skipped {}: {}", skipped.path.display(), skipped.reason));
    }
    drop(snapshot);

    let socket = socket.unwrap_or_else(agent::default_socket_path);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let listener = agent::bind(&socket)?;

        output::data(format!("export SSH_AUTH_SOCK={}", socket.display()));
        output::data(format!("export SSH_AGENT_PID={}", std::process::id()));

        agent::serve(listener, &socket, cache, reload, agent::shutdown_signal()).await
    })
}

/// List the `*.age` key files without decrypting them.
pub fn list_keys(keys_dir: Option<PathBuf>, json: bool) -> Result<()> {
    let config = Config::load()?;
    let dir = config.ssh_keys_dir(keys_dir)?;
    let paths = agent::candidates(&dir)?;

    if json {
        let entries: Vec<_> = paths
            .iter()
            .map(|path| {
                serde_json::json!({
                    "name": path.file_name().map(|n| n.to_string_lossy().into_owned()),
                    "path": path.display().to_string(),
                })
            })
            .collect();
        output::data(serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if paths.is_empty() {
        output::warn(&format!("no *.age keys in {}", output::path(&dir)));
        return Ok(());
    }

    for path in &paths {
        if let Some(name) = path.file_name() {
            output::data(name.to_string_lossy());
        }
    }
    Ok(())
}
