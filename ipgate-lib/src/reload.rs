//! Rebuild the whitelist when its config file changes.
//!
//! The watcher observes the file's parent directory, since editors and
//! config management tools often replace a file rather than write it in
//! place. Events are debounced, then the file is loaded and validated in
//! full. A file that fails to load leaves the current rules in force.

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::load_from_path;
use crate::error::{GateError, Result};
use crate::security::AccessGate;
use crate::telemetry::Metrics;

/// Load `path` and install its rules and gate setting on `gate`
///
/// Returns the number of rules now active.
pub fn reload_from_path(path: &Path, gate: &AccessGate) -> Result<usize> {
    let cfg = load_from_path(path)?;
    let whitelist = cfg.whitelist.build()?;
    let rule_count = whitelist.len();

    // Off before the swap, on after it
    if cfg.gate.enabled {
        gate.set_whitelist(whitelist);
        gate.enable(true);
    } else {
        gate.enable(false);
        gate.set_whitelist(whitelist);
    }

    Ok(rule_count)
}

/// Background watcher; stops when dropped
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl ConfigWatcher {
    /// Start watching `path`. Must be called from within a Tokio runtime.
    pub fn spawn(
        path: impl Into<PathBuf>,
        gate: Arc<AccessGate>,
        debounce: Duration,
        metrics: Option<Arc<Metrics>>,
    ) -> Result<Self> {
        let path = path.into();
        let file_name: OsString = path
            .file_name()
            .ok_or_else(|| GateError::Config(format!("Not a file path: {}", path.display())))?
            .to_os_string();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if event.paths.iter().any(|p| p.file_name() == Some(file_name.as_os_str())) {
                    let _ = tx.send(());
                }
            }
            Err(e) => warn!(error = %e, "config watch error"),
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        info!(path = %path.display(), "watching config file for whitelist changes");

        let task = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                // Wait for the writer to go quiet
                loop {
                    match tokio::time::timeout(debounce, rx.recv()).await {
                        Ok(Some(())) => continue,
                        Ok(None) => return,
                        Err(_) => break,
                    }
                }

                match reload_from_path(&path, &gate) {
                    Ok(rules) => {
                        info!(rules, enabled = gate.is_enabled(), "whitelist reloaded");
                        if let Some(m) = &metrics {
                            m.record_reload(rules);
                        }
                    }
                    Err(err) => {
                        warn!(%err, "whitelist reload failed, keeping current rules");
                        if let Some(m) = &metrics {
                            m.record_reload_failure();
                        }
                    }
                }
            }
            debug!("config watcher stopped");
        });

        Ok(Self { _watcher: watcher, task })
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
