use anyhow::{anyhow, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::sync::mpsc::channel;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Watches the schema file and calls back after each change.
///
/// The parent directory is watched rather than the file itself, so saves that
/// write a new file and rename it over the old one keep being seen.
pub struct SchemaWatcher {
    _watcher: RecommendedWatcher,
}

impl SchemaWatcher {
    pub fn new<F>(path: &str, on_change: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let schema_path = Path::new(path);
        let file_name = schema_path
            .file_name()
            .map(OsStr::to_os_string)
            .ok_or_else(|| anyhow!("Theme schema path has no file name: {}", path))?;
        let dir = match schema_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let (tx, rx) = channel();

        let mut watcher = RecommendedWatcher::new(tx, Config::default())?;

        if dir.exists() {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            info!("Watching theme schema: {}", path);
        } else {
            warn!("Theme schema directory does not exist, not watching: {}", dir.display());
        }

        std::thread::spawn(move || loop {
            match rx.recv() {
                Ok(Ok(event)) => {
                    if !touches_schema(&event, &file_name) {
                        continue;
                    }
                    // Debounce slightly by waiting, then drop the burst
                    std::thread::sleep(Duration::from_millis(100));
                    while rx.try_recv().is_ok() {}
                    info!("Theme schema change detected, reloading...");
                    on_change();
                }
                Ok(Err(e)) => error!("Watch error: {:?}", e),
                Err(e) => {
                    error!("Watch channel error: {:?}", e);
                    break;
                }
            }
        });

        Ok(Self { _watcher: watcher })
    }
}

/// Whether a directory event changes the schema file. Reads are ignored,
/// the reload itself would trigger one otherwise.
fn touches_schema(event: &Event, file_name: &OsString) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    let hit = event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(file_name.as_os_str()));
    if !hit {
        debug!(paths = ?event.paths, "Ignoring change to another file");
    }
    hit
}
