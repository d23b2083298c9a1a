//! Watch command implementation

use clap::Args;
use layerconf_core::{ConfigError, Configuration};
use layerconf_hosting::ConfigurationBuilderBuilder;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::ShowCommand;

/// Watch command arguments
#[derive(Args, Debug)]
pub struct WatchCommand {
    /// Debounce delay in milliseconds for file changes
    #[arg(long, default_value = "500")]
    pub debounce: u64,

    /// Only print keys below this section
    #[arg(short, long)]
    pub section: Option<String>,
}

/// True when `changed` is one of the watched files. File names are compared
/// as a fallback since watchers may report canonicalized paths.
fn is_watched(changed: &Path, watched: &[PathBuf]) -> bool {
    watched
        .iter()
        .any(|w| w == changed || (w.file_name().is_some() && w.file_name() == changed.file_name()))
}

/// Distinct directories containing the watched files
fn watch_dirs(watched: &[PathBuf], base: &Path) -> Vec<PathBuf> {
    let mut dirs = vec![base.to_path_buf()];
    for dir in watched.iter().filter_map(|p| p.parent()) {
        if !dirs.iter().any(|d| d == dir) {
            dirs.push(dir.to_path_buf());
        }
    }
    dirs
}

impl WatchCommand {
    /// Print the configuration, then reload and print again on every change
    /// until interrupted
    pub async fn execute(&self, mut builder: ConfigurationBuilderBuilder) -> Result<(), ConfigError> {
        let configuration = builder.build()?;
        let watched = builder.builder()?.watch_paths();
        let base = match builder.base_path() {
            Some(base) => base.to_path_buf(),
            None => std::env::current_dir()?,
        };

        let show = ShowCommand {
            section: self.section.clone(),
            json: false,
        };
        show.execute(&configuration)?;

        let (tx, mut rx) = mpsc::channel::<PathBuf>(10);
        let rt = tokio::runtime::Handle::current();
        let filter = watched.clone();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                if let Ok(event) = result {
                    if !(event.kind.is_modify() || event.kind.is_create()) {
                        return;
                    }
                    for path in event.paths.into_iter().filter(|p| is_watched(p, &filter)) {
                        let tx = tx.clone();
                        let _ = rt.block_on(async move { tx.send(path).await });
                    }
                }
            },
            Config::default().with_poll_interval(Duration::from_millis(500)),
        )
        .map_err(|e| ConfigError::Internal(format!("Failed to create file watcher: {}", e)))?;

        for dir in watch_dirs(&watched, &base) {
            if !dir.is_dir() {
                continue;
            }
            if let Err(e) = watcher.watch(&dir, RecursiveMode::NonRecursive) {
                error!("Failed to watch {}: {}", dir.display(), e);
            }
        }
        info!("Watching {} configuration files in {}", watched.len(), base.display());

        let debounce = Duration::from_millis(self.debounce);
        let mut last_reload = Instant::now();

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                changed = rx.recv() => {
                    let Some(changed) = changed else { break };
                    if last_reload.elapsed() < debounce {
                        continue;
                    }
                    info!("{} changed, reloading...", changed.display());

                    match reload(configuration.clone()).await {
                        Ok(()) => {
                            last_reload = Instant::now();
                            show.execute(&configuration)?;
                        }
                        Err(e) => {
                            warn!("Failed to reload configuration: {}", e);
                            warn!("Keeping previous configuration");
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

async fn reload(configuration: Configuration) -> Result<(), ConfigError> {
    tokio::task::spawn_blocking(move || configuration.reload())
        .await
        .map_err(|e| ConfigError::Internal(format!("Reload task failed: {}", e)))?
}
