use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::event::{CreateKind, ModifyKind};
use notify::{Event, EventKind, RecursiveMode, Watcher, recommended_watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::store::SettingsStore;

fn touches(event: &Event, target: &Path) -> bool {
    let Some(name) = target.file_name() else {
        return false;
    };
    event.paths.iter().any(|p| p.file_name() == Some(name))
}

fn is_write(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(CreateKind::File | CreateKind::Any)
            | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Name(_) | ModifyKind::Any)
    )
}

/// Reload the settings blob whenever the file is written by someone else.
///
/// Our own saves also trigger a reload; the store only notifies subscribers
/// when the reloaded value differs, so those are silent.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn run(path: PathBuf, store: SettingsStore, cancel: CancellationToken) -> Result<()> {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => dir.to_path_buf(),
        None => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create settings directory {}", dir.display()))?;

    // Bridge notify callback -> async channel
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Result<Event>>(32);
    let mut watcher = recommended_watcher(move |res| {
        let _ = watch_tx.blocking_send(res);
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    info!(watching = %dir.display(), "settings watcher initialized");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("cancel received; exiting settings watcher");
                break;
            }

            Some(res) = watch_rx.recv() => match res {
                Ok(event) if is_write(&event.kind) && touches(&event, &path) => {
                    debug!(kind = ?event.kind, "settings file changed");
                    let store = store.clone();
                    match tokio::task::spawn_blocking(move || store.reload()).await? {
                        Ok(true) => info!("applied external settings change"),
                        Ok(false) => debug!("settings file unchanged"),
                        Err(err) => warn!(error = %err, "ignoring unreadable settings file"),
                    }
                }
                Ok(event) => debug!(kind = ?event.kind, "fs: ignored"),
                Err(err) => error!("watch error: {err}"),
            }
        }
    }
    Ok(())
}
