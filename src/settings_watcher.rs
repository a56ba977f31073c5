//! Settings file watcher for hot-reload.
//!
//! Wraps a `notify` watcher and turns file system events for the settings
//! file into [`SettingsEvent`]s the embedder polls from its own loop.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use tracing::{debug, error};

pub use crate::settings::default_settings_path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsEvent {
    Created,
    Modified,
    Deleted,
    Error(String),
}

pub struct SettingsWatcher {
    path: PathBuf,
    events: Receiver<notify::Result<Event>>,
    _watcher: RecommendedWatcher,
}

impl SettingsWatcher {
    /// Watch `path`. The parent directory is watched as well so the file can
    /// be created after the watcher starts.
    pub fn new(path: PathBuf) -> notify::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        let target = if path.exists() {
            path.as_path()
        } else {
            path.parent().unwrap_or_else(|| Path::new("."))
        };
        watcher.watch(target, RecursiveMode::NonRecursive)?;
        debug!(path = %path.display(), "Watching settings file");

        Ok(Self {
            path,
            events: rx,
            _watcher: watcher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next relevant event, without blocking.
    pub fn poll(&mut self) -> Option<SettingsEvent> {
        loop {
            match self.events.try_recv() {
                Ok(Ok(event)) => {
                    if !event.paths.iter().any(|p| p == &self.path) {
                        continue;
                    }
                    let mapped = match event.kind {
                        EventKind::Create(_) => SettingsEvent::Created,
                        EventKind::Modify(_) => SettingsEvent::Modified,
                        EventKind::Remove(_) => SettingsEvent::Deleted,
                        _ => continue,
                    };
                    return Some(mapped);
                }
                Ok(Err(e)) => {
                    error!("Settings watch error: {e}");
                    return Some(SettingsEvent::Error(e.to_string()));
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            }
        }
    }
}
