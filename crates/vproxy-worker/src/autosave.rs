//! Periodic project autosave.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::live_project::LiveProject;
use crate::persistence::ProjectStore;

/// Pause switch for autosave, held by code that must not race a save.
pub trait AutosaveControl: Send + Sync {
    fn pause(&self);
    fn resume(&self);
    fn is_paused(&self) -> bool;
}

#[derive(Debug, Default)]
struct AutosaveState {
    paused: AtomicBool,
    saves: AtomicU64,
}

/// Background task saving the live project every interval unless paused.
pub struct Autosave {
    state: Arc<AutosaveState>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Autosave {
    /// Spawn the autosave task. Must be called inside a tokio runtime.
    pub fn start(
        live: LiveProject,
        store: Arc<dyn ProjectStore>,
        path: PathBuf,
        interval: Duration,
    ) -> Self {
        let state = Arc::new(AutosaveState::default());
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let task_state = Arc::clone(&state);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        if task_state.paused.load(Ordering::SeqCst) {
                            debug!("Autosave paused, skipping");
                            continue;
                        }

                        let project = live.current();
                        let store = Arc::clone(&store);
                        let path = path.clone();
                        let saved = tokio::task::spawn_blocking(move || store.save(&project, &path)).await;

                        match saved {
                            Ok(Ok(())) => {
                                task_state.saves.fetch_add(1, Ordering::SeqCst);
                            }
                            Ok(Err(e)) => warn!("Autosave failed: {}", e),
                            Err(e) => warn!("Autosave task panicked: {}", e),
                        }
                    }
                }
            }
        });

        Self {
            state,
            shutdown,
            task,
        }
    }

    /// Number of successful saves so far.
    pub fn saves(&self) -> u64 {
        self.state.saves.load(Ordering::SeqCst)
    }

    /// Stop the task and wait for it.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

impl AutosaveControl for Autosave {
    fn pause(&self) {
        self.state.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.state.paused.store(false, Ordering::SeqCst);
    }

    fn is_paused(&self) -> bool {
        self.state.paused.load(Ordering::SeqCst)
    }
}
