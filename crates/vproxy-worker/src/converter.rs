//! Proxy mode conversion.
//!
//! Switches the live project from original media to proxy media. The project
//! is written to a snapshot in the work directory, reloaded on a blocking
//! thread so proxy attributes resolve fresh, and swapped in under paused
//! autosave.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use vproxy_models::{ProjectProxyMode, DEFAULT_AUDIO_TRACKS, DEFAULT_VIDEO_TRACKS};

use crate::autosave::AutosaveControl;
use crate::error::{ProjectLoadError, ProxyError, ProxyResult};
use crate::live_project::LiveProject;
use crate::logging::SessionLogger;
use crate::metrics;
use crate::persistence::ProjectStore;
use crate::workdir::WorkDir;

/// Result of a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConversionOutcome {
    /// The reloaded project is live in proxy mode
    Converted,
    /// A referenced media file is gone; the project was left as it was, back
    /// in original mode
    Reverted { missing: PathBuf },
    /// Reload failed for another reason; back in original mode
    Failed { cause: String },
}

impl ConversionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionOutcome::Converted => "converted",
            ConversionOutcome::Reverted { .. } => "reverted",
            ConversionOutcome::Failed { .. } => "failed",
        }
    }
}

/// Handle to a running conversion. There is no cancellation.
pub struct ConversionHandle {
    conversion_id: String,
    task: JoinHandle<ConversionOutcome>,
}

impl ConversionHandle {
    pub fn conversion_id(&self) -> &str {
        &self.conversion_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the swap (or revert) to complete.
    pub async fn wait(self) -> ProxyResult<ConversionOutcome> {
        Ok(self.task.await?)
    }
}

/// Converts the live project to proxy mode.
pub struct ProxyModeConverter {
    live: LiveProject,
    store: Arc<dyn ProjectStore>,
    autosave: Arc<dyn AutosaveControl>,
    work_dir: WorkDir,
    video_tracks: u32,
    audio_tracks: u32,
    busy: Arc<AtomicBool>,
}

impl ProxyModeConverter {
    pub fn new(
        live: LiveProject,
        store: Arc<dyn ProjectStore>,
        autosave: Arc<dyn AutosaveControl>,
        work_dir: WorkDir,
    ) -> Self {
        Self {
            live,
            store,
            autosave,
            work_dir,
            video_tracks: DEFAULT_VIDEO_TRACKS,
            audio_tracks: DEFAULT_AUDIO_TRACKS,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Track counts the reloaded project's sequences are normalized to.
    pub fn with_track_counts(mut self, video_tracks: u32, audio_tracks: u32) -> Self {
        self.video_tracks = video_tracks;
        self.audio_tracks = audio_tracks;
        self
    }

    /// True while a conversion task is running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Begin converting. Must be called inside a tokio runtime.
    ///
    /// Marks the project as converting and writes the snapshot before
    /// returning; the reload and swap run in the background.
    pub fn start(&self) -> ProxyResult<ConversionHandle> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ProxyError::ConversionInProgress);
        }
        let busy = BusyGuard(Arc::clone(&self.busy));

        let found = self.live.compare_and_set_mode(
            ProjectProxyMode::UseOriginal,
            ProjectProxyMode::ConvertingToProxy,
        );
        if found != ProjectProxyMode::UseOriginal {
            return Err(ProxyError::InvalidModeTransition(found));
        }

        let snapshot_path = self.work_dir.snapshot_path();
        let saved = self
            .work_dir
            .ensure()
            .and_then(|()| self.store.save(&self.live.current(), &snapshot_path));
        if let Err(e) = saved {
            self.revert_mode();
            return Err(e);
        }

        let conversion_id = Uuid::new_v4().to_string();
        let logger = SessionLogger::new(&conversion_id, "proxy_conversion");
        let span = logger.create_span();

        let task = ConversionTask {
            live: self.live.clone(),
            store: Arc::clone(&self.store),
            autosave: Arc::clone(&self.autosave),
            snapshot_path,
            video_tracks: self.video_tracks,
            audio_tracks: self.audio_tracks,
            logger,
            _busy: busy,
        };

        let task = tokio::spawn(task.run().instrument(span));

        Ok(ConversionHandle {
            conversion_id,
            task,
        })
    }

    fn revert_mode(&self) {
        self.live.compare_and_set_mode(
            ProjectProxyMode::ConvertingToProxy,
            ProjectProxyMode::UseOriginal,
        );
    }
}

/// Clears the converter's busy flag when dropped.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct ConversionTask {
    live: LiveProject,
    store: Arc<dyn ProjectStore>,
    autosave: Arc<dyn AutosaveControl>,
    snapshot_path: PathBuf,
    video_tracks: u32,
    audio_tracks: u32,
    logger: SessionLogger,
    _busy: BusyGuard,
}

impl ConversionTask {
    async fn run(self) -> ConversionOutcome {
        self.logger
            .log_start(&format!("reloading {}", self.snapshot_path.display()));

        let store = Arc::clone(&self.store);
        let path = self.snapshot_path.clone();
        let loaded = tokio::task::spawn_blocking(move || store.load(&path, false)).await;

        let outcome = match loaded {
            Ok(Ok(mut project)) => {
                project.set_track_counts(self.video_tracks, self.audio_tracks);
                project.set_proxy_mode(ProjectProxyMode::UseProxy);

                self.autosave.pause();
                self.live.swap_keeping_proxies(project);
                self.autosave.resume();

                ConversionOutcome::Converted
            }
            Ok(Err(ProjectLoadError::MediaNotFound(missing))) => {
                self.logger.log_warning(&format!(
                    "media file not found: {}, conversion abandoned",
                    missing.display()
                ));
                self.revert_mode();
                ConversionOutcome::Reverted { missing }
            }
            Ok(Err(e)) => {
                self.logger.log_error(&format!("reload failed: {}", e));
                self.revert_mode();
                ConversionOutcome::Failed {
                    cause: e.to_string(),
                }
            }
            Err(e) => {
                self.logger.log_error(&format!("reload task failed: {}", e));
                self.revert_mode();
                ConversionOutcome::Failed {
                    cause: e.to_string(),
                }
            }
        };

        match std::fs::remove_file(&self.snapshot_path) {
            Ok(()) => debug!("Removed snapshot {}", self.snapshot_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove snapshot {}: {}", self.snapshot_path.display(), e),
        }

        metrics::record_conversion(outcome.as_str());
        self.logger.log_completion(outcome.as_str());
        outcome
    }

    fn revert_mode(&self) {
        self.live.compare_and_set_mode(
            ProjectProxyMode::ConvertingToProxy,
            ProjectProxyMode::UseOriginal,
        );
    }
}
