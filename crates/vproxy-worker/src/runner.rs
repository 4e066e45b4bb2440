//! Render job runner.
//!
//! Encodes a queue of proxy jobs one at a time on a background task. The
//! backend only exposes pull-style progress, so each encode is polled at a
//! fixed interval until its drive rate drops to zero or an abort arrives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, Instrument};
use uuid::Uuid;

use vproxy_media::{EncodeHandle, EncodeSink, RenderBackend, Timeline};
use vproxy_models::{JobState, MediaId, ProxyEncoding, ProxyProfile, RenderJob};

use crate::config::ProxyConfig;
use crate::error::ProxyResult;
use crate::live_project::MediaCatalog;
use crate::logging::SessionLogger;
use crate::metrics;
use crate::observer::{ProgressObserver, ProgressUpdate};
use crate::workdir::ProfileFile;

/// Runner settings.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Interval between progress polls
    pub poll_interval: Duration,
    /// Pinned video bitrate for every proxy encode
    pub video_bitrate: String,
    pub encoding: ProxyEncoding,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::from(&ProxyConfig::default())
    }
}

impl From<&ProxyConfig> for RunnerConfig {
    fn from(config: &ProxyConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            video_bitrate: config.video_bitrate.clone(),
            encoding: ProxyEncoding::proxy(),
        }
    }
}

/// How a render session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Every job was committed
    Finished,
    /// Aborted by the caller
    Stopped,
    /// A job could not be encoded; later jobs were not started
    Failed { label: String, cause: String },
}

impl SessionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionOutcome::Finished => "finished",
            SessionOutcome::Stopped => "stopped",
            SessionOutcome::Failed { .. } => "failed",
        }
    }
}

/// Summary delivered with the terminal session notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub outcome: SessionOutcome,
    /// Media items that received a proxy, in queue order
    pub committed: Vec<MediaId>,
    /// Number of jobs queued
    pub total: usize,
    pub elapsed: Duration,
    pub started_at: DateTime<Utc>,
}

/// Handle to a running render session.
///
/// Dropping the handle detaches the session; it keeps running to completion.
pub struct RenderSessionHandle {
    session_id: String,
    abort: watch::Sender<bool>,
    task: JoinHandle<SessionReport>,
}

impl RenderSessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Request cooperative cancellation.
    ///
    /// The in-flight encode is stopped and no further jobs start. Returns
    /// immediately; wait for the report to know resources were released.
    pub fn abort(&self) {
        self.abort.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session to end.
    pub async fn wait(self) -> ProxyResult<SessionReport> {
        Ok(self.task.await?)
    }
}

/// Starts render sessions against a backend.
pub struct RenderJobRunner {
    backend: Arc<dyn RenderBackend>,
    config: RunnerConfig,
}

impl RenderJobRunner {
    pub fn new(backend: Arc<dyn RenderBackend>, config: RunnerConfig) -> Self {
        Self { backend, config }
    }

    /// Start processing `jobs` in order on a background task.
    ///
    /// Must be called inside a tokio runtime. Returns immediately.
    pub fn start(
        &self,
        profile: Arc<ProxyProfile>,
        jobs: Vec<RenderJob>,
        catalog: Arc<dyn MediaCatalog>,
        observer: Arc<dyn ProgressObserver>,
    ) -> RenderSessionHandle {
        self.start_session(profile, jobs, catalog, observer, None)
    }

    /// Like [`start`](Self::start), removing `profile_file` when the session ends.
    pub fn start_with_profile_file(
        &self,
        profile: Arc<ProxyProfile>,
        jobs: Vec<RenderJob>,
        catalog: Arc<dyn MediaCatalog>,
        observer: Arc<dyn ProgressObserver>,
        profile_file: ProfileFile,
    ) -> RenderSessionHandle {
        self.start_session(profile, jobs, catalog, observer, Some(profile_file))
    }

    fn start_session(
        &self,
        profile: Arc<ProxyProfile>,
        jobs: Vec<RenderJob>,
        catalog: Arc<dyn MediaCatalog>,
        observer: Arc<dyn ProgressObserver>,
        profile_file: Option<ProfileFile>,
    ) -> RenderSessionHandle {
        let session_id = Uuid::new_v4().to_string();
        let (abort, abort_rx) = watch::channel(false);
        let logger = SessionLogger::new(&session_id, "proxy_render");
        let span = logger.create_span();

        let session = RenderSession {
            session_id: session_id.clone(),
            backend: Arc::clone(&self.backend),
            config: self.config.clone(),
            profile,
            jobs,
            catalog,
            observer,
            abort: abort_rx,
            detached: false,
            logger,
            profile_file,
        };

        let task = tokio::spawn(session.run().instrument(span));

        RenderSessionHandle {
            session_id,
            abort,
            task,
        }
    }
}

/// How one job ended.
enum JobEnd {
    Committed,
    Aborted,
    Failed(String),
}

impl JobEnd {
    fn state(&self) -> JobState {
        match self {
            JobEnd::Committed => JobState::Committed,
            JobEnd::Aborted => JobState::Aborted,
            JobEnd::Failed(_) => JobState::Failed,
        }
    }
}

/// Why the polling loop exited.
enum PollExit {
    Drained,
    Aborted,
}

struct RenderSession {
    session_id: String,
    backend: Arc<dyn RenderBackend>,
    config: RunnerConfig,
    profile: Arc<ProxyProfile>,
    jobs: Vec<RenderJob>,
    catalog: Arc<dyn MediaCatalog>,
    observer: Arc<dyn ProgressObserver>,
    abort: watch::Receiver<bool>,
    /// Set when the session handle was dropped
    detached: bool,
    logger: SessionLogger,
    profile_file: Option<ProfileFile>,
}

impl RenderSession {
    async fn run(mut self) -> SessionReport {
        let started = Instant::now();
        let started_at = Utc::now();
        let total = self.jobs.len();
        let mut committed = Vec::with_capacity(total);
        let mut outcome = SessionOutcome::Finished;

        self.logger.log_start(&format!(
            "{} proxy job(s) at {}x{}",
            total, self.profile.width, self.profile.height
        ));

        let jobs = std::mem::take(&mut self.jobs);
        for (i, job) in jobs.iter().enumerate() {
            if self.abort_requested() {
                outcome = SessionOutcome::Stopped;
                break;
            }

            let index = i + 1;
            let job_started = Instant::now();
            debug!(media = %job.label(), index, state = %JobState::Encoding, "Proxy job started");

            let end = self.run_job(job, index, total, started).await;
            let state = end.state();
            metrics::record_job(state.as_str(), job_started.elapsed().as_secs_f64());
            info!(media = %job.label(), index, state = %state, "Proxy job ended");

            match end {
                JobEnd::Committed => {
                    committed.push(job.media.id.clone());
                    self.notify(1.0, job.label(), index, total, started);
                    if let Some(next) = jobs.get(index) {
                        self.notify(0.0, next.label(), index + 1, total, started);
                    }
                }
                JobEnd::Aborted => {
                    outcome = SessionOutcome::Stopped;
                    break;
                }
                JobEnd::Failed(cause) => {
                    self.logger
                        .log_error(&format!("{} failed: {}", job.label(), cause));
                    outcome = SessionOutcome::Failed {
                        label: job.label().to_string(),
                        cause,
                    };
                    break;
                }
            }
        }

        // Release the profile file before telling anyone the session is over
        self.profile_file.take();

        let report = SessionReport {
            session_id: self.session_id.clone(),
            outcome,
            committed,
            total,
            elapsed: started.elapsed(),
            started_at,
        };

        metrics::record_session(report.outcome.as_str());
        self.logger.log_completion(&format!(
            "{} ({}/{} committed)",
            report.outcome.as_str(),
            report.committed.len(),
            total
        ));
        self.observer.session_ended(&report);

        report
    }

    async fn run_job(
        &mut self,
        job: &RenderJob,
        index: usize,
        total: usize,
        started: Instant,
    ) -> JobEnd {
        let sink = EncodeSink {
            output_path: job.output_path.clone(),
            profile: Arc::clone(&self.profile),
            encoding: self.config.encoding.clone(),
            video_bitrate: self.config.video_bitrate.clone(),
        };

        let source = match self.backend.open_source(&job.media.path, &self.profile).await {
            Ok(source) => source,
            Err(e) => return JobEnd::Failed(e.to_string()),
        };

        let timeline = match Timeline::single_clip(&self.profile, &source) {
            Ok(timeline) => timeline,
            Err(e) => return JobEnd::Failed(e.to_string()),
        };

        let handle = match self.backend.start_encode(&timeline, &sink).await {
            Ok(handle) => handle,
            Err(e) => return JobEnd::Failed(e.to_string()),
        };

        let exit = self.poll(handle.as_ref(), job, index, total, started).await;

        let end = match exit {
            PollExit::Aborted => JobEnd::Aborted,
            PollExit::Drained => match handle.failure() {
                Some(cause) => JobEnd::Failed(cause),
                None => match self.catalog.attach_proxy(&job.media.id, &job.output_path) {
                    Ok(()) => JobEnd::Committed,
                    Err(e) => JobEnd::Failed(e.to_string()),
                },
            },
        };

        handle.stop().await;
        end
    }

    /// Poll the encode until it stops moving or an abort is requested.
    async fn poll(
        &mut self,
        handle: &dyn EncodeHandle,
        job: &RenderJob,
        index: usize,
        total: usize,
        started: Instant,
    ) -> PollExit {
        let mut fraction = 0.0_f64;

        loop {
            if self.abort_requested() {
                return PollExit::Aborted;
            }

            fraction = fraction.max(handle.progress_fraction().clamp(0.0, 1.0));
            self.notify(fraction, job.label(), index, total, started);

            if handle.speed() == 0.0 {
                return PollExit::Drained;
            }

            if self.sleep_or_abort().await {
                return PollExit::Aborted;
            }
        }
    }

    /// Sleep one poll interval. Returns true if an abort arrived meanwhile.
    async fn sleep_or_abort(&mut self) -> bool {
        let interval = self.config.poll_interval;

        if self.detached {
            tokio::time::sleep(interval).await;
            return false;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => false,
            changed = self.abort.changed() => match changed {
                Ok(()) => *self.abort.borrow(),
                Err(_) => {
                    debug!("Session handle dropped, continuing detached");
                    self.detached = true;
                    false
                }
            },
        }
    }

    fn abort_requested(&self) -> bool {
        *self.abort.borrow()
    }

    fn notify(&self, fraction: f64, label: &str, index: usize, total: usize, started: Instant) {
        self.observer.update(&ProgressUpdate {
            fraction,
            label: label.to_string(),
            current_index: index,
            total,
            elapsed: started.elapsed(),
        });
    }
}
