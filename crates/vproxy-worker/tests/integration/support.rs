//! Test doubles shared by the integration tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;

use vproxy_media::{
    EncodeHandle, EncodeSink, MediaError, MediaResult, RenderBackend, SourceClip, Timeline,
};
use vproxy_models::{MediaItem, ProxyProfile};
use vproxy_worker::{ObserverEvent, ProgressUpdate, SessionReport};

/// Poll interval used by every test session.
pub const POLL: Duration = Duration::from_millis(5);

/// What the fake backend was asked to do, by source file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    Opened(String),
    Started(String),
    Stopped(String),
}

/// Backend whose encodes finish after a fixed wall-clock time.
pub struct FakeBackend {
    encode_time: Duration,
    encode_times: HashMap<String, Duration>,
    failures: HashMap<String, String>,
    unopenable: Vec<String>,
    events: Arc<Mutex<Vec<BackendEvent>>>,
}

impl FakeBackend {
    pub fn new(encode_time: Duration) -> Self {
        Self {
            encode_time,
            encode_times: HashMap::new(),
            failures: HashMap::new(),
            unopenable: Vec::new(),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Encodes of `name` take `time` instead of the default.
    pub fn with_encode_time(mut self, name: &str, time: Duration) -> Self {
        self.encode_times.insert(name.to_string(), time);
        self
    }

    /// Encodes of `name` run to the end and then report `message`.
    pub fn with_failure(mut self, name: &str, message: &str) -> Self {
        self.failures.insert(name.to_string(), message.to_string());
        self
    }

    /// Opening `name` fails.
    pub fn with_unopenable(mut self, name: &str) -> Self {
        self.unopenable.push(name.to_string());
        self
    }

    pub fn events(&self) -> Vec<BackendEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &BackendEvent) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    fn record(&self, event: BackendEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[async_trait]
impl RenderBackend for FakeBackend {
    async fn open_source(&self, path: &Path, _profile: &ProxyProfile) -> MediaResult<SourceClip> {
        let name = file_name(path);
        self.record(BackendEvent::Opened(name.clone()));

        if self.unopenable.contains(&name) {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }

        Ok(SourceClip {
            path: path.to_path_buf(),
            length_frames: 250,
        })
    }

    async fn start_encode(
        &self,
        timeline: &Timeline,
        sink: &EncodeSink,
    ) -> MediaResult<Box<dyn EncodeHandle>> {
        let clip = timeline
            .sole_clip()
            .ok_or_else(|| MediaError::invalid_timeline("expected one clip"))?;
        let name = file_name(&clip.source);
        self.record(BackendEvent::Started(name.clone()));

        std::fs::write(&sink.output_path, b"proxy")?;

        Ok(Box::new(FakeEncode {
            duration: self
                .encode_times
                .get(&name)
                .copied()
                .unwrap_or(self.encode_time),
            failure: self.failures.get(&name).cloned(),
            started: Instant::now(),
            stopped: AtomicBool::new(false),
            events: Arc::clone(&self.events),
            name,
        }))
    }
}

struct FakeEncode {
    name: String,
    duration: Duration,
    failure: Option<String>,
    started: Instant,
    stopped: AtomicBool,
    events: Arc<Mutex<Vec<BackendEvent>>>,
}

impl FakeEncode {
    fn done(&self) -> bool {
        self.started.elapsed() >= self.duration
    }
}

#[async_trait]
impl EncodeHandle for FakeEncode {
    fn progress_fraction(&self) -> f64 {
        (self.started.elapsed().as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    fn speed(&self) -> f64 {
        if self.stopped.load(Ordering::SeqCst) || self.done() {
            0.0
        } else {
            1.0
        }
    }

    fn failure(&self) -> Option<String> {
        if self.done() {
            self.failure.clone()
        } else {
            None
        }
    }

    async fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.events
                .lock()
                .unwrap()
                .push(BackendEvent::Stopped(self.name.clone()));
        }
    }
}

/// Create a media file on disk and its catalog item.
pub fn media_file(dir: &Path, name: &str) -> MediaItem {
    let path: PathBuf = dir.join(name);
    std::fs::write(&path, b"media").unwrap();
    MediaItem::new(path)
}

/// Everything an observer received, split by kind.
#[derive(Debug, Default)]
pub struct Observed {
    pub updates: Vec<ProgressUpdate>,
    pub reports: Vec<SessionReport>,
}

/// Drain a channel observer's events. Call after the session has ended.
pub fn drain(rx: &mut UnboundedReceiver<ObserverEvent>) -> Observed {
    let mut observed = Observed::default();
    while let Ok(event) = rx.try_recv() {
        match event {
            ObserverEvent::Progress(update) => observed.updates.push(update),
            ObserverEvent::SessionEnded(report) => observed.reports.push(report),
        }
    }
    observed
}
