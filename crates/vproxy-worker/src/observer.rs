//! Progress observers for render sessions.
//!
//! The runner pushes updates from its polling loop; observers must return
//! quickly. A slow observer delays progress reporting but never the encode.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::runner::SessionReport;

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Completed fraction of the current item, `[0, 1]`
    pub fraction: f64,
    /// Name of the current item
    pub label: String,
    /// 1-based index of the current item
    pub current_index: usize,
    /// Number of items in the session
    pub total: usize,
    /// Wall-clock time since the session started
    pub elapsed: Duration,
}

impl ProgressUpdate {
    /// e.g. "42 %"
    pub fn percent_label(&self) -> String {
        format!("{} %", (self.fraction.clamp(0.0, 1.0) * 100.0) as u32)
    }

    /// e.g. "2/3"
    pub fn items_label(&self) -> String {
        format!("{}/{}", self.current_index, self.total)
    }

    pub fn elapsed_label(&self) -> String {
        format_elapsed(self.elapsed.as_secs_f64())
    }
}

/// Format seconds as a clock string: `mm:ss`, or `h:mm:ss` past an hour.
pub fn format_elapsed(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Receives session progress.
pub trait ProgressObserver: Send + Sync {
    /// Called from the polling loop for each progress sample.
    fn update(&self, update: &ProgressUpdate);

    /// Called exactly once when the session ends, however it ends.
    fn session_ended(&self, report: &SessionReport);
}

/// Observer that only logs.
#[derive(Debug, Clone, Default)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn update(&self, update: &ProgressUpdate) {
        debug!(
            media = %update.label,
            item = %update.items_label(),
            elapsed = %update.elapsed_label(),
            "Proxy render {}", update.percent_label()
        );
    }

    fn session_ended(&self, report: &SessionReport) {
        info!(
            session_id = %report.session_id,
            outcome = %report.outcome.as_str(),
            committed = report.committed.len(),
            total = report.total,
            "Proxy render session ended"
        );
    }
}

/// Event forwarded by [`ChannelObserver`].
#[derive(Debug, Clone)]
pub enum ObserverEvent {
    Progress(ProgressUpdate),
    SessionEnded(SessionReport),
}

/// Observer forwarding every notification over an unbounded channel, for
/// UIs that render on their own thread.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ObserverEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ObserverEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressObserver for ChannelObserver {
    fn update(&self, update: &ProgressUpdate) {
        // Receiver gone means nobody is displaying progress any more
        let _ = self.tx.send(ObserverEvent::Progress(update.clone()));
    }

    fn session_ended(&self, report: &SessionReport) {
        let _ = self.tx.send(ObserverEvent::SessionEnded(report.clone()));
    }
}
