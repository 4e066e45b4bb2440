//! FFmpeg CLI rendering backend.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use vproxy_models::ProxyProfile;

use crate::backend::{EncodeHandle, EncodeSink, RenderBackend};
use crate::command::{check_ffmpeg, FfmpegCommand};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_video;
use crate::progress::{is_progress_line, parse_progress_line, FfmpegProgress};
use crate::timeline::{SourceClip, Timeline};

/// Number of non-progress stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// Rendering backend running the system `ffmpeg` binary.
#[derive(Debug, Clone, Default)]
pub struct FfmpegBackend;

impl FfmpegBackend {
    pub fn new() -> Self {
        Self
    }

    /// Build the FFmpeg command rendering a single-clip timeline into `sink`.
    pub fn build_command(timeline: &Timeline, sink: &EncodeSink) -> MediaResult<FfmpegCommand> {
        let clip = timeline.sole_clip().ok_or_else(|| {
            MediaError::invalid_timeline("FFmpeg backend renders single-clip timelines only")
        })?;

        let fps = timeline.fps();
        if fps <= 0.0 {
            return Err(MediaError::invalid_timeline("timeline frame rate must be positive"));
        }

        let profile = &sink.profile;
        let mut filter = String::new();
        if profile.progressive {
            filter.push_str("yadif=deint=interlaced,");
        }
        filter.push_str(&format!(
            "scale={}:{},setsar={}/{}",
            profile.width,
            profile.height,
            profile.sample_aspect_num.max(1),
            profile.sample_aspect_den.max(1)
        ));

        let cmd = FfmpegCommand::new(&clip.source, &sink.output_path)
            .seek(clip.in_frame as f64 / fps)
            .duration(clip.length_frames() as f64 / fps)
            .video_filter(filter)
            .frame_rate(timeline.frame_rate_num, timeline.frame_rate_den)
            .output_args(sink.encoding.to_ffmpeg_args(&sink.video_bitrate))
            .output_args(["-movflags", "+faststart"]);

        Ok(cmd)
    }
}

#[async_trait]
impl RenderBackend for FfmpegBackend {
    async fn open_source(&self, path: &Path, profile: &ProxyProfile) -> MediaResult<SourceClip> {
        let info = probe_video(path).await?;
        let length_frames = info.length_frames(profile.fps());

        debug!(
            "Opened source {} ({} frames at {:.3} fps)",
            path.display(),
            length_frames,
            profile.fps()
        );

        Ok(SourceClip {
            path: path.to_path_buf(),
            length_frames,
        })
    }

    async fn start_encode(
        &self,
        timeline: &Timeline,
        sink: &EncodeSink,
    ) -> MediaResult<Box<dyn EncodeHandle>> {
        check_ffmpeg()?;

        let cmd = Self::build_command(timeline, sink)?;
        if let Some(parent) = sink.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;

        let total_ms = (timeline.duration_secs() * 1000.0) as i64;
        let (state_tx, state_rx) = watch::channel(EncodeState::running());
        let (stop_tx, stop_rx) = watch::channel(false);

        tokio::spawn(drive_encode(child, stderr, total_ms, state_tx, stop_rx));

        info!("Started proxy encode -> {}", sink.output_path.display());

        Ok(Box::new(FfmpegEncodeHandle {
            state: state_rx,
            stop: stop_tx,
        }))
    }
}

/// Shared state of one FFmpeg encode.
#[derive(Debug, Clone, PartialEq)]
struct EncodeState {
    fraction: f64,
    running: bool,
    failure: Option<String>,
}

impl EncodeState {
    fn running() -> Self {
        Self {
            fraction: 0.0,
            running: true,
            failure: None,
        }
    }
}

/// Handle to an FFmpeg process started by [`FfmpegBackend`].
pub struct FfmpegEncodeHandle {
    state: watch::Receiver<EncodeState>,
    stop: watch::Sender<bool>,
}

#[async_trait]
impl EncodeHandle for FfmpegEncodeHandle {
    fn progress_fraction(&self) -> f64 {
        self.state.borrow().fraction
    }

    fn speed(&self) -> f64 {
        if self.state.borrow().running {
            1.0
        } else {
            0.0
        }
    }

    fn failure(&self) -> Option<String> {
        self.state.borrow().failure.clone()
    }

    async fn stop(&self) {
        // Fails only when the driver already exited
        let _ = self.stop.send(true);
        let mut state = self.state.clone();
        let _ = state.wait_for(|s| !s.running).await;
    }
}

/// Read progress from FFmpeg until it exits or a stop is requested.
async fn drive_encode(
    mut child: Child,
    stderr: ChildStderr,
    total_ms: i64,
    state: watch::Sender<EncodeState>,
    mut stop: watch::Receiver<bool>,
) {
    let mut lines = BufReader::new(stderr).lines();
    let mut progress = FfmpegProgress::default();
    let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

    loop {
        tokio::select! {
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    kill(&mut child, &state).await;
                    return;
                }
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(snapshot) = parse_progress_line(&line, &mut progress) {
                        let fraction = snapshot.fraction(total_ms);
                        state.send_modify(|s| s.fraction = s.fraction.max(fraction));
                    } else if !is_progress_line(&line) {
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(line);
                    }
                }
                Ok(None) | Err(_) => break,
            }
        }
    }

    // stderr closed; the process is exiting
    let stopped = async { stop.wait_for(|stop| *stop).await.is_ok() };
    let status = tokio::select! {
        status = child.wait() => status,
        true = stopped => {
            kill(&mut child, &state).await;
            return;
        }
    };

    match status {
        Ok(status) if status.success() => {
            state.send_modify(|s| {
                s.fraction = 1.0;
                s.running = false;
            });
        }
        Ok(status) => {
            let stderr = tail.into_iter().collect::<Vec<_>>().join("\n");
            let err = MediaError::ffmpeg_failed(
                format!("FFmpeg exited with {}", status),
                Some(stderr.clone()),
                status.code(),
            );
            warn!("{}: {}", err, stderr);
            state.send_modify(|s| {
                s.running = false;
                s.failure = Some(format!("{}: {}", err, stderr.trim()));
            });
        }
        Err(e) => {
            warn!("Failed to wait for FFmpeg: {}", e);
            state.send_modify(|s| {
                s.running = false;
                s.failure = Some(e.to_string());
            });
        }
    }
}

async fn kill(child: &mut Child, state: &watch::Sender<EncodeState>) {
    info!("FFmpeg encode stopped, killing process");
    if let Err(e) = child.kill().await {
        debug!("FFmpeg kill failed (already exited?): {}", e);
    }
    state.send_modify(|s| {
        s.running = false;
    });
}
