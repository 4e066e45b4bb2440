//! Structured logging utilities.
//!
//! Provides tracing setup for hosts embedding the subsystem and consistent,
//! structured logging for render sessions and conversions.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a global tracing subscriber.
///
/// Colored output by default, JSON when `LOG_FORMAT=json`. Filtering follows
/// `RUST_LOG`, with `vproxy=info` added. Returns false when a subscriber was
/// already installed.
pub fn init_tracing() -> bool {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = "vproxy=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    let result = if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .try_init()
    };

    result.is_ok()
}

/// Logger for one background activity (render session or conversion).
#[derive(Debug, Clone)]
pub struct SessionLogger {
    session_id: String,
    operation: String,
}

impl SessionLogger {
    /// * `session_id` - identifier of the session or conversion
    /// * `operation` - e.g. "proxy_render", "proxy_conversion"
    pub fn new(session_id: &str, operation: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session started: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session ended: {}", message
        );
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span to instrument the session's background task with.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "session",
            session_id = %self.session_id,
            operation = %self.operation
        )
    }
}
