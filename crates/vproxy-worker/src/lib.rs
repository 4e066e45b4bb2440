//! Proxy media worker.
//!
//! This crate provides:
//! - The render job runner for proxy encode sessions
//! - Progress observers
//! - Project conversion to proxy mode, with persistence and autosave
//! - Configuration, logging and metrics

pub mod autosave;
pub mod config;
pub mod converter;
pub mod error;
pub mod live_project;
pub mod logging;
pub mod manager;
pub mod metrics;
pub mod observer;
pub mod persistence;
pub mod queue;
pub mod runner;
pub mod workdir;

pub use autosave::{Autosave, AutosaveControl};
pub use config::ProxyConfig;
pub use converter::{ConversionHandle, ConversionOutcome, ProxyModeConverter};
pub use error::{ProjectLoadError, ProxyError, ProxyResult};
pub use live_project::{LiveProject, MediaCatalog};
pub use logging::{init_tracing, SessionLogger};
pub use manager::ProxyManager;
pub use observer::{ChannelObserver, ObserverEvent, ProgressObserver, ProgressUpdate, TracingObserver};
pub use persistence::{JsonProjectStore, ProjectStore};
pub use queue::select_jobs;
pub use runner::{RenderJobRunner, RenderSessionHandle, RunnerConfig, SessionOutcome, SessionReport};
pub use workdir::{ProfileFile, WorkDir};
