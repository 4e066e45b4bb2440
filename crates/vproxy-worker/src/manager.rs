//! Entry points for proxy creation and proxy mode conversion.

use std::sync::Arc;
use tracing::info;

use vproxy_media::RenderBackend;
use vproxy_models::{MediaId, ProxyProfile, ProxyStatus};

use crate::autosave::AutosaveControl;
use crate::config::ProxyConfig;
use crate::converter::{ConversionHandle, ProxyModeConverter};
use crate::error::{ProxyError, ProxyResult};
use crate::live_project::{LiveProject, MediaCatalog};
use crate::observer::ProgressObserver;
use crate::persistence::ProjectStore;
use crate::queue::select_jobs;
use crate::runner::{RenderJobRunner, RenderSessionHandle, RunnerConfig};
use crate::workdir::WorkDir;

/// Proxy operations over the live project.
pub struct ProxyManager {
    config: ProxyConfig,
    live: LiveProject,
    work_dir: WorkDir,
    runner: RenderJobRunner,
    converter: ProxyModeConverter,
}

impl ProxyManager {
    pub fn new(
        config: ProxyConfig,
        backend: Arc<dyn RenderBackend>,
        live: LiveProject,
        store: Arc<dyn ProjectStore>,
        autosave: Arc<dyn AutosaveControl>,
    ) -> Self {
        let work_dir = WorkDir::new(&config.work_dir);
        let runner = RenderJobRunner::new(backend, RunnerConfig::from(&config));
        let converter = ProxyModeConverter::new(live.clone(), store, autosave, work_dir.clone())
            .with_track_counts(config.video_tracks, config.audio_tracks);

        Self {
            config,
            live,
            work_dir,
            runner,
            converter,
        }
    }

    pub fn live_project(&self) -> &LiveProject {
        &self.live
    }

    /// Start a render session creating proxies for the selected media.
    ///
    /// Items that already have a proxy on disk are skipped. Must be called
    /// inside a tokio runtime.
    pub fn create_proxy_files(
        &self,
        selected: &[MediaId],
        observer: Arc<dyn ProgressObserver>,
    ) -> ProxyResult<RenderSessionHandle> {
        let proxies_dir = self.config.proxies_dir()?;
        std::fs::create_dir_all(&proxies_dir)?;

        let project = self.live.current();
        let items = selected
            .iter()
            .map(|id| {
                project
                    .media_item(id)
                    .ok_or_else(|| ProxyError::MediaNotFound(id.clone()))
            })
            .collect::<ProxyResult<Vec<_>>>()?;

        let jobs = select_jobs(items, &proxies_dir);
        info!(
            "Creating proxies for {} of {} selected item(s) in {}",
            jobs.len(),
            selected.len(),
            proxies_dir.display()
        );

        let profile_file = self
            .work_dir
            .write_profile(&ProxyProfile::derive(&project.profile))?;
        let profile = Arc::new(profile_file.load()?);

        let catalog: Arc<dyn MediaCatalog> = Arc::new(self.live.clone());
        Ok(self
            .runner
            .start_with_profile_file(profile, jobs, catalog, observer, profile_file))
    }

    /// Switch the project to proxy media.
    pub fn convert_to_proxy(&self) -> ProxyResult<ConversionHandle> {
        self.converter.start()
    }

    pub fn proxy_status(&self) -> ProxyStatus {
        self.live.current().proxy_status()
    }
}
