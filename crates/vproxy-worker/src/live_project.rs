//! The live project slot shared between the UI and background tasks.

use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;

use vproxy_models::{MediaId, Project, ProjectProxyMode};

use crate::error::{ProxyError, ProxyResult};

/// Where committed proxies are recorded.
pub trait MediaCatalog: Send + Sync {
    /// Attach a finished proxy file to a media item.
    fn attach_proxy(&self, id: &MediaId, proxy_path: &Path) -> ProxyResult<()>;
}

/// The editor's current project.
///
/// Readers get whole `Arc<Project>` snapshots. Writers replace or
/// copy-on-write the snapshot under the channel lock, so a reader sees either
/// the previous instance or the next one, never a partial write.
#[derive(Debug, Clone)]
pub struct LiveProject {
    tx: Arc<watch::Sender<Arc<Project>>>,
}

impl LiveProject {
    pub fn new(project: Project) -> Self {
        let (tx, _) = watch::channel(Arc::new(project));
        Self { tx: Arc::new(tx) }
    }

    /// Snapshot of the current project.
    pub fn current(&self) -> Arc<Project> {
        self.tx.borrow().clone()
    }

    pub fn proxy_mode(&self) -> ProjectProxyMode {
        self.tx.borrow().proxy_mode()
    }

    /// Set the mode only if it currently equals `expected`. Returns the mode
    /// found.
    pub fn compare_and_set_mode(
        &self,
        expected: ProjectProxyMode,
        mode: ProjectProxyMode,
    ) -> ProjectProxyMode {
        let mut found = expected;
        self.tx.send_if_modified(|project| {
            found = project.proxy_mode();
            if found != expected {
                return false;
            }
            Arc::make_mut(project).set_proxy_mode(mode);
            true
        });
        found
    }

    /// Replace the current project with a reloaded copy of it, returning the
    /// previous instance.
    ///
    /// Proxies committed to the outgoing project after the copy was taken are
    /// carried over, under the same lock as the replacement.
    pub fn swap_keeping_proxies(&self, project: Project) -> Arc<Project> {
        let mut incoming = Arc::new(project);
        self.tx.send_modify(|current| {
            Arc::make_mut(&mut incoming).carry_proxies_from(current);
            std::mem::swap(current, &mut incoming);
        });
        incoming
    }

    /// Receiver notified after every change to the live project.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Project>> {
        self.tx.subscribe()
    }
}

impl MediaCatalog for LiveProject {
    fn attach_proxy(&self, id: &MediaId, proxy_path: &Path) -> ProxyResult<()> {
        let attached = self.tx.send_if_modified(|project| {
            if project.media_item(id).is_none() {
                return false;
            }
            if let Some(item) = Arc::make_mut(project).media_item_mut(id) {
                item.attach_proxy(proxy_path);
            }
            true
        });

        if attached {
            Ok(())
        } else {
            Err(ProxyError::MediaNotFound(id.clone()))
        }
    }
}
