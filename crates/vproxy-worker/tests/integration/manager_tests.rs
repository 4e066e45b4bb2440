//! Proxy manager tests.

use std::sync::Arc;
use std::time::Duration;

use vproxy_models::{Project, ProjectProxyMode, VideoProfile};
use vproxy_worker::{
    ChannelObserver, ConversionOutcome, JsonProjectStore, LiveProject, ProxyConfig, ProxyError,
    ProxyManager, SessionOutcome,
};

use super::support::{drain, media_file, BackendEvent, FakeBackend, POLL};

struct NoAutosave;

impl vproxy_worker::AutosaveControl for NoAutosave {
    fn pause(&self) {}
    fn resume(&self) {}
    fn is_paused(&self) -> bool {
        false
    }
}

fn manager(
    config: ProxyConfig,
    backend: Arc<FakeBackend>,
    project: Project,
) -> ProxyManager {
    ProxyManager::new(
        config,
        backend,
        LiveProject::new(project),
        Arc::new(JsonProjectStore::new()),
        Arc::new(NoAutosave),
    )
}

fn config(root: &std::path::Path) -> ProxyConfig {
    ProxyConfig::default()
        .with_render_folder(root.join("renders"))
        .with_work_dir(root.join("work"))
        .with_poll_interval(POLL)
}

#[tokio::test]
async fn test_three_selected_one_with_proxy_queues_two() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let proxies = dir.path().join("renders/proxies");
    std::fs::create_dir_all(&proxies).unwrap();

    let mut project = Project::new("p", VideoProfile::new(1920, 1088, 25, 1));
    let a = project.add_media(media_file(dir.path(), "a.mov"));
    let mut b_item = media_file(dir.path(), "b.mov");
    let b_proxy = b_item.proxy_output_path(&proxies);
    std::fs::write(&b_proxy, b"existing").unwrap();
    b_item.attach_proxy(&b_proxy);
    let b = project.add_media(b_item);
    let c = project.add_media(media_file(dir.path(), "c.mov"));

    let backend = Arc::new(FakeBackend::new(Duration::from_millis(15)));
    let manager = manager(config, backend.clone(), project);
    let selected = vec![a.clone(), b, c.clone()];

    let (observer, mut rx) = ChannelObserver::new();
    let report = manager
        .create_proxy_files(&selected, Arc::new(observer))
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(report.outcome, SessionOutcome::Finished);
    assert_eq!(report.total, 2);
    assert_eq!(report.committed, vec![a, c]);
    assert_eq!(backend.count(&BackendEvent::Opened("b.mov".to_string())), 0);

    let observed = drain(&mut rx);
    assert_eq!(observed.reports.len(), 1);
    assert_eq!(observed.updates.last().unwrap().items_label(), "2/2");

    let status = manager.proxy_status();
    assert_eq!((status.proxy_files, status.video_files), (3, 3));
    assert_eq!(status.to_string(), "There are 3 proxy file(s) for 3 video file(s)");

    // Profile file is gone once the session has ended
    assert!(!dir.path().join("work/proxy_profile").exists());

    // Nothing is left to render on a second run
    let (observer, _rx) = ChannelObserver::new();
    let report = manager
        .create_proxy_files(&selected, Arc::new(observer))
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(report.total, 0);
    assert_eq!(backend.count(&BackendEvent::Started("a.mov".to_string())), 1);
}

#[tokio::test]
async fn test_requires_render_folder() {
    let dir = tempfile::tempdir().unwrap();
    let mut project = Project::new("p", VideoProfile::new(1280, 720, 25, 1));
    let a = project.add_media(media_file(dir.path(), "a.mov"));

    let config = ProxyConfig::default().with_work_dir(dir.path().join("work"));
    let manager = manager(
        config,
        Arc::new(FakeBackend::new(Duration::from_millis(10))),
        project,
    );

    let (observer, _rx) = ChannelObserver::new();
    assert!(matches!(
        manager.create_proxy_files(&[a], Arc::new(observer)),
        Err(ProxyError::RenderFolderMissing)
    ));
}

#[tokio::test]
async fn test_unknown_selection_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let project = Project::new("p", VideoProfile::new(1280, 720, 25, 1));
    let manager = manager(
        config(dir.path()),
        Arc::new(FakeBackend::new(Duration::from_millis(10))),
        project,
    );

    let (observer, _rx) = ChannelObserver::new();
    let missing = vproxy_models::MediaId::from("missing");
    assert!(matches!(
        manager.create_proxy_files(&[missing], Arc::new(observer)),
        Err(ProxyError::MediaNotFound(_))
    ));
}

#[tokio::test]
async fn test_create_then_convert() {
    let dir = tempfile::tempdir().unwrap();
    let mut project = Project::new("p", VideoProfile::new(1920, 1080, 25, 1));
    let a = project.add_media(media_file(dir.path(), "a.mov"));

    let manager = manager(
        config(dir.path()),
        Arc::new(FakeBackend::new(Duration::from_millis(10))),
        project,
    );

    let (observer, _rx) = ChannelObserver::new();
    manager
        .create_proxy_files(&[a.clone()], Arc::new(observer))
        .unwrap()
        .wait()
        .await
        .unwrap();

    let outcome = manager.convert_to_proxy().unwrap().wait().await.unwrap();
    assert_eq!(outcome, ConversionOutcome::Converted);

    let project = manager.live_project().current();
    assert_eq!(project.proxy_mode(), ProjectProxyMode::UseProxy);
    assert!(project.media_item(&a).unwrap().has_valid_proxy());

    // Converting twice is rejected
    assert!(matches!(
        manager.convert_to_proxy(),
        Err(ProxyError::InvalidModeTransition(ProjectProxyMode::UseProxy))
    ));
}
