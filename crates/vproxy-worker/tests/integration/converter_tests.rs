//! Proxy mode conversion tests.

use std::sync::Arc;
use std::time::Duration;

use vproxy_models::{Project, ProjectProxyMode, VideoProfile};
use vproxy_worker::{
    Autosave, AutosaveControl, ConversionOutcome, JsonProjectStore, LiveProject,
    ProxyModeConverter, WorkDir,
};

use super::support::media_file;

fn project(dir: &std::path::Path) -> Project {
    let mut project = Project::new("edit", VideoProfile::new(1920, 1080, 25, 1));
    project.add_media(media_file(dir, "a.mov"));
    project.add_media(media_file(dir, "b.mov"));
    project
}

#[tokio::test]
async fn test_readers_see_old_or_new_project_only() {
    let dir = tempfile::tempdir().unwrap();
    let live = LiveProject::new(project(dir.path()));
    let store = Arc::new(JsonProjectStore::new());
    let autosave = Arc::new(Autosave::start(
        live.clone(),
        store.clone(),
        dir.path().join("autosave.json"),
        Duration::from_secs(3600),
    ));
    let converter = ProxyModeConverter::new(
        live.clone(),
        store,
        autosave.clone(),
        WorkDir::new(dir.path().join("work")),
    );

    let original = live.current();
    let mut rx = live.subscribe();

    let handle = converter.start().unwrap();

    // Nothing has yielded yet, so the reload has not run
    assert_eq!(live.proxy_mode(), ProjectProxyMode::ConvertingToProxy);
    assert_eq!(live.current().media, original.media);
    assert!(dir.path().join("work/proxy_conv.json").exists());

    // A concurrent reader only ever sees complete projects
    let reader_live = live.clone();
    let reader = tokio::spawn(async move {
        let mut modes = Vec::new();
        loop {
            let project = reader_live.current();
            assert_eq!(project.media.len(), 2);
            modes.push(project.proxy_mode());
            if project.proxy_mode() != ProjectProxyMode::ConvertingToProxy {
                return modes;
            }
            tokio::task::yield_now().await;
        }
    });

    let outcome = handle.wait().await.unwrap();
    assert_eq!(outcome, ConversionOutcome::Converted);

    let modes = reader.await.unwrap();
    assert_eq!(modes.last(), Some(&ProjectProxyMode::UseProxy));

    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().proxy_mode(), ProjectProxyMode::UseProxy);

    let swapped = live.current();
    assert!(!Arc::ptr_eq(&original, &swapped));
    assert_eq!(swapped.proxy_mode(), ProjectProxyMode::UseProxy);
    assert_eq!(swapped.media, original.media);
    assert!(!autosave.is_paused());
    assert!(!dir.path().join("work/proxy_conv.json").exists());
}

#[tokio::test]
async fn test_conversion_can_run_again_after_revert() {
    let dir = tempfile::tempdir().unwrap();
    let live = LiveProject::new(project(dir.path()));
    let store = Arc::new(JsonProjectStore::new());
    let autosave = Arc::new(Autosave::start(
        live.clone(),
        store.clone(),
        dir.path().join("autosave.json"),
        Duration::from_secs(3600),
    ));
    let converter = ProxyModeConverter::new(
        live.clone(),
        store,
        autosave,
        WorkDir::new(dir.path().join("work")),
    );

    std::fs::remove_file(dir.path().join("b.mov")).unwrap();
    let outcome = converter.start().unwrap().wait().await.unwrap();
    assert!(matches!(outcome, ConversionOutcome::Reverted { .. }));
    assert_eq!(live.proxy_mode(), ProjectProxyMode::UseOriginal);

    std::fs::write(dir.path().join("b.mov"), b"media").unwrap();
    let outcome = converter.start().unwrap().wait().await.unwrap();
    assert_eq!(outcome, ConversionOutcome::Converted);
    assert_eq!(live.proxy_mode(), ProjectProxyMode::UseProxy);
}
