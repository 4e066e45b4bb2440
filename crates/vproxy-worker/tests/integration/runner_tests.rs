//! Render job runner tests.

use std::sync::Arc;
use std::time::Duration;

use vproxy_models::{Project, ProxyProfile, VideoProfile};
use vproxy_worker::{
    select_jobs, ChannelObserver, LiveProject, ObserverEvent, RenderJobRunner, RunnerConfig,
    SessionOutcome,
};

use super::support::{drain, media_file, BackendEvent, FakeBackend, POLL};

struct Fixture {
    _dir: tempfile::TempDir,
    live: LiveProject,
    jobs: Vec<vproxy_models::RenderJob>,
    profile: Arc<ProxyProfile>,
}

fn fixture(names: &[&str]) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let proxies = dir.path().join("proxies");
    std::fs::create_dir_all(&proxies).unwrap();

    let mut project = Project::new("p", VideoProfile::new(1920, 1088, 25, 1));
    for name in names {
        project.add_media(media_file(dir.path(), name));
    }

    let jobs = select_jobs(project.media.iter(), &proxies);
    let profile = Arc::new(ProxyProfile::derive(&project.profile));

    Fixture {
        _dir: dir,
        live: LiveProject::new(project),
        jobs,
        profile,
    }
}

fn runner(backend: Arc<FakeBackend>) -> RenderJobRunner {
    RenderJobRunner::new(
        backend,
        RunnerConfig {
            poll_interval: POLL,
            ..RunnerConfig::default()
        },
    )
}

#[tokio::test]
async fn test_session_commits_every_job_in_order() {
    let fx = fixture(&["a.mov", "b.mov", "c.mov"]);
    let backend = Arc::new(FakeBackend::new(Duration::from_millis(20)));
    let (observer, mut rx) = ChannelObserver::new();

    let handle = runner(backend.clone()).start(
        fx.profile.clone(),
        fx.jobs.clone(),
        Arc::new(fx.live.clone()),
        Arc::new(observer),
    );
    let report = handle.wait().await.unwrap();

    assert_eq!(report.outcome, SessionOutcome::Finished);
    assert_eq!(report.total, 3);
    let expected: Vec<_> = fx.jobs.iter().map(|j| j.media.id.clone()).collect();
    assert_eq!(report.committed, expected);

    let project = fx.live.current();
    for job in &fx.jobs {
        let item = project.media_item(&job.media.id).unwrap();
        assert!(item.has_proxy);
        assert_eq!(item.proxy_path.as_deref(), Some(job.output_path.as_path()));
    }

    let started: Vec<_> = backend
        .events()
        .into_iter()
        .filter(|e| matches!(e, BackendEvent::Started(_)))
        .collect();
    assert_eq!(
        started,
        vec![
            BackendEvent::Started("a.mov".to_string()),
            BackendEvent::Started("b.mov".to_string()),
            BackendEvent::Started("c.mov".to_string()),
        ]
    );

    let observed = drain(&mut rx);
    assert_eq!(observed.reports.len(), 1);
}

#[tokio::test]
async fn test_progress_of_next_job_follows_completion_of_previous() {
    let fx = fixture(&["a.mov", "b.mov", "c.mov"]);
    let backend = Arc::new(FakeBackend::new(Duration::from_millis(20)));
    let (observer, mut rx) = ChannelObserver::new();

    runner(backend)
        .start(
            fx.profile.clone(),
            fx.jobs.clone(),
            Arc::new(fx.live.clone()),
            Arc::new(observer),
        )
        .wait()
        .await
        .unwrap();

    let updates = drain(&mut rx).updates;
    let labels = ["a.mov", "b.mov", "c.mov"];

    for (i, label) in labels.iter().enumerate().skip(1) {
        let first = updates.iter().position(|u| u.label == *label).unwrap();
        let previous = &updates[first - 1];
        assert_eq!(previous.label, labels[i - 1]);
        assert_eq!(previous.fraction, 1.0);
        assert!(updates[..first].iter().all(|u| u.label != *label));
    }

    for (i, label) in labels.iter().enumerate() {
        let mine: Vec<_> = updates.iter().filter(|u| u.label == *label).collect();
        assert!(mine.iter().all(|u| u.current_index == i + 1 && u.total == 3));
        assert!(mine.windows(2).all(|w| w[0].fraction <= w[1].fraction));
    }

    let last = updates.last().unwrap();
    assert_eq!((last.label.as_str(), last.fraction), ("c.mov", 1.0));
    assert_eq!(last.items_label(), "3/3");
}

#[tokio::test]
async fn test_abort_during_second_job() {
    let fx = fixture(&["a.mov", "b.mov", "c.mov"]);
    let backend = Arc::new(
        FakeBackend::new(Duration::from_millis(20))
            .with_encode_time("b.mov", Duration::from_secs(30)),
    );
    let (observer, mut rx) = ChannelObserver::new();

    let handle = runner(backend.clone()).start(
        fx.profile.clone(),
        fx.jobs.clone(),
        Arc::new(fx.live.clone()),
        Arc::new(observer),
    );

    // The reset update primes b; the next one comes from b's polling loop
    let mut seen_b = 0;
    while seen_b < 2 {
        match rx.recv().await {
            Some(ObserverEvent::Progress(u)) if u.label == "b.mov" => seen_b += 1,
            Some(_) => {}
            None => panic!("observer closed before b started"),
        }
    }

    handle.abort();
    let report = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("session did not stop")
        .unwrap();

    assert_eq!(report.outcome, SessionOutcome::Stopped);
    assert_eq!(report.committed, vec![fx.jobs[0].media.id.clone()]);

    let project = fx.live.current();
    assert!(project.media_item(&fx.jobs[0].media.id).unwrap().has_proxy);
    assert!(!project.media_item(&fx.jobs[1].media.id).unwrap().has_proxy);
    assert!(!project.media_item(&fx.jobs[2].media.id).unwrap().has_proxy);

    assert_eq!(backend.count(&BackendEvent::Stopped("b.mov".to_string())), 1);
    assert_eq!(backend.count(&BackendEvent::Opened("c.mov".to_string())), 0);

    let observed = drain(&mut rx);
    assert_eq!(observed.reports.len(), 1);
    assert_eq!(observed.reports[0].outcome, SessionOutcome::Stopped);
}

#[tokio::test]
async fn test_failed_encode_ends_session() {
    let fx = fixture(&["a.mov", "b.mov", "c.mov"]);
    let backend = Arc::new(
        FakeBackend::new(Duration::from_millis(15)).with_failure("b.mov", "encoder exploded"),
    );
    let (observer, mut rx) = ChannelObserver::new();

    let report = runner(backend.clone())
        .start(
            fx.profile.clone(),
            fx.jobs.clone(),
            Arc::new(fx.live.clone()),
            Arc::new(observer),
        )
        .wait()
        .await
        .unwrap();

    match &report.outcome {
        SessionOutcome::Failed { label, cause } => {
            assert_eq!(label, "b.mov");
            assert!(cause.contains("encoder exploded"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(report.committed.len(), 1);
    assert!(!fx.live.current().media_item(&fx.jobs[1].media.id).unwrap().has_proxy);
    assert_eq!(backend.count(&BackendEvent::Stopped("b.mov".to_string())), 1);
    assert_eq!(backend.count(&BackendEvent::Started("c.mov".to_string())), 0);
    assert_eq!(drain(&mut rx).reports.len(), 1);
}

#[tokio::test]
async fn test_unopenable_source_fails_with_cause() {
    let fx = fixture(&["a.mov", "b.mov"]);
    let backend = Arc::new(FakeBackend::new(Duration::from_millis(10)).with_unopenable("a.mov"));
    let (observer, mut rx) = ChannelObserver::new();

    let report = runner(backend.clone())
        .start(
            fx.profile.clone(),
            fx.jobs.clone(),
            Arc::new(fx.live.clone()),
            Arc::new(observer),
        )
        .wait()
        .await
        .unwrap();

    match &report.outcome {
        SessionOutcome::Failed { label, cause } => {
            assert_eq!(label, "a.mov");
            assert!(cause.contains("a.mov"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(report.committed.is_empty());
    assert_eq!(backend.count(&BackendEvent::Opened("b.mov".to_string())), 0);
    assert_eq!(drain(&mut rx).reports.len(), 1);
}

#[tokio::test]
async fn test_empty_session_ends_immediately() {
    let fx = fixture(&[]);
    let backend = Arc::new(FakeBackend::new(Duration::from_millis(10)));
    let (observer, mut rx) = ChannelObserver::new();

    let report = runner(backend.clone())
        .start(
            fx.profile.clone(),
            Vec::new(),
            Arc::new(fx.live.clone()),
            Arc::new(observer),
        )
        .wait()
        .await
        .unwrap();

    assert_eq!(report.outcome, SessionOutcome::Finished);
    assert_eq!(report.total, 0);
    assert!(backend.events().is_empty());

    let observed = drain(&mut rx);
    assert!(observed.updates.is_empty());
    assert_eq!(observed.reports.len(), 1);
}
