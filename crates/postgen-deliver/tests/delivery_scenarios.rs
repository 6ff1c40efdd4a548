use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use postgen_core::{ContentHash, FormatId, PostError, PostResult, PostgenConfig, RenderInput, RenderedAsset};
use postgen_deliver::{
    Delay, DeliveryOutcome, DeliveryPipeline, DownloadHandle, DownloadSink, NoShare, Notifier,
    PipelineState, Session, ShareError, ShareFile, ShareRequest, ShareTarget, TokioDelay,
};
use postgen_render::{AssetCache, AssetLoader, Compositor, Typeface};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Share(Vec<String>),
    Materialize(String),
    Trigger(String),
    Release(String),
    Wait(Duration),
    Notify(String),
}

type Log = Arc<Mutex<Vec<Event>>>;

struct ScriptedShare {
    log: Log,
    supported: bool,
    result: Result<(), ShareError>,
}

#[async_trait]
impl ShareTarget for ScriptedShare {
    fn supports_files(&self, _files: &[ShareFile]) -> bool {
        self.supported
    }

    async fn share(&self, request: ShareRequest) -> Result<(), ShareError> {
        let names = request.files.iter().map(|f| f.name.clone()).collect();
        self.log.lock().push(Event::Share(names));
        self.result.clone()
    }
}

#[derive(Clone)]
struct RecordingSink {
    log: Log,
    fail_on: Option<String>,
    triggered_at: Arc<Mutex<Vec<Instant>>>,
}

impl RecordingSink {
    fn new(log: &Log) -> Self {
        Self {
            log: log.clone(),
            fail_on: None,
            triggered_at: Arc::default(),
        }
    }
}

#[async_trait]
impl DownloadSink for RecordingSink {
    async fn materialize(&self, file_name: &str, _bytes: &[u8]) -> PostResult<DownloadHandle> {
        self.log.lock().push(Event::Materialize(file_name.to_string()));
        Ok(DownloadHandle {
            file_name: file_name.to_string(),
            locator: format!("blob:{}", file_name),
        })
    }

    async fn trigger(&self, handle: &DownloadHandle) -> PostResult<()> {
        self.log.lock().push(Event::Trigger(handle.file_name.clone()));
        self.triggered_at.lock().push(Instant::now());
        if self.fail_on.as_deref() == Some(handle.file_name.as_str()) {
            return Err(PostError::delivery("blocked", handle.file_name.clone()));
        }
        Ok(())
    }

    async fn release(&self, handle: DownloadHandle) {
        self.log.lock().push(Event::Release(handle.file_name));
    }
}

struct RecordingDelay(Log);

#[async_trait]
impl Delay for RecordingDelay {
    async fn wait(&self, duration: Duration) {
        self.0.lock().push(Event::Wait(duration));
    }
}

struct RecordingNotifier(Log);

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.0.lock().push(Event::Notify(message.to_string()));
    }
}

fn asset(suffix: &str) -> RenderedAsset {
    RenderedAsset {
        png: vec![0x89, b'P', b'N', b'G'],
        suffix: suffix.to_string(),
        width: 600,
        height: 750,
        hash: ContentHash::from_bytes([0; 32]),
    }
}

fn pipeline(log: &Log, share: ScriptedShare, sink: RecordingSink) -> DeliveryPipeline {
    DeliveryPipeline::new(
        Box::new(share),
        Box::new(sink),
        Box::new(RecordingDelay(log.clone())),
        Box::new(RecordingNotifier(log.clone())),
    )
    .with_interval(Duration::from_millis(800))
}

fn unsupported(log: &Log) -> ScriptedShare {
    ScriptedShare {
        log: log.clone(),
        supported: false,
        result: Ok(()),
    }
}

#[tokio::test]
async fn test_scenario_sequential_download_without_share() {
    let log: Log = Arc::default();
    let sink = RecordingSink::new(&log);
    let pipeline = pipeline(&log, unsupported(&log), sink);

    let assets = [asset("_pag1"), asset("_pag2")];
    let report = pipeline.deliver(&assets, "Big News!").await;

    assert_eq!(report.outcome, DeliveryOutcome::Downloaded { count: 2 });
    assert_eq!(
        report.transitions,
        vec![
            PipelineState::Delivering,
            PipelineState::SequentialDownload,
            PipelineState::Done
        ]
    );
    assert_eq!(report.delivered, vec!["big_news__pag1.png", "big_news__pag2.png"]);
    assert_eq!(
        *log.lock(),
        vec![
            Event::Materialize("big_news__pag1.png".into()),
            Event::Trigger("big_news__pag1.png".into()),
            Event::Release("big_news__pag1.png".into()),
            Event::Wait(Duration::from_millis(800)),
            Event::Materialize("big_news__pag2.png".into()),
            Event::Trigger("big_news__pag2.png".into()),
            Event::Release("big_news__pag2.png".into()),
        ]
    );
}

#[tokio::test]
async fn test_downloads_are_spaced_by_real_delay() {
    let log: Log = Arc::default();
    let sink = RecordingSink::new(&log);
    let pipeline = DeliveryPipeline::new(
        Box::new(NoShare),
        Box::new(sink.clone()),
        Box::new(TokioDelay),
        Box::new(RecordingNotifier(log.clone())),
    )
    .with_interval(Duration::from_millis(60));

    let report = pipeline.deliver(&[asset("_pag1"), asset("_pag2")], "t").await;
    assert!(report.outcome.is_success());

    let times = sink.triggered_at.lock();
    assert_eq!(times.len(), 2);
    assert!(times[1].duration_since(times[0]) >= Duration::from_millis(60));
}

#[tokio::test]
async fn test_scenario_share_cancel_is_done_without_fallback() {
    let log: Log = Arc::default();
    let sink = RecordingSink::new(&log);
    let share = ScriptedShare {
        log: log.clone(),
        supported: true,
        result: Err(ShareError::Cancelled),
    };
    let pipeline = pipeline(&log, share, sink);

    let report = pipeline.deliver(&[asset("_pag1"), asset("_pag2")], "Post").await;

    assert_eq!(report.outcome, DeliveryOutcome::ShareCancelled);
    assert_eq!(report.final_state(), PipelineState::Done);
    assert!(!report.transitions.contains(&PipelineState::SequentialDownload));
    assert_eq!(
        *log.lock(),
        vec![Event::Share(vec!["post_pag1.png".into(), "post_pag2.png".into()])]
    );
}

#[tokio::test]
async fn test_share_success_sends_one_request() {
    let log: Log = Arc::default();
    let sink = RecordingSink::new(&log);
    let share = ScriptedShare {
        log: log.clone(),
        supported: true,
        result: Ok(()),
    };
    let pipeline = pipeline(&log, share, sink);

    let report = pipeline.deliver(&[asset("_simple")], "Hola").await;

    assert_eq!(report.outcome, DeliveryOutcome::Shared);
    assert_eq!(
        report.transitions,
        vec![PipelineState::Delivering, PipelineState::NativeShare, PipelineState::Done]
    );
    assert_eq!(log.lock().len(), 1);
}

#[tokio::test]
async fn test_share_failure_falls_back_silently() {
    let log: Log = Arc::default();
    let sink = RecordingSink::new(&log);
    let share = ScriptedShare {
        log: log.clone(),
        supported: true,
        result: Err(ShareError::Failed("not allowed".into())),
    };
    let pipeline = pipeline(&log, share, sink);

    let report = pipeline.deliver(&[asset("_exn")], "x").await;

    assert_eq!(report.outcome, DeliveryOutcome::Downloaded { count: 1 });
    assert_eq!(
        report.transitions,
        vec![
            PipelineState::Delivering,
            PipelineState::NativeShare,
            PipelineState::SequentialDownload,
            PipelineState::Done
        ]
    );
    assert!(!log.lock().iter().any(|e| matches!(e, Event::Notify(_))));
}

#[tokio::test]
async fn test_download_failure_notifies_once_and_keeps_earlier_files() {
    let log: Log = Arc::default();
    let mut sink = RecordingSink::new(&log);
    sink.fail_on = Some("post_pag2.png".into());
    let pipeline = pipeline(&log, unsupported(&log), sink);

    let assets = [asset("_pag1"), asset("_pag2"), asset("_pag3")];
    let report = pipeline.deliver(&assets, "post").await;

    assert!(matches!(report.outcome, DeliveryOutcome::Failed { .. }));
    assert_eq!(report.final_state(), PipelineState::Failed);
    assert_eq!(report.delivered, vec!["post_pag1.png"]);

    let log = log.lock();
    let notices = log.iter().filter(|e| matches!(e, Event::Notify(_))).count();
    assert_eq!(notices, 1);
    assert!(log.contains(&Event::Release("post_pag2.png".into())));
    assert!(!log.contains(&Event::Materialize("post_pag3.png".into())));
}

#[tokio::test]
async fn test_empty_set_goes_straight_to_done() {
    let log: Log = Arc::default();
    let sink = RecordingSink::new(&log);
    let pipeline = pipeline(&log, unsupported(&log), sink);

    let report = pipeline.deliver(&[], "nothing").await;

    assert_eq!(report.outcome, DeliveryOutcome::Empty);
    assert_eq!(report.transitions, vec![PipelineState::Delivering, PipelineState::Done]);
    assert!(log.lock().is_empty());
}

fn session(log: &Log) -> Session {
    let mut config = PostgenConfig::default();
    config.assets.templates_dir =
        std::env::temp_dir().join(format!("postgen_missing_templates_{}", std::process::id()));
    let loader = AssetLoader::new(&config.assets, Arc::new(AssetCache::new())).unwrap();
    let compositor = Compositor::new(&config, loader, Typeface::Fallback);
    let sink = RecordingSink::new(log);
    Session::new(compositor, pipeline(log, unsupported(log), sink))
}

#[tokio::test]
async fn test_session_renders_then_delivers_in_order() {
    let log: Log = Arc::default();
    let session = session(&log);
    assert_eq!(session.state(), PipelineState::Idle);

    let input = RenderInput::new(FormatId::Double)
        .with_title("Nueva Ley")
        .with_body("Detalles del anuncio");
    let report = session.generate(&input).await.unwrap();

    assert_eq!(
        report.transitions,
        vec![
            PipelineState::Idle,
            PipelineState::Rendering,
            PipelineState::Delivering,
            PipelineState::SequentialDownload,
            PipelineState::Done
        ]
    );
    assert_eq!(report.delivered, vec!["nueva_ley_pag1.png", "nueva_ley_pag2.png"]);
    assert_eq!(session.state(), PipelineState::Done);
    assert!(!session.is_busy());
}

#[tokio::test]
async fn test_session_rejects_overlapping_request() {
    #[derive(Clone)]
    struct BlockingShare(Arc<tokio::sync::Notify>);

    #[async_trait]
    impl ShareTarget for BlockingShare {
        fn supports_files(&self, _files: &[ShareFile]) -> bool {
            true
        }

        async fn share(&self, _request: ShareRequest) -> Result<(), ShareError> {
            self.0.notified().await;
            Ok(())
        }
    }

    let log: Log = Arc::default();
    let blocker = BlockingShare(Arc::new(tokio::sync::Notify::new()));
    let config = PostgenConfig::default();
    let loader = AssetLoader::new(&config.assets, Arc::new(AssetCache::new())).unwrap();
    let session = Session::new(
        Compositor::new(&config, loader, Typeface::Fallback),
        DeliveryPipeline::new(
            Box::new(blocker.clone()),
            Box::new(RecordingSink::new(&log)),
            Box::new(RecordingDelay(log.clone())),
            Box::new(RecordingNotifier(log.clone())),
        ),
    );
    let input = RenderInput::new(FormatId::Simple).with_title("t");

    let first = session.generate(&input);
    let second = async {
        while session.state() != PipelineState::Delivering {
            tokio::task::yield_now().await;
        }
        let rejected = session.generate(&input).await;
        blocker.0.notify_one();
        rejected
    };
    let (first, second) = tokio::join!(first, second);

    assert!(matches!(second, Err(PostError::Busy)));
    assert_eq!(first.unwrap().outcome, DeliveryOutcome::Shared);
    assert_eq!(session.state(), PipelineState::Done);
}
