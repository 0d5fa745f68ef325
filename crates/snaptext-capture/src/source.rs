use futures_util::StreamExt;
use log::{debug, info, warn};
use snaptext_types::{CaptureError, CaptureResult, Facing, RgbaFrame};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::config::Configuration;
use crate::core::{DynFrameProvider, FrameStream};

/// Owns at most one live capture stream and hands out the most recent
/// frame on demand.
///
/// `start` resolves only after the backend has delivered its first
/// frame, so a successful start guarantees that `snapshot` has
/// something to return. Starting again tears down the previous stream
/// first, which is how switching between the front and rear camera
/// works.
pub struct CaptureSource {
    config: Configuration,
    active: Option<ActiveStream>,
}

struct ActiveStream {
    facing: Facing,
    backend: &'static str,
    latest: watch::Receiver<Option<RgbaFrame>>,
    task: JoinHandle<()>,
}

impl Drop for ActiveStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl CaptureSource {
    pub fn new(config: Configuration) -> Self {
        CaptureSource {
            config,
            active: None,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Facing of the live stream, if one is running.
    pub fn facing(&self) -> Option<Facing> {
        self.active.as_ref().map(|active| active.facing)
    }

    /// Start streaming from the configured backend. Waits for the first
    /// frame before returning; failures and timeouts leave the source
    /// with no active stream.
    pub async fn start(&mut self, facing: Facing) -> CaptureResult<()> {
        let provider = self.config.create_provider(facing)?;
        self.start_with_provider(facing, provider).await
    }

    /// Same as [`start`](Self::start) but with an explicit provider.
    /// Tests use this to inject failing or scripted streams.
    pub async fn start_with_provider(
        &mut self,
        facing: Facing,
        provider: DynFrameProvider,
    ) -> CaptureResult<()> {
        self.stop();
        let backend = provider.name();
        let stream = provider.into_stream();
        let (latest_tx, latest_rx) = watch::channel(None);
        let (ready_tx, ready_rx) = oneshot::channel();
        let task = tokio::spawn(pump_frames(stream, backend, latest_tx, ready_tx));
        match timeout(self.config.start_timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => {
                info!("capture started: backend={backend} facing={facing}");
                self.active = Some(ActiveStream {
                    facing,
                    backend,
                    latest: latest_rx,
                    task,
                });
                Ok(())
            }
            Ok(Ok(Err(err))) => {
                task.abort();
                Err(err)
            }
            Ok(Err(_)) => {
                task.abort();
                Err(CaptureError::device_unavailable(
                    backend,
                    "capture task exited before the first frame",
                ))
            }
            Err(_) => {
                task.abort();
                Err(CaptureError::device_unavailable(
                    backend,
                    format!("no frame within {:?}", self.config.start_timeout),
                ))
            }
        }
    }

    /// Most recent frame from the live stream.
    ///
    /// Fails with [`CaptureError::NoActiveStream`] when the source was
    /// never started, was stopped, or the stream has since died.
    pub fn snapshot(&self) -> CaptureResult<RgbaFrame> {
        let active = self.active.as_ref().ok_or(CaptureError::NoActiveStream)?;
        let frame = active.latest.borrow().clone();
        frame.ok_or(CaptureError::NoActiveStream)
    }

    /// Let the stream run for `frames` more frames. Used as a warm-up
    /// so auto-exposure has settled before a frame is kept. Returns as
    /// soon as the stream dies; the following `snapshot` reports that.
    pub async fn settle(&self, frames: u32) -> CaptureResult<()> {
        let Some(active) = self.active.as_ref() else {
            return Err(CaptureError::NoActiveStream);
        };
        let mut receiver = active.latest.clone();
        receiver.borrow_and_update();
        for _ in 0..frames {
            match timeout(self.config.start_timeout, receiver.changed()).await {
                Ok(Ok(())) => {
                    receiver.borrow_and_update();
                }
                Ok(Err(_)) | Err(_) => break,
            }
        }
        Ok(())
    }

    /// Tear down the live stream, if any. The backend device is
    /// released once its producer notices the closed channel.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            debug!("capture stopped: backend={}", active.backend);
        }
    }
}

async fn pump_frames(
    mut stream: FrameStream,
    backend: &'static str,
    latest: watch::Sender<Option<RgbaFrame>>,
    ready: oneshot::Sender<CaptureResult<()>>,
) {
    let mut ready = Some(ready);
    while let Some(item) = stream.next().await {
        match item {
            Ok(frame) => {
                if latest.send(Some(frame)).is_err() {
                    return;
                }
                if let Some(ready) = ready.take() {
                    let _ = ready.send(Ok(()));
                }
            }
            Err(err) => {
                match ready.take() {
                    Some(ready) => {
                        let _ = ready.send(Err(err));
                    }
                    None => warn!("capture stream on {backend} failed: {err}"),
                }
                let _ = latest.send(None);
                return;
            }
        }
    }
    if let Some(ready) = ready.take() {
        let _ = ready.send(Err(CaptureError::device_unavailable(
            backend,
            "stream ended before the first frame",
        )));
    }
    let _ = latest.send(None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Backend;
    use crate::core::FrameProvider;

    fn test_config() -> Configuration {
        Configuration {
            backend: Backend::Synthetic,
            width: 16,
            height: 12,
            ..Configuration::default()
        }
    }

    struct FailingProvider;

    impl FrameProvider for FailingProvider {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn into_stream(self: Box<Self>) -> FrameStream {
            Box::pin(futures_util::stream::once(async {
                Err(CaptureError::device_unavailable(
                    "failing",
                    "permission denied",
                ))
            }))
        }
    }

    struct SilentProvider;

    impl FrameProvider for SilentProvider {
        fn name(&self) -> &'static str {
            "silent"
        }

        fn into_stream(self: Box<Self>) -> FrameStream {
            Box::pin(futures_util::stream::empty())
        }
    }

    #[test]
    fn snapshot_without_stream_is_rejected() {
        let source = CaptureSource::new(test_config());
        assert!(matches!(
            source.snapshot(),
            Err(CaptureError::NoActiveStream)
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn start_then_snapshot_returns_a_frame() {
        let mut source = CaptureSource::new(test_config());
        source.start(Facing::Rear).await.unwrap();
        let frame = source.snapshot().unwrap();
        assert_eq!(frame.width(), 16);
        assert_eq!(frame.height(), 12);
        assert_eq!(source.facing(), Some(Facing::Rear));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn restart_switches_facing() {
        let mut source = CaptureSource::new(test_config());
        source.start(Facing::Rear).await.unwrap();
        source.start(Facing::Front).await.unwrap();
        assert_eq!(source.facing(), Some(Facing::Front));
        source.snapshot().unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_clears_the_stream() {
        let mut source = CaptureSource::new(test_config());
        source.start(Facing::Rear).await.unwrap();
        source.stop();
        assert!(!source.is_active());
        assert!(matches!(
            source.snapshot(),
            Err(CaptureError::NoActiveStream)
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_start_leaves_no_stream() {
        let mut source = CaptureSource::new(test_config());
        let err = source
            .start_with_provider(Facing::Rear, Box::new(FailingProvider))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable { .. }));
        assert!(!source.is_active());
        assert!(matches!(
            source.snapshot(),
            Err(CaptureError::NoActiveStream)
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stream_that_ends_early_fails_the_start() {
        let mut source = CaptureSource::new(test_config());
        let err = source
            .start_with_provider(Facing::Rear, Box::new(SilentProvider))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable { .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn settle_advances_past_the_first_frame() {
        let mut source = CaptureSource::new(test_config());
        source.start(Facing::Rear).await.unwrap();
        let first = source.snapshot().unwrap();
        source.settle(2).await.unwrap();
        let later = source.snapshot().unwrap();
        assert_ne!(first.pixel(0, 0), later.pixel(0, 0));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn settle_without_stream_is_rejected() {
        let source = CaptureSource::new(test_config());
        assert!(matches!(
            source.settle(1).await,
            Err(CaptureError::NoActiveStream)
        ));
    }
}
