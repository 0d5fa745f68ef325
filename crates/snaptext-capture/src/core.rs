use std::pin::Pin;

use futures_core::Stream;
use futures_util::stream::unfold;
use tokio::sync::mpsc::{self, Sender};

pub use snaptext_types::{CaptureError, CaptureResult, RgbaFrame};

pub type FrameStream = Pin<Box<dyn Stream<Item = CaptureResult<RgbaFrame>> + Send>>;

pub type DynFrameProvider = Box<dyn FrameProvider>;

/// A source of live camera frames. Providers are consumed on use: the
/// device handle lives inside the stream and is released when the stream
/// is dropped.
pub trait FrameProvider: Send + 'static {
    fn name(&self) -> &'static str;

    fn into_stream(self: Box<Self>) -> FrameStream;
}

/// Bridge a blocking frame producer into an async stream. The producer
/// runs on the blocking pool and owns the device; dropping the stream
/// closes the channel, which the producer observes via `is_closed`.
pub fn spawn_stream_from_channel(
    capacity: usize,
    task: impl FnOnce(Sender<CaptureResult<RgbaFrame>>) + Send + 'static,
) -> FrameStream {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    tokio::task::spawn_blocking(move || task(tx));
    let stream = unfold(rx, |mut receiver| async {
        receiver.recv().await.map(|item| (item, receiver))
    });
    Box::pin(stream)
}
