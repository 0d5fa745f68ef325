use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use snaptext_ocr::{OcrProgress, OcrProgressFn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// Terminal progress bar fed by recognition callbacks.
pub struct RecognitionProgress {
    bar: ProgressBar,
    task: JoinHandle<()>,
}

impl RecognitionProgress {
    /// Drain any buffered updates, then clear the bar. Call after the
    /// recognition future resolves and its callback has been dropped.
    pub async fn finish(self) {
        let _ = self.task.await;
        self.bar.finish_and_clear();
    }
}

/// Build the callback/bar pair for one recognition pass. Updates flow
/// through a channel so the engine thread never touches the terminal;
/// dropping the callback closes the channel and ends the drive task.
pub fn recognition_progress() -> (OcrProgressFn, RecognitionProgress) {
    let bar = ProgressBar::new(100);
    bar.set_style(ProgressStyle::with_template("{bar:40.cyan/blue} {percent:>3}% {msg}").unwrap());
    bar.enable_steady_tick(Duration::from_millis(100));

    let (tx, rx) = mpsc::channel::<OcrProgress>(PROGRESS_CHANNEL_CAPACITY);
    let task = tokio::spawn(drive_progress(bar.clone(), rx));
    let callback: OcrProgressFn = Arc::new(move |update| {
        // A full channel only drops an intermediate update.
        let _ = tx.try_send(update);
    });
    (callback, RecognitionProgress { bar, task })
}

async fn drive_progress(bar: ProgressBar, mut rx: mpsc::Receiver<OcrProgress>) {
    while let Some(update) = rx.recv().await {
        bar.set_position(u64::from(update.percent()));
        bar.set_message(update.phase.as_str());
    }
}

#[cfg(test)]
mod tests {
    use snaptext_ocr::OcrPhase;

    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn finish_waits_for_buffered_updates() {
        let (callback, reporter) = recognition_progress();
        callback(OcrProgress::new(OcrPhase::Recognizing, 0.5));
        callback(OcrProgress::new(OcrPhase::Parsing, 1.0));
        drop(callback);
        reporter.finish().await;
    }
}
