use crate::error::OcrError;
use crate::progress::{OcrPhase, OcrProgress};
use crate::request::OcrRequest;
use crate::response::OcrResponse;

/// Common interface for all OCR engines.
///
/// Engines are synchronous; callers that must not block drive them
/// from a blocking task.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Probe the backend before first use. Engines with external
    /// requirements, such as an installed binary, fail here instead of
    /// on the first recognize call.
    fn warm_up(&self) -> Result<(), OcrError> {
        Ok(())
    }

    fn recognize(&self, request: &OcrRequest<'_>) -> Result<OcrResponse, OcrError>;
}

/// Engine that recognizes nothing. Used when no real backend is
/// compiled in or available on the host.
#[derive(Debug, Default)]
pub struct NoopOcrEngine;

impl OcrEngine for NoopOcrEngine {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn recognize(&self, request: &OcrRequest<'_>) -> Result<OcrResponse, OcrError> {
        request.report(OcrProgress::new(OcrPhase::Recognizing, 1.0));
        Ok(OcrResponse::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snaptext_types::RgbaFrame;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn noop_returns_empty_text_and_reports_progress() {
        let frame = RgbaFrame::from_owned(1, 1, vec![0u8; 4]).unwrap();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let request = OcrRequest::new(&frame, "eng").with_progress(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let response = NoopOcrEngine.recognize(&request).unwrap();
        assert!(response.is_empty());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn warm_up_defaults_to_ok() {
        assert!(NoopOcrEngine.warm_up().is_ok());
    }
}
