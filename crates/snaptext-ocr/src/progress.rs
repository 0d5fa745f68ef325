use std::sync::Arc;

/// Coarse stages a recognition pass moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrPhase {
    Preparing,
    Recognizing,
    Parsing,
}

impl OcrPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrPhase::Preparing => "preparing image",
            OcrPhase::Recognizing => "recognizing text",
            OcrPhase::Parsing => "parsing results",
        }
    }
}

impl std::fmt::Display for OcrPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress report emitted while recognition runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OcrProgress {
    pub phase: OcrPhase,
    /// Completion of the whole pass, from 0.0 to 1.0.
    pub ratio: f32,
}

impl OcrProgress {
    pub fn new(phase: OcrPhase, ratio: f32) -> Self {
        OcrProgress {
            phase,
            ratio: ratio.clamp(0.0, 1.0),
        }
    }

    pub fn percent(&self) -> u8 {
        (self.ratio * 100.0).round() as u8
    }
}

/// Callback invoked with progress updates, from whichever thread runs
/// the engine.
pub type OcrProgressFn = Arc<dyn Fn(OcrProgress) + Send + Sync>;
