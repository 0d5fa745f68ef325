mod backends;
mod engine;
mod error;
mod progress;
mod request;
mod response;

#[cfg(feature = "engine-tesseract")]
pub use backends::tesseract::TesseractOcrEngine;
pub use engine::{NoopOcrEngine, OcrEngine};
pub use error::OcrError;
pub use progress::{OcrPhase, OcrProgress, OcrProgressFn};
pub use request::OcrRequest;
pub use response::OcrResponse;
