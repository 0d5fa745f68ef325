use std::fmt;

use snaptext_capture::CaptureError;
use snaptext_ocr::OcrError;

use crate::settings::ConfigError;

/// Failures of the image store and its durable blob slot.
#[derive(Debug)]
pub enum StoreError {
    /// Input bytes are not a decodable image. The current image is
    /// untouched when this is returned.
    Decode { message: String },
    /// The current image could not be encoded for persistence.
    Encode { message: String },
    /// The blob slot itself failed.
    Storage {
        key: String,
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn decode(message: impl Into<String>) -> Self {
        StoreError::Decode {
            message: message.into(),
        }
    }

    pub fn encode(message: impl Into<String>) -> Self {
        StoreError::Encode {
            message: message.into(),
        }
    }

    pub fn storage(key: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Storage {
            key: key.into(),
            source,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Decode { message } => write!(f, "failed to decode image: {message}"),
            StoreError::Encode { message } => write!(f, "failed to encode image: {message}"),
            StoreError::Storage { key, source } => {
                write!(f, "blob storage failed for key '{key}': {source}")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Storage { source, .. } => Some(source),
            StoreError::Decode { .. } | StoreError::Encode { .. } => None,
        }
    }
}

/// Failures of the crop stage.
#[derive(Debug, PartialEq, Eq)]
pub enum CropError {
    /// A crop operation was requested while no image is bound.
    NoImageLoaded,
}

impl fmt::Display for CropError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CropError::NoImageLoaded => write!(f, "no image is loaded"),
        }
    }
}

impl std::error::Error for CropError {}

/// Anything the pipeline can fail with; what the binary reports.
#[derive(Debug)]
pub enum PipelineError {
    Capture(CaptureError),
    Store(StoreError),
    Crop(CropError),
    Ocr(OcrError),
    Config(ConfigError),
    Io(std::io::Error),
    Task { message: String },
}

impl PipelineError {
    pub fn task(message: impl Into<String>) -> Self {
        PipelineError::Task {
            message: message.into(),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Capture(err) => write!(f, "capture error: {err}"),
            PipelineError::Store(err) => write!(f, "store error: {err}"),
            PipelineError::Crop(err) => write!(f, "crop error: {err}"),
            PipelineError::Ocr(err) => write!(f, "recognition error: {err}"),
            PipelineError::Config(err) => write!(f, "configuration error: {err}"),
            PipelineError::Io(err) => write!(f, "I/O error: {err}"),
            PipelineError::Task { message } => write!(f, "task error: {message}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Capture(err) => Some(err),
            PipelineError::Store(err) => Some(err),
            PipelineError::Crop(err) => Some(err),
            PipelineError::Ocr(err) => Some(err),
            PipelineError::Config(err) => Some(err),
            PipelineError::Io(err) => Some(err),
            PipelineError::Task { .. } => None,
        }
    }
}

impl From<CaptureError> for PipelineError {
    fn from(value: CaptureError) -> Self {
        PipelineError::Capture(value)
    }
}

impl From<StoreError> for PipelineError {
    fn from(value: StoreError) -> Self {
        PipelineError::Store(value)
    }
}

impl From<CropError> for PipelineError {
    fn from(value: CropError) -> Self {
        PipelineError::Crop(value)
    }
}

impl From<OcrError> for PipelineError {
    fn from(value: OcrError) -> Self {
        PipelineError::Ocr(value)
    }
}

impl From<ConfigError> for PipelineError {
    fn from(value: ConfigError) -> Self {
        PipelineError::Config(value)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(value: std::io::Error) -> Self {
        PipelineError::Io(value)
    }
}
