use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("{engine} engine is unavailable: {message}")]
    Unavailable {
        engine: &'static str,
        message: String,
    },
    #[error("image cannot be recognized: {reason}")]
    InvalidImage { reason: String },
    #[error("backend error: {message}")]
    Backend { message: String },
}

impl OcrError {
    pub fn unavailable(engine: &'static str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            engine,
            message: message.into(),
        }
    }

    pub fn invalid_image(reason: impl Into<String>) -> Self {
        Self::InvalidImage {
            reason: reason.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}
