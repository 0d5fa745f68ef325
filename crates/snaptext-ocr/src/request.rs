use snaptext_types::RgbaFrame;

use crate::progress::{OcrProgress, OcrProgressFn};

/// OCR invocation: the image to read plus recognition options.
pub struct OcrRequest<'a> {
    image: &'a RgbaFrame,
    language: &'a str,
    progress: Option<OcrProgressFn>,
}

impl<'a> OcrRequest<'a> {
    pub fn new(image: &'a RgbaFrame, language: &'a str) -> Self {
        Self {
            image,
            language,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: OcrProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn image(&self) -> &'a RgbaFrame {
        self.image
    }

    pub fn language(&self) -> &'a str {
        self.language
    }

    /// Report progress to the caller, if a callback was provided.
    pub fn report(&self, progress: OcrProgress) {
        if let Some(callback) = &self.progress {
            callback(progress);
        }
    }
}

impl std::fmt::Debug for OcrRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrRequest")
            .field("image", &self.image)
            .field("language", &self.language)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}
