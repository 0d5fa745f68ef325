/// Result of one recognition pass.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrResponse {
    pub text: String,
    /// Mean word confidence reported by the engine, 0 to 100.
    pub confidence: Option<f32>,
}

impl OcrResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, value: f32) -> Self {
        self.confidence = Some(value);
        self
    }

    pub fn empty() -> Self {
        Self::new(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
