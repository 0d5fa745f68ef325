use std::sync::Arc;

use log::warn;
#[cfg(feature = "engine-tesseract")]
use snaptext_ocr::TesseractOcrEngine;
use snaptext_ocr::{NoopOcrEngine, OcrEngine, OcrError};

use crate::cli::EngineKind;

pub fn build_engine(kind: EngineKind) -> Result<Arc<dyn OcrEngine>, OcrError> {
    match kind {
        EngineKind::Tesseract => build_tesseract_engine(),
        EngineKind::Noop => build_noop_engine(),
        EngineKind::Auto => build_auto_engine(),
    }
}

fn build_noop_engine() -> Result<Arc<dyn OcrEngine>, OcrError> {
    let engine = NoopOcrEngine::default();
    engine.warm_up()?;
    Ok(Arc::new(engine))
}

#[cfg(feature = "engine-tesseract")]
fn build_tesseract_engine() -> Result<Arc<dyn OcrEngine>, OcrError> {
    let engine = TesseractOcrEngine::new();
    engine.warm_up()?;
    Ok(Arc::new(engine))
}

#[cfg(not(feature = "engine-tesseract"))]
fn build_tesseract_engine() -> Result<Arc<dyn OcrEngine>, OcrError> {
    Err(OcrError::unavailable(
        "tesseract",
        "engine not compiled into this build",
    ))
}

fn build_auto_engine() -> Result<Arc<dyn OcrEngine>, OcrError> {
    match build_tesseract_engine() {
        Ok(engine) => Ok(engine),
        Err(err) => {
            warn!("tesseract unavailable ({err}); falling back to the noop engine");
            build_noop_engine()
        }
    }
}
