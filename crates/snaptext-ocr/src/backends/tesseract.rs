//! Tesseract through the rusty-tesseract CLI wrapper. Requires a
//! system tesseract binary; `warm_up` probes for it so missing
//! installs surface before the first recognize call.

use std::collections::HashMap;

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use log::{debug, info};
use rusty_tesseract::{Args, Image};
use snaptext_types::RgbaFrame;

use crate::engine::OcrEngine;
use crate::error::OcrError;
use crate::progress::{OcrPhase, OcrProgress};
use crate::request::OcrRequest;
use crate::response::OcrResponse;

const ENGINE_NAME: &str = "tesseract";

/// Page segmentation mode 11: sparse text in no particular order.
const DEFAULT_PSM: i32 = 11;
/// Engine mode 3: whatever tesseract considers its default.
const DEFAULT_OEM: i32 = 3;

#[derive(Debug, Default)]
pub struct TesseractOcrEngine;

impl TesseractOcrEngine {
    pub fn new() -> Self {
        TesseractOcrEngine
    }
}

impl OcrEngine for TesseractOcrEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn warm_up(&self) -> Result<(), OcrError> {
        let version = rusty_tesseract::get_tesseract_version()
            .map_err(|err| OcrError::unavailable(ENGINE_NAME, err.to_string()))?;
        debug!("tesseract available: {}", version.trim());
        Ok(())
    }

    fn recognize(&self, request: &OcrRequest<'_>) -> Result<OcrResponse, OcrError> {
        request.report(OcrProgress::new(OcrPhase::Preparing, 0.0));
        let frame = request.image();
        let prepared = prepare_image(frame)?;
        let tess_image =
            Image::from_dynamic_image(&prepared).map_err(|err| OcrError::backend(err.to_string()))?;
        let args = tesseract_args(request.language(), frame.width().min(frame.height()));

        request.report(OcrProgress::new(OcrPhase::Recognizing, 0.2));
        let text = rusty_tesseract::image_to_string(&tess_image, &args)
            .map_err(|err| OcrError::backend(err.to_string()))?;

        request.report(OcrProgress::new(OcrPhase::Parsing, 0.9));
        let confidence = match rusty_tesseract::image_to_data(&tess_image, &args) {
            Ok(output) => mean_confidence(
                output
                    .data
                    .iter()
                    .filter(|word| !word.text.trim().is_empty())
                    .map(|word| word.conf),
            ),
            Err(err) => {
                debug!("confidence pass failed: {err}");
                None
            }
        };

        request.report(OcrProgress::new(OcrPhase::Parsing, 1.0));
        let mut response = OcrResponse::new(text.trim());
        if let Some(value) = confidence {
            response = response.with_confidence(value);
        }
        Ok(response)
    }
}

/// Convert the frame for tesseract, upscaling small crops. Tesseract
/// wants glyphs at least ten pixels tall.
fn prepare_image(frame: &RgbaFrame) -> Result<DynamicImage, OcrError> {
    let image = RgbaImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or_else(|| OcrError::invalid_image("buffer does not match dimensions"))?;
    let image = DynamicImage::ImageRgba8(image);
    let factor = upscale_factor(frame.width(), frame.height());
    if factor > 1 {
        let width = frame.width() * factor;
        let height = frame.height() * factor;
        info!(
            "upscaling {}x{} image {}x for recognition",
            frame.width(),
            frame.height(),
            factor
        );
        Ok(image.resize(width, height, FilterType::Lanczos3))
    } else {
        Ok(image)
    }
}

fn upscale_factor(width: u32, height: u32) -> u32 {
    let min_dimension = width.min(height);
    if min_dimension < 100 {
        4
    } else if min_dimension < 200 {
        2
    } else {
        1
    }
}

fn tesseract_args(language: &str, min_dimension: u32) -> Args {
    let dpi = if min_dimension < 200 { 300 } else { 150 };
    Args {
        lang: language.to_string(),
        config_variables: HashMap::new(),
        dpi: Some(dpi),
        psm: Some(DEFAULT_PSM),
        oem: Some(DEFAULT_OEM),
    }
}

fn mean_confidence<I>(values: I) -> Option<f32>
where
    I: IntoIterator<Item = f32>,
{
    let mut sum = 0.0f32;
    let mut count = 0u32;
    for value in values {
        // tesseract marks non-word rows with a confidence of -1
        if value >= 0.0 {
            sum += value;
            count += 1;
        }
    }
    (count > 0).then(|| sum / count as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_crops_are_upscaled() {
        assert_eq!(upscale_factor(50, 400), 4);
        assert_eq!(upscale_factor(150, 300), 2);
        assert_eq!(upscale_factor(640, 480), 1);
        assert_eq!(upscale_factor(200, 200), 1);
    }

    #[test]
    fn mean_confidence_ignores_sentinel_rows() {
        assert_eq!(mean_confidence([90.0, -1.0, 70.0]), Some(80.0));
        assert_eq!(mean_confidence([-1.0, -1.0]), None);
        assert_eq!(mean_confidence([]), None);
    }

    #[test]
    fn prepare_image_upscales_tiny_frames() {
        let frame = RgbaFrame::from_owned(10, 10, vec![255u8; 10 * 10 * 4]).unwrap();
        let prepared = prepare_image(&frame).unwrap();
        assert_eq!(prepared.width(), 40);
        assert_eq!(prepared.height(), 40);
    }

    #[test]
    fn args_raise_dpi_for_small_images() {
        assert_eq!(tesseract_args("eng", 80).dpi, Some(300));
        assert_eq!(tesseract_args("eng", 480).dpi, Some(150));
        assert_eq!(tesseract_args("deu", 480).lang, "deu");
    }
}
