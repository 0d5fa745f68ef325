//! The capture-to-text pipeline behind every CLI command.
//!
//! One controller owns the camera source, the persisted image slot,
//! the crop stage, and the OCR engine. All image replacement funnels
//! through a single point so crop parameters and recognized text can
//! never outlive the image they were made for; recognition runs on a
//! blocking task and is checked for staleness when it completes.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};
use snaptext_capture::CaptureSource;
use snaptext_ocr::{OcrEngine, OcrError, OcrProgressFn, OcrRequest, OcrResponse};
use snaptext_types::{CropRect, Facing, ImageId, RgbaFrame};
use tokio::task::JoinHandle;

use crate::crop::CropStage;
use crate::error::{CropError, PipelineError};
use crate::store::ImageStore;

/// Observable lifecycle of the single image slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Empty,
    Captured,
    Recognized,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Empty => "empty",
            PipelineState::Captured => "captured",
            PipelineState::Recognized => "recognized",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-flight recognition pinned to the image it started from.
pub struct RecognitionTask {
    image_id: ImageId,
    handle: JoinHandle<Result<OcrResponse, OcrError>>,
}

impl RecognitionTask {
    pub fn image_id(&self) -> ImageId {
        self.image_id
    }
}

pub struct PipelineController {
    source: CaptureSource,
    store: ImageStore,
    crop: CropStage,
    engine: Arc<dyn OcrEngine>,
    recognized: Option<OcrResponse>,
}

impl PipelineController {
    /// An image restored by [`ImageStore::open`] is bound to the crop
    /// stage right away, with fresh parameters.
    pub fn new(source: CaptureSource, store: ImageStore, engine: Arc<dyn OcrEngine>) -> Self {
        let mut crop = CropStage::new();
        if let Some((id, frame)) = store.get() {
            debug!("binding restored image {id} to the crop stage");
            crop.load(frame.clone());
        }
        PipelineController {
            source,
            store,
            crop,
            engine,
            recognized: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        if self.store.get().is_none() {
            PipelineState::Empty
        } else if self.recognized.is_some() {
            PipelineState::Recognized
        } else {
            PipelineState::Captured
        }
    }

    pub async fn start_camera(&mut self, facing: Facing) -> Result<(), PipelineError> {
        self.source.start(facing).await?;
        Ok(())
    }

    /// Restart the stream on the other camera and report which one is
    /// now live. Without an active stream this starts the camera
    /// opposite the default.
    pub async fn flip_camera(&mut self) -> Result<Facing, PipelineError> {
        let next = self.source.facing().unwrap_or_default().flipped();
        self.source.start(next).await?;
        Ok(next)
    }

    pub fn stop_camera(&mut self) {
        self.source.stop();
    }

    /// Keep the most recent camera frame as the current image. Lets
    /// `warmup_frames` more frames pass first so auto-exposure has
    /// settled.
    pub async fn capture_frame(&mut self, warmup_frames: u32) -> Result<ImageId, PipelineError> {
        if warmup_frames > 0 {
            self.source.settle(warmup_frames).await?;
        }
        let frame = self.source.snapshot()?;
        self.set_image(frame)
    }

    pub async fn import_file(&mut self, path: &Path) -> Result<ImageId, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        self.import_bytes(&bytes)
    }

    /// Decode image bytes and make the result current. A decode
    /// failure leaves the pipeline exactly as it was.
    pub fn import_bytes(&mut self, bytes: &[u8]) -> Result<ImageId, PipelineError> {
        let id = self.store.import_bytes(bytes)?;
        self.rebind_current(id);
        Ok(id)
    }

    /// Make `frame` the current image. Every replacement path funnels
    /// through here.
    pub fn set_image(&mut self, frame: RgbaFrame) -> Result<ImageId, PipelineError> {
        let id = self.store.set(frame)?;
        self.rebind_current(id);
        Ok(id)
    }

    fn rebind_current(&mut self, id: ImageId) {
        if let Some((_, frame)) = self.store.get() {
            self.crop.load(frame.clone());
        }
        self.recognized = None;
        info!("current image is now {id}");
    }

    pub fn set_region(&mut self, region: CropRect) -> Result<CropRect, PipelineError> {
        Ok(self.crop.set_region(region)?)
    }

    pub fn rotate(&mut self, delta_degrees: i32) -> Result<i32, PipelineError> {
        Ok(self.crop.rotate(delta_degrees)?)
    }

    /// Render the cropped image and hand it to the engine on a
    /// blocking task. The returned task remembers which image it reads
    /// so a later completion can be checked for staleness.
    pub fn begin_recognition(
        &self,
        language: &str,
        progress: Option<OcrProgressFn>,
    ) -> Result<RecognitionTask, PipelineError> {
        let image_id = self.store.current_id().ok_or(CropError::NoImageLoaded)?;
        let rendered = self.crop.render()?;
        let engine = Arc::clone(&self.engine);
        let language = language.to_string();
        info!(
            "recognizing image {image_id} ({}x{}) with {}",
            rendered.width(),
            rendered.height(),
            engine.name()
        );
        let handle = tokio::task::spawn_blocking(move || {
            let mut request = OcrRequest::new(&rendered, &language);
            if let Some(callback) = progress {
                request = request.with_progress(callback);
            }
            engine.recognize(&request)
        });
        Ok(RecognitionTask { image_id, handle })
    }

    /// Wait for a recognition pass and store its text, unless the
    /// image changed in the meantime. A stale completion is discarded
    /// and reported as `Ok(None)`; even a failure from a superseded
    /// pass must not surface.
    pub async fn complete_recognition(
        &mut self,
        task: RecognitionTask,
    ) -> Result<Option<OcrResponse>, PipelineError> {
        let RecognitionTask { image_id, handle } = task;
        let outcome = handle
            .await
            .map_err(|err| PipelineError::task(format!("recognition task failed: {err}")))?;
        if self.store.current_id() != Some(image_id) {
            warn!("discarding stale recognition for image {image_id}");
            return Ok(None);
        }
        let response = outcome?;
        info!(
            "recognized {} characters on image {image_id}",
            response.text.chars().count()
        );
        self.recognized = Some(response.clone());
        Ok(Some(response))
    }

    /// One full recognition pass against the current image.
    pub async fn recognize(
        &mut self,
        language: &str,
        progress: Option<OcrProgressFn>,
    ) -> Result<Option<OcrResponse>, PipelineError> {
        let task = self.begin_recognition(language, progress)?;
        self.complete_recognition(task).await
    }

    /// Clear the image slot, its persisted copy, and everything
    /// derived from it.
    pub fn delete(&mut self) -> Result<(), PipelineError> {
        self.store.clear()?;
        self.crop.unload();
        self.recognized = None;
        info!("image slot cleared");
        Ok(())
    }

    pub fn current_image(&self) -> Option<(ImageId, &RgbaFrame)> {
        self.store.get()
    }

    pub fn region(&self) -> Option<CropRect> {
        self.crop.region()
    }

    pub fn rotation_degrees(&self) -> i32 {
        self.crop.rotation_degrees()
    }

    pub fn recognition(&self) -> Option<&OcrResponse> {
        self.recognized.as_ref()
    }

    pub fn recognized_text(&self) -> Option<&str> {
        self.recognized.as_ref().map(|response| response.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use snaptext_capture::Configuration;
    use snaptext_ocr::NoopOcrEngine;

    use super::*;
    use crate::store::MemoryBlobStore;

    fn test_controller() -> PipelineController {
        let store = ImageStore::new(Arc::new(MemoryBlobStore::new()));
        PipelineController::new(
            CaptureSource::new(Configuration::default()),
            store,
            Arc::new(NoopOcrEngine),
        )
    }

    fn frame(width: u32, height: u32, value: u8) -> RgbaFrame {
        let data = vec![value; width as usize * height as usize * 4];
        RgbaFrame::from_owned(width, height, data).unwrap()
    }

    #[test]
    fn state_starts_empty_and_tracks_the_image() {
        let mut controller = test_controller();
        assert_eq!(controller.state(), PipelineState::Empty);
        controller.set_image(frame(2, 2, 1)).unwrap();
        assert_eq!(controller.state(), PipelineState::Captured);
        controller.delete().unwrap();
        assert_eq!(controller.state(), PipelineState::Empty);
        assert_eq!(controller.region(), None);
    }

    #[test]
    fn crop_adjustments_without_an_image_are_rejected() {
        let mut controller = test_controller();
        assert!(matches!(
            controller.set_region(CropRect::new(0, 0, 1, 1)),
            Err(PipelineError::Crop(CropError::NoImageLoaded))
        ));
        assert!(matches!(
            controller.rotate(90),
            Err(PipelineError::Crop(CropError::NoImageLoaded))
        ));
    }

    #[test]
    fn recognition_without_an_image_is_rejected() {
        let controller = test_controller();
        assert!(matches!(
            controller.begin_recognition("eng", None),
            Err(PipelineError::Crop(CropError::NoImageLoaded))
        ));
    }

    #[test]
    fn corrupt_import_keeps_the_previous_image() {
        let mut controller = test_controller();
        let id = controller.set_image(frame(2, 2, 1)).unwrap();
        assert!(controller.import_bytes(b"not an image").is_err());
        let (current, _) = controller.current_image().unwrap();
        assert_eq!(current, id);
        assert_eq!(controller.state(), PipelineState::Captured);
    }

    #[test]
    fn replacing_the_image_resets_crop_parameters() {
        let mut controller = test_controller();
        controller.set_image(frame(4, 4, 1)).unwrap();
        controller.set_region(CropRect::new(1, 1, 2, 2)).unwrap();
        controller.rotate(90).unwrap();

        controller.set_image(frame(6, 2, 2)).unwrap();
        assert_eq!(controller.region(), Some(CropRect::full(6, 2)));
        assert_eq!(controller.rotation_degrees(), 0);
    }
}
