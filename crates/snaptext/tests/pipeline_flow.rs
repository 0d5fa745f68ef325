use std::sync::{Arc, Mutex};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use snaptext::error::PipelineError;
use snaptext::pipeline::{PipelineController, PipelineState};
use snaptext::store::{ImageStore, MemoryBlobStore};
use snaptext_capture::{CaptureSource, Configuration};
use snaptext_ocr::{OcrEngine, OcrError, OcrRequest, OcrResponse};
use snaptext_types::{CaptureError, CropRect, Facing, RgbaFrame};

struct FixedEngine {
    text: &'static str,
}

impl OcrEngine for FixedEngine {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn recognize(&self, _request: &OcrRequest<'_>) -> Result<OcrResponse, OcrError> {
        Ok(OcrResponse::new(self.text).with_confidence(88.0))
    }
}

struct FailingEngine;

impl OcrEngine for FailingEngine {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn recognize(&self, _request: &OcrRequest<'_>) -> Result<OcrResponse, OcrError> {
        Err(OcrError::backend("engine exploded"))
    }
}

/// Records the dimensions of every image it is asked to read.
#[derive(Default)]
struct DimensionRecorder {
    seen: Mutex<Vec<(u32, u32)>>,
}

impl OcrEngine for DimensionRecorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn recognize(&self, request: &OcrRequest<'_>) -> Result<OcrResponse, OcrError> {
        let image = request.image();
        self.seen
            .lock()
            .unwrap()
            .push((image.width(), image.height()));
        Ok(OcrResponse::new("ok"))
    }
}

fn controller_with(engine: Arc<dyn OcrEngine>) -> PipelineController {
    let store = ImageStore::new(Arc::new(MemoryBlobStore::new()));
    PipelineController::new(CaptureSource::new(Configuration::default()), store, engine)
}

fn frame(width: u32, height: u32, value: u8) -> RgbaFrame {
    let data = vec![value; width as usize * height as usize * 4];
    RgbaFrame::from_owned(width, height, data).unwrap()
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let data = vec![200u8; width as usize * height as usize * 4];
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(&data, width, height, ExtendedColorType::Rgba8)
        .unwrap();
    bytes
}

#[tokio::test(flavor = "multi_thread")]
async fn capture_recognize_delete_walks_the_states() {
    let mut controller = controller_with(Arc::new(FixedEngine {
        text: "hello world",
    }));
    assert_eq!(controller.state(), PipelineState::Empty);

    controller.start_camera(Facing::Rear).await.unwrap();
    controller.capture_frame(0).await.unwrap();
    controller.stop_camera();
    assert_eq!(controller.state(), PipelineState::Captured);

    let response = controller.recognize("eng", None).await.unwrap().unwrap();
    assert_eq!(response.text, "hello world");
    assert_eq!(controller.state(), PipelineState::Recognized);
    assert_eq!(controller.recognized_text(), Some("hello world"));

    controller.delete().unwrap();
    assert_eq!(controller.state(), PipelineState::Empty);
    assert_eq!(controller.recognized_text(), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn capture_without_a_camera_is_rejected() {
    let mut controller = controller_with(Arc::new(FixedEngine { text: "" }));
    let err = controller.capture_frame(0).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Capture(CaptureError::NoActiveStream)
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn flip_switches_to_the_other_camera() {
    let mut controller = controller_with(Arc::new(FixedEngine { text: "" }));
    controller.start_camera(Facing::Rear).await.unwrap();
    assert_eq!(controller.flip_camera().await.unwrap(), Facing::Front);
    assert_eq!(controller.flip_camera().await.unwrap(), Facing::Rear);
    controller.stop_camera();
}

#[tokio::test(flavor = "multi_thread")]
async fn replacing_the_image_discards_in_flight_recognition() {
    let mut controller = controller_with(Arc::new(FixedEngine { text: "stale" }));
    controller.set_image(frame(4, 4, 1)).unwrap();

    let task = controller.begin_recognition("eng", None).unwrap();
    controller.set_image(frame(4, 4, 2)).unwrap();

    let outcome = controller.complete_recognition(task).await.unwrap();
    assert_eq!(outcome, None);
    assert_eq!(controller.state(), PipelineState::Captured);
    assert_eq!(controller.recognized_text(), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn deleting_discards_in_flight_recognition() {
    let mut controller = controller_with(Arc::new(FixedEngine { text: "stale" }));
    controller.set_image(frame(4, 4, 1)).unwrap();

    let task = controller.begin_recognition("eng", None).unwrap();
    controller.delete().unwrap();

    let outcome = controller.complete_recognition(task).await.unwrap();
    assert_eq!(outcome, None);
    assert_eq!(controller.state(), PipelineState::Empty);
}

#[tokio::test(flavor = "multi_thread")]
async fn engine_failure_keeps_the_image_captured() {
    let mut controller = controller_with(Arc::new(FailingEngine));
    controller.set_image(frame(4, 4, 3)).unwrap();

    let err = controller.recognize("eng", None).await.unwrap_err();
    assert!(matches!(err, PipelineError::Ocr(_)));
    assert_eq!(controller.state(), PipelineState::Captured);
    assert!(controller.current_image().is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn failure_from_a_superseded_pass_is_discarded_too() {
    let mut controller = controller_with(Arc::new(FailingEngine));
    controller.set_image(frame(4, 4, 1)).unwrap();

    let task = controller.begin_recognition("eng", None).unwrap();
    controller.set_image(frame(4, 4, 2)).unwrap();

    let outcome = controller.complete_recognition(task).await.unwrap();
    assert_eq!(outcome, None);
    assert_eq!(controller.state(), PipelineState::Captured);
}

#[tokio::test(flavor = "multi_thread")]
async fn crop_parameters_flow_into_recognition() {
    let recorder = Arc::new(DimensionRecorder::default());
    let mut controller = controller_with(recorder.clone());

    controller.import_bytes(&png_bytes(8, 6)).unwrap();
    controller.set_region(CropRect::new(2, 1, 4, 3)).unwrap();
    controller.rotate(90).unwrap();

    controller.recognize("eng", None).await.unwrap().unwrap();

    let seen = recorder.seen.lock().unwrap().clone();
    assert_eq!(seen, vec![(3, 4)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn captured_image_survives_a_controller_rebuild() {
    let blobs = Arc::new(MemoryBlobStore::new());
    {
        let store = ImageStore::new(blobs.clone());
        let mut controller = PipelineController::new(
            CaptureSource::new(Configuration::default()),
            store,
            Arc::new(FixedEngine { text: "" }),
        );
        controller.start_camera(Facing::Front).await.unwrap();
        controller.capture_frame(1).await.unwrap();
        controller.stop_camera();
    }

    let store = ImageStore::open(blobs).unwrap();
    let controller = PipelineController::new(
        CaptureSource::new(Configuration::default()),
        store,
        Arc::new(FixedEngine { text: "" }),
    );
    assert_eq!(controller.state(), PipelineState::Captured);
    let (_, restored) = controller.current_image().unwrap();
    assert_eq!(controller.region(), Some(CropRect::full(restored.width(), restored.height())));
}
