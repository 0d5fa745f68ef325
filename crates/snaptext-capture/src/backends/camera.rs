//! Real camera devices through nokhwa. The device is opened inside the
//! blocking producer so construction failures surface as the first
//! stream item instead of blocking the async caller.

use log::{debug, warn};
use nokhwa::Camera;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use snaptext_types::{CaptureError, CaptureResult, Facing, RGBA_BYTES_PER_PIXEL, RgbaFrame};
use tokio::sync::mpsc::Sender;

use crate::config::Configuration;
use crate::core::{DynFrameProvider, FrameProvider, FrameStream, spawn_stream_from_channel};

pub struct NokhwaProvider {
    device_index: u32,
    width: u32,
    height: u32,
    channel_capacity: usize,
}

impl NokhwaProvider {
    pub fn new(config: &Configuration, facing: Facing) -> Self {
        NokhwaProvider {
            device_index: config.device_index(facing),
            width: config.width,
            height: config.height,
            channel_capacity: config.channel_capacity(),
        }
    }
}

pub fn boxed(config: &Configuration, facing: Facing) -> DynFrameProvider {
    Box::new(NokhwaProvider::new(config, facing))
}

impl FrameProvider for NokhwaProvider {
    fn name(&self) -> &'static str {
        "nokhwa"
    }

    fn into_stream(self: Box<Self>) -> FrameStream {
        let NokhwaProvider {
            device_index,
            width,
            height,
            channel_capacity,
        } = *self;
        spawn_stream_from_channel(channel_capacity, move |tx| {
            run_device(device_index, width, height, tx);
        })
    }
}

fn run_device(device_index: u32, width: u32, height: u32, tx: Sender<CaptureResult<RgbaFrame>>) {
    let mut camera = match open_camera(device_index, width, height) {
        Ok(camera) => camera,
        Err(err) => {
            let _ = tx.blocking_send(Err(err));
            return;
        }
    };
    debug!(
        "camera {} streaming at {}",
        device_index,
        camera.camera_format()
    );
    loop {
        match read_frame(&mut camera) {
            Ok(frame) => {
                if tx.blocking_send(Ok(frame)).is_err() {
                    break;
                }
            }
            Err(err) => {
                warn!("camera {device_index} read failed: {err}");
                let _ = tx.blocking_send(Err(err));
                break;
            }
        }
    }
    if let Err(err) = camera.stop_stream() {
        debug!("camera {device_index} stop failed: {err}");
    }
}

fn open_camera(device_index: u32, width: u32, height: u32) -> CaptureResult<Camera> {
    let format = CameraFormat::new(Resolution::new(width, height), FrameFormat::MJPEG, 30);
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));
    let mut camera = Camera::new(CameraIndex::Index(device_index), requested)
        .map_err(|err| device_error(device_index, err))?;
    camera
        .open_stream()
        .map_err(|err| device_error(device_index, err))?;
    Ok(camera)
}

fn read_frame(camera: &mut Camera) -> CaptureResult<RgbaFrame> {
    let buffer = camera
        .frame()
        .map_err(|err| CaptureError::device_unavailable("nokhwa", err.to_string()))?;
    let decoded = buffer
        .decode_image::<RgbFormat>()
        .map_err(|err| CaptureError::device_unavailable("nokhwa", err.to_string()))?;
    let (width, height) = (decoded.width(), decoded.height());
    rgb_to_rgba(width, height, &decoded.into_raw())
}

fn device_error(device_index: u32, err: impl std::fmt::Display) -> CaptureError {
    CaptureError::device_unavailable("nokhwa", format!("device {device_index}: {err}"))
}

fn rgb_to_rgba(width: u32, height: u32, rgb: &[u8]) -> CaptureResult<RgbaFrame> {
    let pixels = width as usize * height as usize;
    if rgb.len() < pixels * 3 {
        return Err(CaptureError::invalid_frame(format!(
            "decoded buffer holds {} bytes, expected {}",
            rgb.len(),
            pixels * 3
        )));
    }
    let mut data = Vec::with_capacity(pixels * RGBA_BYTES_PER_PIXEL);
    for pixel in rgb[..pixels * 3].chunks_exact(3) {
        data.extend_from_slice(&[pixel[0], pixel[1], pixel[2], 255]);
    }
    RgbaFrame::from_owned(width, height, data)
}
