//! Crop region and rotation over the current image.
//!
//! The stage binds one source frame at a time. The region always lives
//! in source-image coordinates and survives any number of rotations,
//! so adjusting one never corrupts the other. Rendering crops first,
//! then applies the accumulated rotation snapped to a quarter turn.

use image::{RgbaImage, imageops};
use log::debug;
use snaptext_types::{CropRect, RGBA_BYTES_PER_PIXEL, RgbaFrame};

use crate::error::CropError;

struct BoundImage {
    frame: RgbaFrame,
    region: CropRect,
    rotation_degrees: i32,
}

/// Mutable crop/rotate parameters bound to a source frame.
#[derive(Default)]
pub struct CropStage {
    bound: Option<BoundImage>,
}

impl CropStage {
    pub fn new() -> Self {
        CropStage::default()
    }

    /// Bind a new source frame. The region resets to the full frame
    /// and the rotation to zero; parameters chosen for a previous
    /// image never leak onto a new one.
    pub fn load(&mut self, frame: RgbaFrame) {
        let region = CropRect::full(frame.width(), frame.height());
        debug!(
            "crop stage bound {}x{} frame",
            frame.width(),
            frame.height()
        );
        self.bound = Some(BoundImage {
            frame,
            region,
            rotation_degrees: 0,
        });
    }

    pub fn unload(&mut self) {
        self.bound = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.bound.is_some()
    }

    pub fn region(&self) -> Option<CropRect> {
        self.bound.as_ref().map(|bound| bound.region)
    }

    pub fn rotation_degrees(&self) -> i32 {
        self.bound
            .as_ref()
            .map(|bound| bound.rotation_degrees)
            .unwrap_or(0)
    }

    /// Replace the crop region. The request is clamped into the frame
    /// bounds rather than rejected; the stored rect is returned.
    pub fn set_region(&mut self, requested: CropRect) -> Result<CropRect, CropError> {
        let bound = self.bound.as_mut().ok_or(CropError::NoImageLoaded)?;
        let clamped = requested.clamped_to(bound.frame.width(), bound.frame.height());
        if clamped != requested {
            debug!("crop region {requested} clamped to {clamped}");
        }
        bound.region = clamped;
        Ok(clamped)
    }

    /// Add `delta_degrees` to the accumulated rotation and return the
    /// new value, normalized into `0..360`.
    pub fn rotate(&mut self, delta_degrees: i32) -> Result<i32, CropError> {
        let bound = self.bound.as_mut().ok_or(CropError::NoImageLoaded)?;
        let accumulated = i64::from(bound.rotation_degrees) + i64::from(delta_degrees);
        bound.rotation_degrees = accumulated.rem_euclid(360) as i32;
        Ok(bound.rotation_degrees)
    }

    /// Produce the cropped, rotated frame the recognizer should see.
    pub fn render(&self) -> Result<RgbaFrame, CropError> {
        let bound = self.bound.as_ref().ok_or(CropError::NoImageLoaded)?;
        let pixels = copy_region(&bound.frame, bound.region);
        let cropped = RgbaImage::from_raw(bound.region.width, bound.region.height, pixels)
            .unwrap_or_else(|| unreachable!("cropped buffer length matches its dimensions"));
        let rotated = match quarter_turns(bound.rotation_degrees) {
            1 => imageops::rotate90(&cropped),
            2 => imageops::rotate180(&cropped),
            3 => imageops::rotate270(&cropped),
            _ => cropped,
        };
        let (width, height) = rotated.dimensions();
        Ok(RgbaFrame::from_owned(width, height, rotated.into_raw())
            .unwrap_or_else(|_| unreachable!("rotated buffer length matches its dimensions")))
    }
}

/// Number of clockwise quarter turns nearest the accumulated angle.
fn quarter_turns(degrees: i32) -> i32 {
    ((degrees + 45) / 90).rem_euclid(4)
}

fn copy_region(frame: &RgbaFrame, region: CropRect) -> Vec<u8> {
    let stride = frame.width() as usize * RGBA_BYTES_PER_PIXEL;
    let row_bytes = region.width as usize * RGBA_BYTES_PER_PIXEL;
    let mut pixels = Vec::with_capacity(region.height as usize * row_bytes);
    let data = frame.data();
    for row in 0..region.height as usize {
        let start =
            (region.y as usize + row) * stride + region.x as usize * RGBA_BYTES_PER_PIXEL;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}
