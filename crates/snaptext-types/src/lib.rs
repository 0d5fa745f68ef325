//! Shared domain models for the snaptext workspace.
//!
//! This crate centralizes lightweight data structures used across the
//! capture, OCR, and CLI crates. Keep it backend-agnostic and avoid
//! platform-specific dependencies so all crates can depend on it without
//! pulling device SDKs or heavy features.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

pub type CaptureResult<T> = Result<T, CaptureError>;

/// Bytes per pixel for the tightly packed RGBA8 layout used everywhere.
pub const RGBA_BYTES_PER_PIXEL: usize = 4;

/// A single still image as decoded pixel data.
///
/// Rows are tightly packed (`width * 4` bytes per row); the payload is
/// reference-counted so frames can be handed between the capture stream,
/// the store, and the crop stage without copying pixels.
#[derive(Clone)]
pub struct RgbaFrame {
    width: u32,
    height: u32,
    data: Arc<[u8]>,
}

impl fmt::Debug for RgbaFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RgbaFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl RgbaFrame {
    pub fn from_owned(width: u32, height: u32, data: Vec<u8>) -> CaptureResult<Self> {
        if width == 0 || height == 0 {
            return Err(CaptureError::InvalidFrame {
                reason: format!("zero-sized frame ({width}x{height})"),
            });
        }
        let required = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(RGBA_BYTES_PER_PIXEL))
            .ok_or_else(|| CaptureError::InvalidFrame {
                reason: "calculated RGBA length overflowed".into(),
            })?;
        if data.len() < required {
            return Err(CaptureError::InvalidFrame {
                reason: format!(
                    "insufficient RGBA bytes: got {} expected at least {}",
                    data.len(),
                    required
                ),
            });
        }
        Ok(Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// RGBA value at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * RGBA_BYTES_PER_PIXEL;
        let slice = &self.data[offset..offset + RGBA_BYTES_PER_PIXEL];
        Some([slice[0], slice[1], slice[2], slice[3]])
    }
}

/// Identity of the store's current image, bumped on every replacement.
///
/// Async completions record the id they were started against; a completion
/// whose id no longer matches the store is stale and must be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(u64);

impl ImageId {
    pub fn first() -> Self {
        ImageId(1)
    }

    #[must_use]
    pub fn next(self) -> Self {
        ImageId(self.0.wrapping_add(1))
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// User-selected crop rectangle in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rect covering an entire `width` x `height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Clamp into `bounds`, always yielding a non-empty in-bounds rect.
    /// Out-of-range input shrinks or slides; it is never rejected.
    #[must_use]
    pub fn clamped_to(self, bounds_width: u32, bounds_height: u32) -> Self {
        let bw = bounds_width.max(1);
        let bh = bounds_height.max(1);
        let x = self.x.min(bw - 1);
        let y = self.y.min(bh - 1);
        let width = self.width.clamp(1, bw - x);
        let height = self.height.clamp(1, bh - y);
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_full(&self, width: u32, height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width == width && self.height == height
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{} {}x{}", self.x, self.y, self.width, self.height)
    }
}

/// Which physical camera the capture source binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    Front,
    /// The document-facing camera; what the original surface starts on.
    #[default]
    Rear,
}

impl Facing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Facing::Front => "front",
            Facing::Rear => "rear",
        }
    }

    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Facing::Front => Facing::Rear,
            Facing::Rear => Facing::Front,
        }
    }
}

impl FromStr for Facing {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            // "user"/"environment" are the constraint names browsers use;
            // accepted here so imported configs keep working.
            "front" | "user" => Ok(Facing::Front),
            "rear" | "back" | "environment" => Ok(Facing::Rear),
            other => Err(CaptureError::configuration(format!(
                "unknown facing '{other}' (expected 'front' or 'rear')"
            ))),
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera backend {backend} is not supported in this build")]
    Unsupported { backend: &'static str },

    #[error("camera device unavailable ({backend}): {message}")]
    DeviceUnavailable {
        backend: &'static str,
        message: String,
    },

    #[error("no active camera stream")]
    NoActiveStream,

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("invalid frame: {reason}")]
    InvalidFrame { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptureError {
    pub fn unsupported(backend: &'static str) -> Self {
        Self::Unsupported { backend }
    }

    pub fn device_unavailable(backend: &'static str, message: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            backend,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn invalid_frame(reason: impl Into<String>) -> Self {
        Self::InvalidFrame {
            reason: reason.into(),
        }
    }
}
