//! Camera capture backends behind a single async source.
//!
//! A [`CaptureSource`] owns one live stream at a time and exposes the
//! most recent frame through [`CaptureSource::snapshot`]. Backends are
//! selected by cargo feature and at runtime through
//! [`Configuration`]; the synthetic backend keeps development and CI
//! independent of camera hardware.

pub mod backends;
pub mod config;
pub mod core;
pub mod source;

pub use config::{Backend, Configuration, compiled_backends};
pub use core::{DynFrameProvider, FrameProvider, FrameStream, spawn_stream_from_channel};
pub use snaptext_types::{CaptureError, CaptureResult, Facing, RgbaFrame};
pub use source::CaptureSource;
