//! Capture or import a single image, crop and rotate it, and read its
//! text with OCR.
//!
//! The binary is a thin shell over [`pipeline::PipelineController`];
//! the library surface exists so integration tests and other frontends
//! can drive the same pipeline.

pub mod cli;
pub mod crop;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod settings;
pub mod store;

pub use crop::CropStage;
pub use error::{CropError, PipelineError, StoreError};
pub use pipeline::{PipelineController, PipelineState, RecognitionTask};
pub use store::{BlobStore, FsBlobStore, ImageStore, MemoryBlobStore};
