#[cfg(feature = "engine-tesseract")]
pub mod tesseract;
