#[cfg(feature = "backend-nokhwa")]
pub mod camera;
#[cfg(feature = "backend-synthetic")]
pub mod synthetic;
