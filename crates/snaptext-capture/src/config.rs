use std::env;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

use snaptext_types::{CaptureError, CaptureResult, Facing};

use crate::core::DynFrameProvider;

pub const ENV_BACKEND: &str = "SNAPTEXT_BACKEND";
pub const ENV_FRONT_INDEX: &str = "SNAPTEXT_FRONT_INDEX";
pub const ENV_REAR_INDEX: &str = "SNAPTEXT_REAR_INDEX";
pub const ENV_CHANNEL_CAPACITY: &str = "SNAPTEXT_CHANNEL_CAPACITY";

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(5);

/// Capture backends this build knows about. Only backends compiled in
/// via cargo features can actually be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Real camera devices through nokhwa.
    Nokhwa,
    /// Generated frames, no hardware required.
    Synthetic,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Nokhwa => "nokhwa",
            Backend::Synthetic => "synthetic",
        }
    }

    pub fn is_compiled(&self) -> bool {
        match self {
            Backend::Nokhwa => cfg!(feature = "backend-nokhwa"),
            Backend::Synthetic => cfg!(feature = "backend-synthetic"),
        }
    }
}

impl FromStr for Backend {
    type Err = CaptureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nokhwa" | "camera" => Ok(Backend::Nokhwa),
            "synthetic" | "test" => Ok(Backend::Synthetic),
            other => Err(CaptureError::configuration(format!(
                "unknown capture backend: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backends available in this build, in preference order.
pub fn compiled_backends() -> Vec<Backend> {
    let mut backends = Vec::new();
    if cfg!(feature = "backend-nokhwa") {
        backends.push(Backend::Nokhwa);
    }
    if cfg!(feature = "backend-synthetic") {
        backends.push(Backend::Synthetic);
    }
    backends
}

/// Capture configuration. Values come from defaults overlaid with the
/// `SNAPTEXT_*` environment variables; callers may adjust fields before
/// handing the configuration to a [`CaptureSource`](crate::CaptureSource).
#[derive(Debug, Clone)]
pub struct Configuration {
    pub backend: Backend,
    /// Device index used when the front camera is requested.
    pub front_index: u32,
    /// Device index used when the rear camera is requested.
    pub rear_index: u32,
    /// Requested frame width. Devices may negotiate a different size.
    pub width: u32,
    /// Requested frame height.
    pub height: u32,
    /// Frame channel capacity between the device thread and the stream.
    pub channel_capacity: Option<NonZeroUsize>,
    /// How long `start` waits for the first frame before giving up.
    pub start_timeout: Duration,
}

impl Default for Configuration {
    fn default() -> Self {
        let backend = compiled_backends()
            .into_iter()
            .next()
            .unwrap_or(Backend::Synthetic);
        Configuration {
            backend,
            front_index: 1,
            rear_index: 0,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            channel_capacity: None,
            start_timeout: DEFAULT_START_TIMEOUT,
        }
    }
}

impl Configuration {
    /// Defaults overlaid with any `SNAPTEXT_*` environment variables.
    pub fn from_env() -> CaptureResult<Self> {
        let mut config = Configuration::default();
        if let Some(value) = read_env(ENV_BACKEND) {
            config.backend = value.parse()?;
        }
        if let Some(value) = read_env(ENV_FRONT_INDEX) {
            config.front_index = parse_env(ENV_FRONT_INDEX, &value)?;
        }
        if let Some(value) = read_env(ENV_REAR_INDEX) {
            config.rear_index = parse_env(ENV_REAR_INDEX, &value)?;
        }
        if let Some(value) = read_env(ENV_CHANNEL_CAPACITY) {
            let capacity: usize = parse_env(ENV_CHANNEL_CAPACITY, &value)?;
            config.channel_capacity = NonZeroUsize::new(capacity);
        }
        Ok(config)
    }

    pub fn device_index(&self, facing: Facing) -> u32 {
        match facing {
            Facing::Front => self.front_index,
            Facing::Rear => self.rear_index,
        }
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity.map(NonZeroUsize::get).unwrap_or(4)
    }

    /// Create a provider for the configured backend, pointed at the
    /// device that serves `facing`. Backends not compiled into this
    /// build report [`CaptureError::Unsupported`].
    pub fn create_provider(&self, facing: Facing) -> CaptureResult<DynFrameProvider> {
        match self.backend {
            #[cfg(feature = "backend-nokhwa")]
            Backend::Nokhwa => Ok(crate::backends::camera::boxed(self, facing)),
            #[cfg(feature = "backend-synthetic")]
            Backend::Synthetic => Ok(crate::backends::synthetic::boxed(self, facing)),
            #[allow(unreachable_patterns)]
            backend => Err(CaptureError::unsupported(backend.as_str())),
        }
    }
}

fn read_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T>(name: &str, value: &str) -> CaptureResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|err| {
        CaptureError::configuration(format!("invalid value for {name}: {err}"))
    })
}
