use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use directories::{BaseDirs, ProjectDirs};
use serde::Deserialize;
use snaptext_types::Facing;

use crate::cli::{CliArgs, CliSources, Command, DEFAULT_LANGUAGE, DEFAULT_WARMUP_FRAMES, EngineKind};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    backend: Option<String>,
    facing: Option<String>,
    warmup_frames: Option<u32>,
    language: Option<String>,
    engine: Option<String>,
    data_dir: Option<String>,
}

/// Merged view of CLI arguments and the config file, CLI winning.
#[derive(Debug)]
pub struct EffectiveSettings {
    pub backend: Option<String>,
    pub facing: Facing,
    pub warmup_frames: u32,
    pub language: String,
    pub engine: EngineKind,
    pub data_dir: Option<PathBuf>,
}

const PROJECT_CONFIG_FILE: &str = "snaptext.toml";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    InvalidValue {
        path: Option<PathBuf>,
        field: &'static str,
        value: String,
    },
    NotFound {
        path: PathBuf,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "failed to parse config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::InvalidValue { path, field, value } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "invalid value '{}' for '{}' in {}",
                        value,
                        field,
                        path.display()
                    )
                } else {
                    write!(f, "invalid value '{}' for '{}'", value, field)
                }
            }
            ConfigError::NotFound { path } => {
                write!(f, "config file {} does not exist", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::InvalidValue { .. } => None,
            ConfigError::NotFound { .. } => None,
        }
    }
}

pub fn resolve_settings(
    cli: &CliArgs,
    sources: &CliSources,
) -> Result<EffectiveSettings, ConfigError> {
    let (file, config_path) = load_config(cli.config.as_deref())?;
    merge(cli, sources, file, config_path)
}

fn load_config(path_override: Option<&Path>) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    if let Some(path) = path_override {
        let path = path.to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }
        let config = read_config(&path)?;
        return Ok((config, Some(path)));
    }

    if let Some(project_path) = project_config_path() {
        if project_path.exists() {
            let config = read_config(&project_path)?;
            return Ok((config, Some(project_path)));
        }
    }

    let Some(default_path) = default_config_path() else {
        return Ok((FileConfig::default(), None));
    };
    if !default_path.exists() {
        return Ok((FileConfig::default(), None));
    }
    let config = read_config(&default_path)?;
    Ok((config, Some(default_path)))
}

fn read_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn merge(
    cli: &CliArgs,
    sources: &CliSources,
    file: FileConfig,
    config_path: Option<PathBuf>,
) -> Result<EffectiveSettings, ConfigError> {
    let config_dir = config_path
        .as_ref()
        .and_then(|path| path.parent().map(|dir| dir.to_path_buf()));

    let FileConfig {
        backend: file_backend,
        facing: file_facing,
        warmup_frames: file_warmup_frames,
        language: file_language,
        engine: file_engine,
        data_dir: file_data_dir,
    } = file;

    let (cli_facing, cli_backend, cli_warmup_frames) = match &cli.command {
        Command::Capture {
            facing,
            backend,
            warmup_frames,
        } => (facing.clone(), backend.clone(), Some(*warmup_frames)),
        _ => (None, None, None),
    };
    let (cli_language, cli_engine) = match &cli.command {
        Command::Ocr {
            language, engine, ..
        } => (Some(language.clone()), Some(*engine)),
        _ => (None, None),
    };

    let mut backend = normalize_string(cli_backend);
    if backend.is_none() {
        backend = normalize_string(file_backend);
    }

    let facing = if let Some(value) = normalize_string(cli_facing) {
        parse_facing(&value, None)?
    } else if let Some(value) = normalize_string(file_facing) {
        parse_facing(&value, config_path.as_ref())?
    } else {
        Facing::default()
    };

    let mut warmup_frames = cli_warmup_frames.unwrap_or(DEFAULT_WARMUP_FRAMES);
    if !sources.warmup_frames_from_cli {
        if let Some(value) = file_warmup_frames {
            warmup_frames = value;
        }
    }

    let mut language = cli_language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
    if !sources.language_from_cli {
        if let Some(value) = normalize_string(file_language) {
            language = value;
        }
    }
    if language.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            path: None,
            field: "language",
            value: language,
        });
    }

    let mut engine = cli_engine.unwrap_or_default();
    if !sources.engine_from_cli {
        if let Some(value) = normalize_string(file_engine) {
            engine = parse_engine_kind(&value, config_path.as_ref())?;
        }
    }

    let data_dir = if let Some(dir) = cli.data_dir.clone() {
        Some(expand_pathbuf(dir))
    } else {
        normalize_string(file_data_dir)
            .and_then(|value| resolve_path_from_config(value, config_dir.as_deref()))
    };

    Ok(EffectiveSettings {
        backend,
        facing,
        warmup_frames,
        language,
        engine,
        data_dir,
    })
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("rs", "snaptext", "snaptext")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    env::current_dir()
        .ok()
        .map(|dir| dir.join(PROJECT_CONFIG_FILE))
}

fn normalize_string(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn expand_pathbuf(path: PathBuf) -> PathBuf {
    match path.to_str() {
        Some(s) => expand_home_path(s),
        None => path,
    }
}

fn resolve_path_from_config(value: String, base: Option<&Path>) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let expanded = expand_home_path(trimmed);
    if expanded.is_absolute() || base.is_none() {
        Some(expanded)
    } else {
        Some(base.unwrap().join(expanded))
    }
}

fn expand_home_path(value: &str) -> PathBuf {
    if value == "~" {
        if let Some(base) = BaseDirs::new() {
            return base.home_dir().to_path_buf();
        }
    } else if let Some(stripped) = value.strip_prefix("~/") {
        if let Some(base) = BaseDirs::new() {
            return base.home_dir().join(stripped);
        }
    }
    PathBuf::from(value)
}

fn parse_facing(value: &str, path: Option<&PathBuf>) -> Result<Facing, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        path: path.cloned(),
        field: "facing",
        value: value.to_string(),
    })
}

fn parse_engine_kind(value: &str, path: Option<&PathBuf>) -> Result<EngineKind, ConfigError> {
    EngineKind::from_str(value, false).map_err(|_| ConfigError::InvalidValue {
        path: path.cloned(),
        field: "engine",
        value: value.to_string(),
    })
}
