use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand, ValueEnum};
use snaptext_types::CropRect;

pub const DEFAULT_WARMUP_FRAMES: u32 = 3;
pub const DEFAULT_LANGUAGE: &str = "eng";

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default, ValueEnum)]
pub enum EngineKind {
    #[default]
    Auto,
    Tesseract,
    Noop,
}

/// Which values the user supplied explicitly on the command line, as
/// opposed to clap defaults. Merging needs the distinction: a config
/// file beats a clap default but loses to a real CLI value.
#[derive(Debug, Default)]
pub struct CliSources {
    pub warmup_frames_from_cli: bool,
    pub language_from_cli: bool,
    pub engine_from_cli: bool,
}

impl CliSources {
    fn from_matches(matches: &ArgMatches) -> Self {
        let mut sources = CliSources::default();
        // value_source panics on ids a subcommand does not define, so
        // only the matching subcommand's ids are queried.
        match matches.subcommand() {
            Some(("capture", sub)) => {
                sources.warmup_frames_from_cli = value_from_cli(sub, "warmup_frames");
            }
            Some(("ocr", sub)) => {
                sources.language_from_cli = value_from_cli(sub, "language");
                sources.engine_from_cli = value_from_cli(sub, "engine");
            }
            _ => {}
        }
        sources
    }
}

fn value_from_cli(matches: &ArgMatches, id: &str) -> bool {
    matches
        .value_source(id)
        .is_some_and(|source| matches!(source, ValueSource::CommandLine))
}

pub fn parse_cli() -> (CliArgs, CliSources) {
    let command = CliArgs::command();
    let matches = command.get_matches();
    let args = match CliArgs::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(err) => err.exit(),
    };
    let sources = CliSources::from_matches(&matches);
    (args, sources)
}

#[derive(Debug, Parser)]
#[command(
    name = "snaptext",
    about = "Capture or import an image, crop it, and read its text",
    disable_help_subcommand = true
)]
pub struct CliArgs {
    /// Override the configuration file path
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Directory for the persisted image (defaults to the user data dir)
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Grab one frame from the camera and make it the current image
    Capture {
        /// Camera to bind: front or rear
        #[arg(long = "facing")]
        facing: Option<String>,

        /// Lock capture to a specific backend implementation
        #[arg(short = 'b', long = "backend")]
        backend: Option<String>,

        /// Frames to discard before grabbing so exposure can settle
        #[arg(long = "warmup-frames", default_value_t = DEFAULT_WARMUP_FRAMES)]
        warmup_frames: u32,
    },

    /// Load an image file (PNG, JPEG, WebP) as the current image
    Import {
        /// Image file to load
        file: PathBuf,
    },

    /// Recognize text on the current image and print it
    Ocr {
        /// Crop region in source-image coordinates
        #[arg(long = "region", value_name = "X,Y,WxH", value_parser = parse_region)]
        region: Option<CropRect>,

        /// Rotate by the given degrees before recognizing (repeatable)
        #[arg(long = "rotate", value_name = "DEGREES", allow_negative_numbers = true)]
        rotate: Vec<i32>,

        /// Language the recognizer should expect
        #[arg(long = "language", default_value = DEFAULT_LANGUAGE)]
        language: String,

        /// Preferred OCR engine
        #[arg(long = "engine", value_enum, default_value_t = EngineKind::Auto)]
        engine: EngineKind,

        /// Also write the recognized text to this file
        #[arg(long = "output", value_name = "FILE")]
        output: Option<PathBuf>,

        /// Suppress the progress bar
        #[arg(short = 'q', long = "quiet")]
        quiet: bool,
    },

    /// Show the pipeline state and stored parameters
    Status,

    /// Clear the current image and its persisted copy
    Delete,

    /// Print the list of available capture backends
    Backends,
}

/// Accepts `X,Y,WxH` and `X,Y,W,H`.
fn parse_region(raw: &str) -> Result<CropRect, String> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let fields: Vec<&str> = match parts.as_slice() {
        [x, y, size] => {
            let (width, height) = size
                .split_once(['x', 'X'])
                .ok_or_else(|| format!("expected X,Y,WxH or X,Y,W,H, got '{raw}'"))?;
            vec![x, y, width.trim(), height.trim()]
        }
        [x, y, width, height] => vec![x, y, width, height],
        _ => return Err(format!("expected X,Y,WxH or X,Y,W,H, got '{raw}'")),
    };
    let mut values = [0u32; 4];
    for (slot, field) in values.iter_mut().zip(&fields) {
        *slot = field
            .parse()
            .map_err(|_| format!("'{field}' is not a non-negative integer"))?;
    }
    Ok(CropRect::new(values[0], values[1], values[2], values[3]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_accepts_the_compact_form() {
        assert_eq!(
            parse_region("10,20,300x200").unwrap(),
            CropRect::new(10, 20, 300, 200)
        );
        assert_eq!(
            parse_region("0, 0, 64X48").unwrap(),
            CropRect::new(0, 0, 64, 48)
        );
    }

    #[test]
    fn region_accepts_four_comma_fields() {
        assert_eq!(
            parse_region("10,20,300,200").unwrap(),
            CropRect::new(10, 20, 300, 200)
        );
    }

    #[test]
    fn region_rejects_malformed_input() {
        assert!(parse_region("10,20").is_err());
        assert!(parse_region("10,20,300").is_err());
        assert!(parse_region("a,b,cxd").is_err());
        assert!(parse_region("10,20,-3x200").is_err());
    }

    #[test]
    fn command_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }
}
