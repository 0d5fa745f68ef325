use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use log::{debug, warn};
use snaptext::cli::{self, Command};
use snaptext::engine::build_engine;
use snaptext::error::PipelineError;
use snaptext::pipeline::PipelineController;
use snaptext::progress::recognition_progress;
use snaptext::settings::{EffectiveSettings, resolve_settings};
use snaptext::store::{BlobStore, FsBlobStore, ImageStore};
use snaptext_capture::{Backend, CaptureSource, Configuration, compiled_backends};
use snaptext_types::CaptureError;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), PipelineError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let (args, sources) = cli::parse_cli();
    let settings = resolve_settings(&args, &sources)?;

    if matches!(args.command, Command::Backends) {
        print_backends();
        return Ok(());
    }

    run_command(args.command, settings).await
}

async fn run_command(command: Command, settings: EffectiveSettings) -> Result<(), PipelineError> {
    let blobs = open_blob_store(settings.data_dir.clone());
    let store = ImageStore::open(blobs)?;
    let config = capture_configuration(&settings)?;
    let engine = build_engine(settings.engine)?;
    let mut controller = PipelineController::new(CaptureSource::new(config), store, engine);

    match command {
        Command::Capture { .. } => {
            controller.start_camera(settings.facing).await?;
            let id = controller.capture_frame(settings.warmup_frames).await?;
            controller.stop_camera();
            if let Some((_, frame)) = controller.current_image() {
                println!("captured image {id} ({}x{})", frame.width(), frame.height());
            }
            Ok(())
        }
        Command::Import { file } => {
            let id = controller.import_file(&file).await?;
            if let Some((_, frame)) = controller.current_image() {
                println!(
                    "imported {} as image {id} ({}x{})",
                    file.display(),
                    frame.width(),
                    frame.height()
                );
            }
            Ok(())
        }
        Command::Ocr {
            region,
            rotate,
            output,
            quiet,
            ..
        } => {
            if let Some(region) = region {
                let stored = controller.set_region(region)?;
                debug!("crop region set to {stored}");
            }
            for delta in rotate {
                controller.rotate(delta)?;
            }

            let (callback, reporter) = if quiet {
                (None, None)
            } else {
                let (callback, reporter) = recognition_progress();
                (Some(callback), Some(reporter))
            };
            let outcome = controller.recognize(&settings.language, callback).await;
            if let Some(reporter) = reporter {
                reporter.finish().await;
            }

            match outcome? {
                Some(response) => {
                    if let Some(path) = output {
                        tokio::fs::write(&path, response.text.as_bytes()).await?;
                        debug!("wrote recognized text to {}", path.display());
                    }
                    if response.is_empty() {
                        eprintln!("no text detected");
                    } else {
                        println!("{}", response.text);
                    }
                    if let Some(confidence) = response.confidence {
                        debug!("mean word confidence {confidence:.1}");
                    }
                }
                None => eprintln!("recognition superseded by a newer image"),
            }
            Ok(())
        }
        Command::Status => {
            print_status(&controller);
            Ok(())
        }
        Command::Delete => {
            controller.delete()?;
            println!("image deleted");
            Ok(())
        }
        // Handled in main before the pipeline is built.
        Command::Backends => Ok(()),
    }
}

fn capture_configuration(settings: &EffectiveSettings) -> Result<Configuration, PipelineError> {
    let mut config = Configuration::from_env()?;
    if let Some(name) = settings.backend.as_deref() {
        config.backend = Backend::from_str(name)?;
    }
    if !config.backend.is_compiled() {
        return Err(CaptureError::unsupported(config.backend.as_str()).into());
    }
    Ok(config)
}

fn open_blob_store(data_dir: Option<PathBuf>) -> Arc<dyn BlobStore> {
    if let Some(dir) = data_dir {
        return Arc::new(FsBlobStore::new(dir));
    }
    match FsBlobStore::user_default() {
        Some(store) => Arc::new(store),
        None => {
            warn!("no user data directory found; storing the image under .snaptext");
            Arc::new(FsBlobStore::new(".snaptext"))
        }
    }
}

fn print_status(controller: &PipelineController) {
    println!("state: {}", controller.state());
    let Some((id, frame)) = controller.current_image() else {
        return;
    };
    println!("image: {id} ({}x{})", frame.width(), frame.height());
    if let Some(region) = controller.region() {
        println!("crop: {region}");
    }
    println!("rotation: {} deg", controller.rotation_degrees());
    if let Some(text) = controller.recognized_text() {
        println!("text: {text}");
    }
}

fn print_backends() {
    let names: Vec<&'static str> = compiled_backends().iter().map(Backend::as_str).collect();
    if names.is_empty() {
        println!("available backends: (none compiled)");
    } else {
        println!("available backends: {}", names.join(", "));
    }
}
