//! `OpenSkyNet` - sliding-window object detection over georeferenced imagery.
//!
//! A run cuts a region of a local raster or a web tile service into windows,
//! classifies every window with an ONNX model, and writes the confident
//! windows as geo-referenced point or polygon features.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod geo;
pub mod inference;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod source;
pub mod window;

use clap::Parser;
use cli::{Cli, Command, ConfigAction, RunArgs};
use config::{
    Action, Config, InputSpec, Settings, config_file_path, load_layered, resolve_settings,
    save_default_config,
};
use constants::DEFAULT_TOP_K;
use inference::{InferenceClient, OnnxClassifier};
use logging::LogContext;
use pipeline::Orchestrator;
use source::{HttpTileService, ImageFileRaster, ImageSource, LocalImage, TiledImage};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{info, warn};

pub use error::{Error, Result};

/// Main entry point for the openskynet CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Detect(args) => run_action(Action::Detect, &args),
        Command::Landcover(args) => run_action(Action::Landcover, &args),
        Command::Config { action } => handle_config_command(action),
    }
}

fn run_action(action: Action, args: &RunArgs) -> Result<()> {
    let file_config = load_layered(&args.config)?;
    let resolved = resolve_settings(action, args, &file_config)?;

    let logging = LogContext::init(&resolved.settings.log)?;
    let result = logging.in_scope(|| {
        for warning in &resolved.warnings {
            warn!("{warning}");
        }
        execute(&resolved.settings, &logging)
    });
    let shutdown = logging.shutdown();
    result?;
    shutdown
}

fn execute(settings: &Settings, logging: &LogContext) -> Result<()> {
    info!("Starting {}", settings.action);

    let source = open_source(settings)?;
    let classifier = OnnxClassifier::new(
        &settings.model,
        &settings.labels,
        settings.run.device,
        DEFAULT_TOP_K,
    )?;
    let run = settings.run_config(classifier.input_size());
    info!("Window size: {}", run.window_size);

    let mut orchestrator = Orchestrator::new(run, source, Box::new(classifier), logging)?;

    let cancel = orchestrator.cancel_token();
    if let Err(e) = ctrlc::set_handler(move || cancel.store(true, Ordering::SeqCst)) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }

    let mut sink = output::create_sink(settings.format, &settings.output, &settings.layer);
    let summary = orchestrator.run(sink.as_mut())?;

    info!(
        "Wrote {} features ({} candidates from {} windows) to {} in {:.1}s",
        summary.features,
        summary.candidates,
        summary.windows,
        settings.output.display(),
        summary.elapsed.as_secs_f64()
    );
    Ok(())
}

fn open_source(settings: &Settings) -> Result<ImageSource> {
    match &settings.input {
        InputSpec::Image(path) => {
            info!("Opening image: {}", path.display());
            let raster = ImageFileRaster::open(path)?;
            Ok(ImageSource::Local(LocalImage::open(Box::new(raster))?))
        }
        InputSpec::TileService { url, zoom } => {
            let bbox = settings.run.bbox.ok_or_else(|| {
                Error::config("a tile service requires a bounding box")
            })?;
            info!("Opening tile service at zoom {zoom}: {url}");
            let service = HttpTileService::new(url, settings.run.max_downloads)?;
            Ok(ImageSource::WebTiled(TiledImage::open(
                Arc::new(service),
                &bbox,
                *zoom,
            )?))
        }
    }
}

#[allow(clippy::print_stdout)]
fn handle_config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let path = config_file_path()?;
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                let saved_path = save_default_config(&Config::template())?;
                println!("Created configuration file: {}", saved_path.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_layered(&[])?;
            let contents = toml::to_string_pretty(&config)
                .map_err(|e| Error::ConfigSerialize { source: e })?;
            println!("{contents}");
            Ok(())
        }
        ConfigAction::Path => {
            let path = config_file_path()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}
