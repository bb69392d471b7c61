//! Headless scene editor
//!
//! Builds the startup scene, optionally opens a scene file through the
//! window request queue, runs a few frames, saves and shuts down the same
//! way the interactive editor does.
//!
//! ```text
//! scene_editor_headless [SCENE_FILE] [--frames N] [--save PATH]
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{value_parser, Arg, ArgMatches, Command};
use scene_editor::foundation::logging;
use scene_editor::prelude::*;

/// Editor settings file looked up in the working directory
const CONFIG_FILE: &str = "editor.toml";

/// Frames run while closing before giving up on the window
const MAX_SHUTDOWN_FRAMES: usize = 64;

const DEFAULT_FRAMES: usize = 3;

#[derive(thiserror::Error, Debug)]
enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

#[derive(Debug)]
struct Args {
    open: Option<PathBuf>,
    save: Option<PathBuf>,
    frames: usize,
}

impl Args {
    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            open: matches.get_one::<PathBuf>("scene").cloned(),
            save: matches.get_one::<PathBuf>("save").cloned(),
            frames: matches.get_one::<usize>("frames").copied().unwrap_or(DEFAULT_FRAMES),
        }
    }
}

fn cli() -> Command {
    Command::new("scene_editor_headless")
        .about("Runs the scene editor without a window: builds the startup scene, runs frames, saves and shuts down")
        .arg(
            Arg::new("scene")
                .value_name("SCENE_FILE")
                .help("Scene file to open after startup")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("frames")
                .short('f')
                .long("frames")
                .value_name("N")
                .help("Frames to run before saving")
                .value_parser(value_parser!(usize))
                .default_value("3"),
        )
        .arg(
            Arg::new("save")
                .short('s')
                .long("save")
                .value_name("PATH")
                .help("Where to save the scene (defaults to the configured scene directory)")
                .value_parser(value_parser!(PathBuf)),
        )
}

fn run(args: Args) -> Result<(), AppError> {
    let config = EditorConfig::load_or_default(CONFIG_FILE)?;
    logging::init_with_level(&config.log_level);
    log::info!("Starting headless scene editor");

    let engine = Engine::new(
        &config,
        Arc::new(RonSceneSerializer::new()),
        Box::new(RecordingRenderer::default()),
    )?;
    let mut window = EditorWindow::new(engine, &config);
    window.editor().populate_default_scene()?;

    if let Some(path) = &args.open {
        window.request_open_file(path);
    }

    for _ in 0..args.frames {
        let report = window.frame()?;
        log::debug!(
            "Frame {}: {:?}, {} recomputed, {} rendered",
            report.frame,
            report.step,
            report.recomputed,
            report.rendered
        );
    }

    let save_path = args.save.unwrap_or_else(|| window.default_save_path());
    let save = window.save_scene(&save_path)?;
    log::info!("{}", save.message().unwrap_or_default());

    window.request_close();
    let mut frames = 0;
    while window.is_open() && frames < MAX_SHUTDOWN_FRAMES {
        window.frame()?;
        frames += 1;
    }

    for line in window.status().lines() {
        println!("{line}");
    }
    log::info!("Scene editor shut down after {} frames", window.engine().frame_count());
    Ok(())
}

fn main() -> Result<(), AppError> {
    let args = Args::from_matches(&cli().get_matches());
    run(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Args, clap::Error> {
        cli().try_get_matches_from(argv).map(|m| Args::from_matches(&m))
    }

    #[test]
    fn test_cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["scene_editor_headless"]).unwrap();
        assert_eq!(args.open, None);
        assert_eq!(args.save, None);
        assert_eq!(args.frames, DEFAULT_FRAMES);
    }

    #[test]
    fn test_all_arguments() {
        let args = parse(&["scene_editor_headless", "in.ron", "--frames", "10", "--save", "out/scene.ron"]).unwrap();
        assert_eq!(args.open, Some(PathBuf::from("in.ron")));
        assert_eq!(args.save, Some(PathBuf::from("out/scene.ron")));
        assert_eq!(args.frames, 10);
    }

    #[test]
    fn test_bad_frame_count_rejected() {
        assert!(parse(&["scene_editor_headless", "--frames", "many"]).is_err());
        assert!(parse(&["scene_editor_headless", "--bogus"]).is_err());
    }
}
