use std::sync::Arc;

use anyhow::Result;
use renderer::{RenderParameters, RenderPolicy, Renderer, RendererConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, RunArgs};
use crate::paths::AppPaths;
use crate::watch::{initial_settings, SettingsPoller, SettingsWatcher};
use crate::{color, settings};

pub fn dispatch(cli: Cli) -> Result<()> {
    initialise_tracing();
    let paths = AppPaths::discover()?;
    tracing::debug!(config = %paths.config_dir().display(), "resolved lineswall paths");

    match cli.command {
        None => run(&cli.run, &paths),
        Some(Command::Run(args)) => run(&args, &paths),
        Some(Command::Settings(command)) => {
            let path = paths.resolve_settings(command.file.as_deref());
            settings::run(&command.action, &path)
        }
        Some(Command::Color(args)) => {
            let path = paths.resolve_settings(args.file.as_deref());
            color::run(&args, &path)
        }
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &RunArgs, paths: &AppPaths) -> Result<()> {
    let settings_path = paths.resolve_settings(args.settings.as_deref());
    let mut poller = SettingsPoller::new(settings_path.clone());
    let initial = initial_settings(&mut poller);
    tracing::info!(
        path = %settings_path.display(),
        blur = initial.blur,
        speed = initial.speed,
        "loaded wallpaper settings"
    );

    let params = Arc::new(RenderParameters::from_settings(&initial));
    let watcher = SettingsWatcher::spawn(poller, Arc::clone(&params), args.poll_interval)?;

    let config = renderer_config(args);
    tracing::info!(policy = ?config.policy, seed = ?config.line_seed, "starting lines preview");
    let mut renderer = Renderer::new(config, params);
    let result = renderer.run();

    watcher.shutdown()?;
    result
}

fn renderer_config(args: &RunArgs) -> RendererConfig {
    let policy = match args.still_time {
        Some(time_millis) => RenderPolicy::Still { time_millis },
        None => RenderPolicy::Animate {
            target_fps: args.fps.filter(|fps| *fps > 0.0),
        },
    };
    let defaults = RendererConfig::default();
    RendererConfig {
        surface_size: args.size.unwrap_or(defaults.surface_size),
        line_seed: args.seed,
        policy,
        low_power: !args.high_performance,
        ..defaults
    }
}
