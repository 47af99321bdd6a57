mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use cli::Cli;
use wavecast::config::{self, derive_output_path, VisualizationConfig};
use wavecast::Renderer;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Config file values apply only where no CLI flag was given
    let options = config::merge_config_file(cli.options(), cli.config.as_deref())?;

    let config = VisualizationConfig::from_options(&options)?;

    log::info!("wavecast - audio visualizer video generator");
    log::info!("Using {} worker threads", config.worker_count);

    if let Some(frame_index) = cli.preview_frame {
        let png = cli
            .output
            .clone()
            .unwrap_or_else(|| derive_output_path(&cli.input, config.style))
            .with_extension("png");
        Renderer::new(config).preview(&cli.input, frame_index, &png)?;
        return Ok(());
    }

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );

    let outcome = Renderer::new(config)
        .with_progress(pb)
        .run(&cli.input, cli.output.as_deref())?;

    log::info!(
        "Done! Output: {} ({} frames, {}x{} @ {}fps, {:.1}s)",
        outcome.output.display(),
        outcome.frames_written,
        outcome.width,
        outcome.height,
        outcome.fps,
        outcome.duration_seconds
    );
    Ok(())
}
