//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use contracts::MediaManifest;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::runner::{RunConfig, Runner};

/// Execute the `run` command
pub async fn run_session(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading manifest");

    if !args.config.exists() {
        return Err(CliError::manifest_not_found(args.config.display().to_string()).into());
    }

    let manifest = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load manifest from {}", args.config.display()))?;

    let video_id = match &args.video {
        Some(id) => id.clone(),
        None => manifest
            .videos
            .first()
            .map(|v| v.id.to_string())
            .ok_or(CliError::EmptyManifest)?,
    };

    check_args(args)?;

    info!(
        videos = manifest.videos.len(),
        overlays = manifest.overlay_count(),
        video = %video_id,
        fps = manifest.playback.frame_rate,
        "Manifest loaded"
    );

    if args.dry_run {
        info!("Dry run mode - manifest is valid, exiting");
        print_run_summary(&manifest, &video_id, args);
        return Ok(());
    }

    let display_hz = args.display_hz.unwrap_or(manifest.playback.display_hz);
    let run_config = RunConfig {
        manifest,
        video_id,
        overlay_ids: args.overlays.clone(),
        age_group: args.age_group.clone(),
        rate: args.rate,
        duration_s: args.duration,
        seeks: args.seeks.clone(),
        step_frames: args.step,
        speed: args.speed,
        display_hz,
        media_duration_s: args.media_duration,
        overlay_skew: args.overlay_skew,
        load_delay_s: args.load_delay,
        looping: args.looping,
        fail_load: args.fail_load.clone(),
        reject_play: args.reject_play.clone(),
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    let runner = Runner::new(run_config);
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting playback...");

    tokio::select! {
        result = runner.run() => {
            match result {
                Ok(stats) => {
                    info!(
                        ticks = stats.ticks,
                        corrections = stats.corrections,
                        duration_secs = stats.duration.as_secs_f64(),
                        "Playback completed successfully"
                    );

                    stats.print_summary();
                }
                Err(e) => {
                    return Err(e).context("Playback run failed");
                }
            }
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping playback...");
        }
    }

    info!("Overlay Sync finished");
    Ok(())
}

/// Reject argument values the runner cannot drive
fn check_args(args: &RunArgs) -> std::result::Result<(), CliError> {
    if !(args.rate.is_finite() && args.rate > 0.0) {
        return Err(CliError::invalid_arguments(format!(
            "--rate must be > 0, got {}",
            args.rate
        )));
    }
    if !(args.speed.is_finite() && args.speed > 0.0) {
        return Err(CliError::invalid_arguments(format!(
            "--speed must be > 0, got {}",
            args.speed
        )));
    }
    if !(args.duration.is_finite() && args.duration >= 0.0) {
        return Err(CliError::invalid_arguments(format!(
            "--duration must be >= 0, got {}",
            args.duration
        )));
    }
    if !(args.media_duration.is_finite() && args.media_duration > 0.0) {
        return Err(CliError::invalid_arguments(format!(
            "--media-duration must be > 0, got {}",
            args.media_duration
        )));
    }
    if args.display_hz == Some(0) {
        return Err(CliError::invalid_arguments("--display-hz must be > 0"));
    }
    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
///
/// A handler that cannot be installed never resolves.
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print run summary for dry-run mode
fn print_run_summary(manifest: &MediaManifest, video_id: &str, args: &RunArgs) {
    println!("\n=== Run Summary ===\n");
    println!("Playback:");
    println!("  Frame rate: {} fps", manifest.playback.frame_rate);
    println!("  Drift threshold: {:.3} s", manifest.playback.drift_threshold_s);
    println!("  Rate: {}x", args.rate);
    println!("  Duration: {:.2} s at {}x speed", args.duration, args.speed);

    match manifest.video(video_id) {
        Some(video) => {
            println!("\nVideo: {} ({})", video.id, video.title);
            let overlays: Vec<&str> = if args.overlays.is_empty() {
                video
                    .overlays
                    .iter()
                    .filter(|o| match &args.age_group {
                        Some(group) => o.age_group.as_deref() == Some(group.as_str()),
                        None => true,
                    })
                    .map(|o| o.id.as_str())
                    .collect()
            } else {
                args.overlays.iter().map(String::as_str).collect()
            };
            println!("\nOverlays ({}):", overlays.len());
            for id in overlays {
                let known = video.overlay(id).is_some();
                println!("  - {}{}", id, if known { "" } else { " (unknown)" });
            }
        }
        None => println!("\nVideo: {} (not in manifest)", video_id),
    }

    if !args.seeks.is_empty() {
        println!("\nSeeks: {:?}", args.seeks);
    }
    if !args.fail_load.is_empty() || !args.reject_play.is_empty() {
        println!("\nInjected failures:");
        for id in &args.fail_load {
            println!("  - {} (load)", id);
        }
        for id in &args.reject_play {
            println!("  - {} (play)", id);
        }
    }

    println!();
}
