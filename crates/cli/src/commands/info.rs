//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{MediaManifest, OverlayEntry, VideoEntry};

use crate::cli::InfoArgs;

/// Manifest info for JSON output
#[derive(Serialize)]
struct ManifestInfo {
    version: String,
    playback: PlaybackInfo,
    videos: Vec<VideoInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    age_groups: Vec<String>,
}

#[derive(Serialize)]
struct PlaybackInfo {
    frame_rate: u32,
    drift_threshold_s: f64,
    autoplay_on_select: bool,
    display_hz: u32,
}

#[derive(Serialize)]
struct VideoInfo {
    id: String,
    title: String,
    video_path: String,
    overlay_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    overlays: Vec<OverlayInfo>,
}

#[derive(Serialize)]
struct OverlayInfo {
    id: String,
    label: String,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    age_group: Option<String>,
    opacity: f32,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading manifest info");

    if !args.config.exists() {
        anyhow::bail!("Manifest file not found: {}", args.config.display());
    }

    let manifest = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load manifest from {}", args.config.display()))?;

    if args.json {
        let info = build_manifest_info(&manifest, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize manifest info")?;
        println!("{}", json);
    } else {
        print_manifest_info(&manifest, args);
    }

    Ok(())
}

/// Overlays of a video to list, honoring `--overlays` / `--age-group`
fn listed_overlays<'a>(video: &'a VideoEntry, args: &'a InfoArgs) -> Vec<&'a OverlayEntry> {
    match (&args.age_group, args.overlays) {
        (Some(group), _) => video.overlays_for_age_group(group).collect(),
        (None, true) => video.overlays.iter().collect(),
        (None, false) => Vec::new(),
    }
}

fn build_manifest_info(manifest: &MediaManifest, args: &InfoArgs) -> ManifestInfo {
    let videos = manifest
        .videos
        .iter()
        .map(|v| VideoInfo {
            id: v.id.to_string(),
            title: v.title.clone(),
            video_path: v.video_path.clone(),
            overlay_count: v.overlays.len(),
            overlays: listed_overlays(v, args)
                .into_iter()
                .map(|o| OverlayInfo {
                    id: o.id.to_string(),
                    label: o.label.clone(),
                    path: o.path.clone(),
                    age_group: o.age_group.clone(),
                    opacity: o.opacity,
                })
                .collect(),
        })
        .collect();

    let playback = &manifest.playback;
    ManifestInfo {
        version: format!("{:?}", manifest.version),
        playback: PlaybackInfo {
            frame_rate: playback.frame_rate,
            drift_threshold_s: playback.drift_threshold_s,
            autoplay_on_select: playback.autoplay_on_select,
            display_hz: playback.display_hz,
        },
        videos,
        age_groups: manifest.age_groups(),
    }
}

fn print_manifest_info(manifest: &MediaManifest, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                    Overlay Sync Manifest                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let playback = &manifest.playback;
    println!("⚙️  Playback");
    println!("   ├─ Version: {:?}", manifest.version);
    println!("   ├─ Frame rate: {} fps", playback.frame_rate);
    println!("   ├─ Drift threshold: {:.3} s", playback.drift_threshold_s);
    println!("   ├─ Autoplay on select: {}", playback.autoplay_on_select);
    println!("   └─ Display tick: {} Hz", playback.display_hz);

    println!("\n🎬 Videos ({})", manifest.videos.len());
    for (i, video) in manifest.videos.iter().enumerate() {
        let is_last = i == manifest.videos.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        let title = if video.title.is_empty() {
            video.id.as_str()
        } else {
            video.title.as_str()
        };
        println!("   {} {} ({})", prefix, video.id, title);

        let overlays = listed_overlays(video, args);
        if overlays.is_empty() {
            println!("   {}  └─ {} overlays", child_prefix, video.overlays.len());
            continue;
        }

        println!("   {}  🔥 Overlays ({}):", child_prefix, overlays.len());
        for (j, overlay) in overlays.iter().enumerate() {
            let overlay_prefix = if j == overlays.len() - 1 { "└─" } else { "├─" };
            println!(
                "   {}     {} {} [{}] opacity {:.2}",
                child_prefix,
                overlay_prefix,
                overlay.id,
                overlay.age_group.as_deref().unwrap_or("-"),
                overlay.opacity
            );
        }
    }

    let groups = manifest.age_groups();
    if !groups.is_empty() {
        println!("\n👶 Age groups ({})", groups.len());
        for (i, group) in groups.iter().enumerate() {
            let prefix = if i == groups.len() - 1 { "└─" } else { "├─" };
            println!("   {} {}", prefix, group);
        }
    }

    println!();
}
