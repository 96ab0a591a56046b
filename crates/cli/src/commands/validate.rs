//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::MediaManifest;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ManifestSummary>,
}

#[derive(Serialize)]
struct ManifestSummary {
    version: String,
    frame_rate: u32,
    drift_threshold_s: f64,
    video_count: usize,
    overlay_count: usize,
    age_groups: Vec<String>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating manifest");

    let result = validate_manifest(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Manifest validation failed")
    }
}

fn validate_manifest(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(manifest) => {
            let warnings = collect_warnings(&manifest);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ManifestSummary {
                    version: format!("{:?}", manifest.version),
                    frame_rate: manifest.playback.frame_rate,
                    drift_threshold_s: manifest.playback.drift_threshold_s,
                    video_count: manifest.videos.len(),
                    overlay_count: manifest.overlay_count(),
                    age_groups: manifest.age_groups(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect manifest warnings (non-fatal issues)
fn collect_warnings(manifest: &MediaManifest) -> Vec<String> {
    let mut warnings = Vec::new();

    if manifest.videos.is_empty() {
        warnings.push("No videos configured - nothing can be played".to_string());
    }

    for video in &manifest.videos {
        if video.overlays.is_empty() {
            warnings.push(format!("Video '{}' has no overlays", video.id));
        }

        for overlay in &video.overlays {
            if overlay.age_group.is_none() {
                warnings.push(format!(
                    "Overlay '{}' of video '{}' has no age_group - hidden by every age filter",
                    overlay.id, video.id
                ));
            }
        }
    }

    let frame_duration = 1.0 / f64::from(manifest.playback.frame_rate.max(1));
    if manifest.playback.drift_threshold_s < frame_duration {
        warnings.push(format!(
            "playback.drift_threshold_s ({:.3}s) is below one frame ({:.3}s) - expect constant corrections",
            manifest.playback.drift_threshold_s, frame_duration
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Manifest is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Frame rate: {} fps", summary.frame_rate);
            println!("  Drift threshold: {:.3} s", summary.drift_threshold_s);
            println!("  Videos: {}", summary.video_count);
            println!("  Overlays: {}", summary.overlay_count);
            if !summary.age_groups.is_empty() {
                println!("  Age groups: {}", summary.age_groups.join(", "));
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Manifest is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};

    #[test]
    fn test_warnings_for_bare_entries() {
        let manifest = ConfigLoader::load_from_str(
            r#"
            [playback]
            drift_threshold_s = 0.01

            [[videos]]
            id = "event01"
            video_path = "/videos/event01.mp4"

            [[videos]]
            id = "event02"
            video_path = "/videos/event02.mp4"

            [[videos.overlays]]
            id = "e2_all"
            path = "/overlays/e2_all.webm"
            "#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let warnings = collect_warnings(&manifest);
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("event01"));
        assert!(warnings[1].contains("e2_all"));
        assert!(warnings[2].contains("drift_threshold_s"));
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let args = ValidateArgs {
            config: "/nonexistent/videos.toml".into(),
            json: false,
        };
        let result = validate_manifest(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }
}
