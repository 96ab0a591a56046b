//! # Config Loader
//!
//! Media manifest loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON manifests
//! - Validate manifest legality
//! - Produce a `MediaManifest`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let manifest = ConfigLoader::load_from_path(Path::new("videos.toml")).unwrap();
//! println!("Videos: {}", manifest.videos.len());
//! ```

mod parser;
mod validator;

pub use contracts::MediaManifest;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Manifest loader
///
/// Provides static methods to load a manifest from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a manifest from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<MediaManifest, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load a manifest from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<MediaManifest, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Serialize a manifest to TOML string
    pub fn to_toml(manifest: &MediaManifest) -> Result<String, ContractError> {
        toml::to_string_pretty(manifest)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize a manifest to JSON string
    pub fn to_json(manifest: &MediaManifest) -> Result<String, ContractError> {
        serde_json::to_string_pretty(manifest)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer manifest format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read manifest file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate manifest content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<MediaManifest, ContractError> {
        let manifest = parser::parse(content, format)?;
        validator::validate(&manifest)?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL_TOML: &str = r#"
[playback]
frame_rate = 30
drift_threshold_s = 0.1

[[videos]]
id = "event01"
title = "Ball rolls behind screen"
video_path = "/videos/event01.mp4"

[[videos.overlays]]
id = "event01_6mo"
label = "6 months"
path = "/overlays/event01_6mo.webm"
age_group = "6mo"

[[videos.overlays]]
id = "event01_12mo"
label = "12 months"
path = "/overlays/event01_12mo.webm"
age_group = "12mo"
opacity = 0.4
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let manifest = result.unwrap();
        assert_eq!(manifest.videos[0].id, "event01");
        assert_eq!(manifest.overlay_count(), 2);
    }

    #[test]
    fn test_round_trip_toml() {
        let m = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&m).unwrap();
        let m2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(m.videos.len(), m2.videos.len());
        assert_eq!(m.videos[0].overlays[1].id, m2.videos[0].overlays[1].id);
    }

    #[test]
    fn test_toml_to_json() {
        let m = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&m).unwrap();
        let m2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(m.age_groups(), m2.age_groups());
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(MINIMAL_TOML.as_bytes()).unwrap();

        let manifest = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(manifest.videos.len(), 1);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[[videos]]
id = "event01"
video_path = "/videos/event01.mp4"

[[videos.overlays]]
id = "heat"
path = "/overlays/a.webm"

[[videos.overlays]]
id = "heat"
path = "/overlays/b.webm"
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("duplicate"));
    }
}
