//! Layered error definitions
//!
//! Categorized by source: config / stream / sync

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Stream Errors =====
    /// Resource never reached `Ready`
    #[error("resource '{stream_id}' unavailable: {message}")]
    ResourceLoad { stream_id: String, message: String },

    /// Runtime refused to start playback (e.g. autoplay policy)
    #[error("playback start refused for '{stream_id}': {message}")]
    PlaybackStart { stream_id: String, message: String },

    /// Position could not be applied
    #[error("seek failed for '{stream_id}': {message}")]
    Seek { stream_id: String, message: String },

    /// Playback rate must be a positive finite number
    #[error("invalid playback rate: {rate}")]
    InvalidRate { rate: f64 },

    /// Resource id is not known to the cache
    #[error("unknown stream: {stream_id}")]
    UnknownStream { stream_id: String },

    // ===== Sync Errors =====
    /// Overlay could not be brought back within the drift threshold
    #[error("drift unresolved for '{stream_id}': drift={drift:.3}s")]
    SyncDriftUnresolved { stream_id: String, drift: f64 },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create resource load error
    pub fn resource_load(stream_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ResourceLoad {
            stream_id: stream_id.into(),
            message: message.into(),
        }
    }

    /// Create playback start error
    pub fn playback_start(stream_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PlaybackStart {
            stream_id: stream_id.into(),
            message: message.into(),
        }
    }

    /// Create seek error
    pub fn seek(stream_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Seek {
            stream_id: stream_id.into(),
            message: message.into(),
        }
    }

    /// Create unknown stream error
    pub fn unknown_stream(stream_id: impl Into<String>) -> Self {
        Self::UnknownStream {
            stream_id: stream_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ContractError::resource_load("heat_a", "404");
        assert_eq!(err.to_string(), "resource 'heat_a' unavailable: 404");

        let err = ContractError::InvalidRate { rate: -1.0 };
        assert_eq!(err.to_string(), "invalid playback rate: -1");

        let err = ContractError::SyncDriftUnresolved {
            stream_id: "heat_b".into(),
            drift: 0.25,
        };
        assert!(err.to_string().contains("drift=0.250s"));
    }
}
