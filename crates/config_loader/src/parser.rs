//! 清单解析模块
//!
//! 支持 TOML (主要) 和 JSON 格式。
//!
//! JSON 另外接受旧版 `videos.json`: 顶层就是视频数组, 字段为 camelCase
//! (`videoPath`, `ageGroup`)。

use contracts::{ContractError, MediaManifest, VideoEntry};

/// 清单文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式清单
pub fn parse_toml(content: &str) -> Result<MediaManifest, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式清单 (对象形式或旧版视频数组)
pub fn parse_json(content: &str) -> Result<MediaManifest, ContractError> {
    let parsed = if content.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<VideoEntry>>(content).map(MediaManifest::from_videos)
    } else {
        serde_json::from_str(content)
    };
    parsed.map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析清单
pub fn parse(content: &str, format: ConfigFormat) -> Result<MediaManifest, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}
