//! MediaManifest - Config Loader 输出
//!
//! 描述可播放的主视频、每个主视频的热力图叠加层，以及播放参数。

use serde::{Deserialize, Serialize};

use crate::{PlaybackSettings, StreamId};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ManifestVersion {
    #[default]
    V1,
}

/// 完整的媒体清单
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaManifest {
    /// 配置版本
    #[serde(default)]
    pub version: ManifestVersion,

    /// 播放参数
    #[serde(default)]
    pub playback: PlaybackSettings,

    /// 主视频列表
    pub videos: Vec<VideoEntry>,
}

/// 主视频条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoEntry {
    /// 唯一标识符
    pub id: StreamId,

    /// 显示名称
    #[serde(default)]
    pub title: String,

    /// 视频源路径 (不透明)
    #[serde(alias = "videoPath")]
    pub video_path: String,

    /// 可叠加的热力图
    #[serde(default)]
    pub overlays: Vec<OverlayEntry>,
}

/// 叠加层条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayEntry {
    /// 唯一标识符 (全清单唯一, 用作缓存键)
    pub id: StreamId,

    /// 显示名称
    #[serde(default, alias = "title")]
    pub label: String,

    /// 叠加视频源路径 (不透明)
    pub path: String,

    /// 年龄组 (e.g., "6mo")
    #[serde(default, alias = "ageGroup")]
    pub age_group: Option<String>,

    /// 渲染不透明度 0..=1
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

fn default_opacity() -> f32 {
    0.6
}

impl MediaManifest {
    /// 只有视频列表的清单 (默认播放参数)
    pub fn from_videos(videos: Vec<VideoEntry>) -> Self {
        Self {
            version: ManifestVersion::default(),
            playback: PlaybackSettings::default(),
            videos,
        }
    }

    /// 按 id 查找主视频
    pub fn video(&self, id: &str) -> Option<&VideoEntry> {
        self.videos.iter().find(|v| v.id == id)
    }

    /// 所有资源描述 (resource id -> source path)，主视频在前
    pub fn resources(&self) -> Vec<(StreamId, String)> {
        let masters = self
            .videos
            .iter()
            .map(|v| (v.id.clone(), v.video_path.clone()));
        let overlays = self
            .videos
            .iter()
            .flat_map(|v| v.overlays.iter())
            .map(|o| (o.id.clone(), o.path.clone()));
        masters.chain(overlays).collect()
    }

    /// 所有叠加层中出现过的年龄组 (按首次出现顺序去重)
    pub fn age_groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = Vec::new();
        for overlay in self.videos.iter().flat_map(|v| v.overlays.iter()) {
            if let Some(group) = &overlay.age_group {
                if !groups.contains(group) {
                    groups.push(group.clone());
                }
            }
        }
        groups
    }

    /// 叠加层总数
    pub fn overlay_count(&self) -> usize {
        self.videos.iter().map(|v| v.overlays.len()).sum()
    }
}

impl VideoEntry {
    /// 按 id 查找叠加层
    pub fn overlay(&self, id: &str) -> Option<&OverlayEntry> {
        self.overlays.iter().find(|o| o.id == id)
    }

    /// 按年龄组过滤叠加层
    pub fn overlays_for_age_group<'a>(
        &'a self,
        age_group: &'a str,
    ) -> impl Iterator<Item = &'a OverlayEntry> + 'a {
        self.overlays
            .iter()
            .filter(move |o| o.age_group.as_deref() == Some(age_group))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay(id: &str, group: Option<&str>) -> OverlayEntry {
        OverlayEntry {
            id: id.into(),
            label: id.to_string(),
            path: format!("/overlays/{id}.webm"),
            age_group: group.map(str::to_string),
            opacity: default_opacity(),
        }
    }

    fn manifest() -> MediaManifest {
        MediaManifest {
            version: ManifestVersion::V1,
            playback: PlaybackSettings::default(),
            videos: vec![
                VideoEntry {
                    id: "event01".into(),
                    title: "Event 1".into(),
                    video_path: "/videos/event01.mp4".into(),
                    overlays: vec![overlay("e1_6mo", Some("6mo")), overlay("e1_12mo", Some("12mo"))],
                },
                VideoEntry {
                    id: "event02".into(),
                    title: "Event 2".into(),
                    video_path: "/videos/event02.mp4".into(),
                    overlays: vec![overlay("e2_6mo", Some("6mo")), overlay("e2_all", None)],
                },
            ],
        }
    }

    #[test]
    fn test_resources_lists_masters_then_overlays() {
        let resources = manifest().resources();
        assert_eq!(resources.len(), 6);
        assert_eq!(resources[0].0, "event01");
        assert_eq!(resources[1].0, "event02");
        assert_eq!(resources[2].1, "/overlays/e1_6mo.webm");
    }

    #[test]
    fn test_age_groups_first_seen_order() {
        assert_eq!(manifest().age_groups(), vec!["6mo", "12mo"]);
    }

    #[test]
    fn test_filter_by_age_group() {
        let m = manifest();
        let video = m.video("event02").unwrap();
        let ids: Vec<_> = video
            .overlays_for_age_group("6mo")
            .map(|o| o.id.as_str())
            .collect();
        assert_eq!(ids, vec!["e2_6mo"]);
        assert_eq!(video.overlays_for_age_group("24mo").count(), 0);
    }

    #[test]
    fn test_opacity_default() {
        let json = r#"{"id": "o", "path": "/o.webm"}"#;
        let entry: OverlayEntry = serde_json::from_str(json).unwrap();
        assert!((entry.opacity - 0.6).abs() < f32::EPSILON);
        assert!(entry.age_group.is_none());
    }
}
