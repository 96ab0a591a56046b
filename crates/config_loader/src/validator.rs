//! 清单校验模块
//!
//! 校验规则：
//! - video id 唯一
//! - 资源 id 全清单唯一 (主视频与叠加层共用缓存键空间)
//! - video_path / overlay path 非空
//! - opacity 位于 [0, 1]
//! - frame_rate > 0, drift_threshold_s > 0, display_hz > 0

use std::collections::HashSet;

use contracts::{ContractError, MediaManifest};

/// 校验 MediaManifest
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(manifest: &MediaManifest) -> Result<(), ContractError> {
    validate_video_ids(manifest)?;
    validate_resource_ids(manifest)?;
    validate_paths(manifest)?;
    validate_opacity(manifest)?;
    validate_playback(manifest)?;
    Ok(())
}

/// 校验 video id 唯一性
fn validate_video_ids(manifest: &MediaManifest) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for video in &manifest.videos {
        if video.id.is_empty() {
            return Err(ContractError::config_validation(
                "videos[].id",
                "video id cannot be empty",
            ));
        }
        if !seen.insert(video.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("videos[id={}]", video.id),
                "duplicate video id",
            ));
        }
    }
    Ok(())
}

/// 校验资源 id 全局唯一 (叠加层之间、叠加层与主视频之间)
fn validate_resource_ids(manifest: &MediaManifest) -> Result<(), ContractError> {
    let mut seen: HashSet<&str> = manifest.videos.iter().map(|v| v.id.as_str()).collect();
    for video in &manifest.videos {
        for overlay in &video.overlays {
            if overlay.id.is_empty() {
                return Err(ContractError::config_validation(
                    format!("videos[{}].overlays[].id", video.id),
                    "overlay id cannot be empty",
                ));
            }
            if !seen.insert(overlay.id.as_str()) {
                return Err(ContractError::config_validation(
                    format!("videos[{}].overlays[id={}]", video.id, overlay.id),
                    "duplicate resource id",
                ));
            }
        }
    }
    Ok(())
}

/// 校验源路径非空
fn validate_paths(manifest: &MediaManifest) -> Result<(), ContractError> {
    for video in &manifest.videos {
        if video.video_path.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("videos[{}].video_path", video.id),
                "video_path cannot be empty",
            ));
        }
        for overlay in &video.overlays {
            if overlay.path.trim().is_empty() {
                return Err(ContractError::config_validation(
                    format!("videos[{}].overlays[{}].path", video.id, overlay.id),
                    "overlay path cannot be empty",
                ));
            }
        }
    }
    Ok(())
}

/// 校验不透明度
fn validate_opacity(manifest: &MediaManifest) -> Result<(), ContractError> {
    for video in &manifest.videos {
        for overlay in &video.overlays {
            if !(0.0..=1.0).contains(&overlay.opacity) {
                return Err(ContractError::config_validation(
                    format!("videos[{}].overlays[{}].opacity", video.id, overlay.id),
                    format!("opacity must be within [0, 1], got {}", overlay.opacity),
                ));
            }
        }
    }
    Ok(())
}

/// 校验播放参数
fn validate_playback(manifest: &MediaManifest) -> Result<(), ContractError> {
    let playback = &manifest.playback;

    if playback.frame_rate == 0 {
        return Err(ContractError::config_validation(
            "playback.frame_rate",
            "frame_rate must be > 0",
        ));
    }

    if !(playback.drift_threshold_s.is_finite() && playback.drift_threshold_s > 0.0) {
        return Err(ContractError::config_validation(
            "playback.drift_threshold_s",
            format!(
                "drift_threshold_s must be > 0, got {}",
                playback.drift_threshold_s
            ),
        ));
    }

    if playback.display_hz == 0 {
        return Err(ContractError::config_validation(
            "playback.display_hz",
            "display_hz must be > 0",
        ));
    }

    Ok(())
}
