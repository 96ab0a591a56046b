//! # Sync Engine
//!
//! 多路视频同步核心。
//!
//! 负责：
//! - 帧时钟 (time <-> frame)
//! - 主视频事件驱动的叠加层对齐
//! - 非 1x 倍速下的逐显示帧漂移校正
//! - 输出 `SyncStats`
//!
//! ## 使用示例
//!
//! ```ignore
//! use sync_engine::{FrameClock, SyncController};
//!
//! let mut controller = SyncController::new(FrameClock::new(30), 0.1);
//! controller.attach_master(master.as_mut())?;
//! controller.attach_overlay(master.as_ref(), cache.checkout("heat_6mo")?)?;
//!
//! // After every master command and on every display frame
//! controller.process_events(master.as_ref());
//! controller.on_display_frame(master.as_ref());
//! ```

mod controller;
mod correction;
mod error;
mod frame_clock;

pub use controller::SyncController;
pub use correction::{correction_wanted, drift, exceeds_threshold, CorrectionLoop};
pub use error::{AttachError, Result, SyncError};
pub use frame_clock::FrameClock;

// Re-export contracts types
pub use contracts::{ControllerState, OverlayStatus, SyncStats};
