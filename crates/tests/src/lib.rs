//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 播放会话验收场景
//! - 随机化 seek / 倍速性质测试
//! - 清单 -> 缓存 -> 查看器 的 e2e 测试

#[cfg(test)]
mod rig;

#[cfg(test)]
mod scenarios;

#[cfg(test)]
mod properties;

#[cfg(test)]
mod e2e;
