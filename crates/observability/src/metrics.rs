//! Sync Controller 指标收集模块
//!
//! 基于 SyncStats 收集和统计同步控制器的运行指标。

use std::collections::BTreeMap;

use contracts::SyncStats;
use metrics::{counter, gauge, histogram};

/// 从 SyncStats 导出会话级指标
///
/// 会话结束 (切换视频或退出) 时调用。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_sync_stats;
///
/// let stats = session.stats();
/// record_sync_stats(&stats);
/// ```
pub fn record_sync_stats(stats: &SyncStats) {
    counter!("overlay_sync_sessions_total").increment(1);

    gauge!("overlay_sync_session_events").set(stats.events_processed as f64);
    gauge!("overlay_sync_session_snaps").set(stats.snaps as f64);
    gauge!("overlay_sync_session_drift_corrections").set(stats.drift_corrections as f64);
    gauge!("overlay_sync_session_max_corrected_drift_seconds").set(stats.max_corrected_drift);

    // 失败计数
    let failures = stats.play_failures + stats.seek_failures;
    gauge!("overlay_sync_session_failures").set(failures as f64);

    gauge!("overlay_sync_overlays_unresolved").set(stats.unresolved.len() as f64);
    for stream_id in &stats.unresolved {
        counter!("overlay_sync_unresolved_total", "stream_id" => stream_id.to_string())
            .increment(1);
    }
}

/// 记录单个叠加层的漂移采样 (秒)
pub fn record_drift_sample(stream_id: &str, drift: f64) {
    histogram!(
        "overlay_sync_drift_seconds",
        "stream_id" => stream_id.to_string()
    )
    .record(drift.abs());
}

/// 记录一次显示帧回调
pub fn record_display_tick(corrections: usize) {
    counter!("overlay_sync_display_ticks_total").increment(1);
    if corrections > 0 {
        histogram!("overlay_sync_corrections_per_tick").record(corrections as f64);
    }
}

/// 同步指标聚合器
///
/// 在内存中聚合多个会话的指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct SyncStatsAggregator {
    /// 会话数
    pub sessions: u64,

    /// 主视频事件总数
    pub events_processed: u64,

    /// 离散对齐次数
    pub snaps: u64,

    /// 连续校正次数
    pub drift_corrections: u64,

    /// 校正循环 tick 数
    pub correction_ticks: u64,

    /// 倍速同步次数
    pub rate_updates: u64,

    /// play 失败次数
    pub play_failures: u64,

    /// seek 失败次数
    pub seek_failures: u64,

    /// 最大校正漂移 (秒)
    pub max_corrected_drift: f64,

    /// 漂移采样统计 (毫秒)
    pub drift_stats: RunningStats,

    /// 各叠加层漂移统计 (毫秒)
    pub per_overlay_drift: BTreeMap<String, RunningStats>,

    /// 各叠加层未解决次数
    pub unresolved_counts: BTreeMap<String, u64>,
}

impl SyncStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 合并一个会话的统计
    pub fn update(&mut self, stats: &SyncStats) {
        self.sessions += 1;
        self.events_processed += stats.events_processed;
        self.snaps += stats.snaps;
        self.drift_corrections += stats.drift_corrections;
        self.correction_ticks += stats.correction_ticks;
        self.rate_updates += stats.rate_updates;
        self.play_failures += stats.play_failures;
        self.seek_failures += stats.seek_failures;
        self.max_corrected_drift = self.max_corrected_drift.max(stats.max_corrected_drift);

        for stream_id in &stats.unresolved {
            *self
                .unresolved_counts
                .entry(stream_id.to_string())
                .or_insert(0) += 1;
        }
    }

    /// 记录漂移采样 (秒)
    pub fn push_drift(&mut self, stream_id: &str, drift: f64) {
        let ms = drift.abs() * 1000.0;
        self.drift_stats.push(ms);
        self.per_overlay_drift
            .entry(stream_id.to_string())
            .or_default()
            .push(ms);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> SyncSummary {
        SyncSummary {
            sessions: self.sessions,
            events_processed: self.events_processed,
            snaps: self.snaps,
            drift_corrections: self.drift_corrections,
            correction_ticks: self.correction_ticks,
            rate_updates: self.rate_updates,
            play_failures: self.play_failures,
            seek_failures: self.seek_failures,
            max_corrected_drift_ms: self.max_corrected_drift * 1000.0,
            correction_rate: if self.correction_ticks > 0 {
                self.drift_corrections as f64 / self.correction_ticks as f64 * 100.0
            } else {
                0.0
            },
            drift_ms: StatsSummary::from(&self.drift_stats),
            per_overlay_drift_ms: self
                .per_overlay_drift
                .iter()
                .map(|(id, stats)| (id.clone(), StatsSummary::from(stats)))
                .collect(),
            unresolved_counts: self.unresolved_counts.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    pub sessions: u64,
    pub events_processed: u64,
    pub snaps: u64,
    pub drift_corrections: u64,
    pub correction_ticks: u64,
    pub rate_updates: u64,
    pub play_failures: u64,
    pub seek_failures: u64,
    pub max_corrected_drift_ms: f64,
    /// 每 100 个校正 tick 的校正次数
    pub correction_rate: f64,
    pub drift_ms: StatsSummary,
    pub per_overlay_drift_ms: BTreeMap<String, StatsSummary>,
    pub unresolved_counts: BTreeMap<String, u64>,
}

impl std::fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Sync Summary ===")?;
        writeln!(f, "Sessions: {}", self.sessions)?;
        writeln!(f, "Master events: {}", self.events_processed)?;
        writeln!(f, "Discrete snaps: {}", self.snaps)?;
        writeln!(
            f,
            "Drift corrections: {} over {} ticks ({:.2}%)",
            self.drift_corrections, self.correction_ticks, self.correction_rate
        )?;
        writeln!(f, "Max corrected drift: {:.1} ms", self.max_corrected_drift_ms)?;
        writeln!(f, "Rate updates: {}", self.rate_updates)?;
        writeln!(
            f,
            "Failures: play={}, seek={}",
            self.play_failures, self.seek_failures
        )?;
        writeln!(f, "Drift (ms): {}", self.drift_ms)?;

        for (overlay, stats) in &self.per_overlay_drift_ms {
            writeln!(f, "  {overlay}: {stats}")?;
        }

        if !self.unresolved_counts.is_empty() {
            writeln!(f, "Unresolved overlays:")?;
            for (overlay, count) in &self.unresolved_counts {
                writeln!(f, "  {overlay}: {count}")?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.2}, max={:.2}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::StreamId;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_merges_sessions() {
        let mut aggregator = SyncStatsAggregator::new();

        let first = SyncStats {
            events_processed: 4,
            snaps: 6,
            drift_corrections: 2,
            correction_ticks: 10,
            max_corrected_drift: 0.15,
            unresolved: vec![StreamId::from("heat_b")],
            ..Default::default()
        };
        let second = SyncStats {
            events_processed: 1,
            drift_corrections: 3,
            correction_ticks: 10,
            max_corrected_drift: 0.4,
            play_failures: 1,
            ..Default::default()
        };

        aggregator.update(&first);
        aggregator.update(&second);

        assert_eq!(aggregator.sessions, 2);
        assert_eq!(aggregator.events_processed, 5);
        assert_eq!(aggregator.drift_corrections, 5);
        assert!((aggregator.max_corrected_drift - 0.4).abs() < 1e-12);
        assert_eq!(aggregator.unresolved_counts.get("heat_b"), Some(&1));

        let summary = aggregator.summary();
        assert!((summary.correction_rate - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_push_drift_tracks_per_overlay() {
        let mut aggregator = SyncStatsAggregator::new();
        aggregator.push_drift("a", 0.010);
        aggregator.push_drift("a", -0.030);
        aggregator.push_drift("b", 0.002);

        assert_eq!(aggregator.drift_stats.count(), 3);
        let a = &aggregator.per_overlay_drift["a"];
        assert!((a.max() - 30.0).abs() < 1e-9);
        assert!((a.mean() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = SyncStatsAggregator::new();
        aggregator.update(&SyncStats {
            drift_corrections: 1,
            correction_ticks: 4,
            max_corrected_drift: 0.125,
            ..Default::default()
        });

        let output = aggregator.summary().to_string();
        assert!(output.contains("Sessions: 1"));
        assert!(output.contains("25.00%"));
        assert!(output.contains("125.0 ms"));
        assert!(output.contains("Drift (ms): N/A"));
    }
}
