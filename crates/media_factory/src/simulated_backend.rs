//! 模拟媒体后端
//!
//! 打开 `SimulatedStream`，持有所有句柄的弱引用，统一推进虚拟时钟。
//! 支持按资源 id 注入失败场景。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use contracts::{StreamBackend, StreamHandle, StreamId};
use tracing::{debug, instrument};

use crate::simulated_stream::{
    advance_state, SimulatedStream, SimulatedStreamConfig, StreamProbe, StreamState,
};

#[derive(Debug, Default)]
struct BackendState {
    /// 默认配置
    defaults: SimulatedStreamConfig,
    /// 按资源 id 覆盖的配置
    overrides: HashMap<StreamId, SimulatedStreamConfig>,
    /// 已打开的句柄 (弱引用, 句柄被丢弃后自动失效)
    registry: Vec<(StreamId, Weak<Mutex<StreamState>>)>,
    /// 每个资源 id 被打开的次数
    open_counts: HashMap<StreamId, u32>,
}

/// 模拟媒体后端
///
/// Clone 后共享同一份状态。
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    state: Arc<Mutex<BackendState>>,
}

impl SimulatedBackend {
    /// 使用默认流配置创建后端
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用指定默认流配置创建后端
    pub fn with_defaults(defaults: SimulatedStreamConfig) -> Self {
        let backend = Self::default();
        backend.lock().defaults = defaults;
        backend
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 为某个资源 id 设置专属配置 (仅影响之后打开的句柄)
    pub fn configure(&self, stream_id: impl Into<StreamId>, config: SimulatedStreamConfig) {
        self.lock().overrides.insert(stream_id.into(), config);
    }

    /// 推进所有存活句柄的虚拟时钟
    ///
    /// 事件在后端锁释放之后派发。
    pub fn advance(&self, dt: f64) {
        let live: Vec<(StreamId, Arc<Mutex<StreamState>>)> = {
            let mut state = self.lock();
            state.registry.retain(|(_, weak)| weak.strong_count() > 0);
            state
                .registry
                .iter()
                .filter_map(|(id, weak)| weak.upgrade().map(|s| (id.clone(), s)))
                .collect()
        };

        for (stream_id, shared) in &live {
            advance_state(stream_id, shared, dt);
        }
    }

    /// 获取最近一次打开的同 id 句柄的探针
    pub fn probe(&self, stream_id: &str) -> Option<StreamProbe> {
        let state = self.lock();
        state
            .registry
            .iter()
            .rev()
            .find(|(id, _)| id == stream_id)
            .and_then(|(id, weak)| weak.upgrade().map(|s| StreamProbe::new(id.clone(), s)))
    }

    /// 资源被打开的次数
    pub fn open_count(&self, stream_id: &str) -> u32 {
        self.lock().open_counts.get(stream_id).copied().unwrap_or(0)
    }

    /// 存活句柄数量
    pub fn live_count(&self) -> usize {
        self.lock()
            .registry
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }
}

impl StreamBackend for SimulatedBackend {
    #[instrument(name = "simulated_open", skip(self), fields(stream_id = %stream_id))]
    fn open(&self, stream_id: StreamId, source_path: &str) -> Box<dyn StreamHandle> {
        let mut state = self.lock();
        let config = state
            .overrides
            .get(&stream_id)
            .cloned()
            .unwrap_or_else(|| state.defaults.clone());

        let stream = SimulatedStream::new(stream_id.clone(), source_path, config);
        state
            .registry
            .push((stream_id.clone(), Arc::downgrade(&stream.shared_state())));
        *state.open_counts.entry(stream_id).or_insert(0) += 1;

        debug!(source = source_path, "Simulated stream opened");
        Box::new(stream)
    }
}
