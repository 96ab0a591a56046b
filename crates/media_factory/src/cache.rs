//! MediaCache 核心实现
//!
//! 预加载清单中的全部资源，持有空闲句柄，按需借出与归还。

use std::collections::HashMap;

use contracts::{ContractError, MediaManifest, ReadyState, StreamBackend, StreamHandle, StreamId};
use tracing::{debug, info, instrument, warn};

/// Media Cache / Preloader
///
/// 空闲句柄由缓存持有；被 controller 借出期间缓存只保留其来源路径。
pub struct MediaCache<B: StreamBackend> {
    backend: B,
    /// 资源 id -> 来源路径
    sources: HashMap<StreamId, String>,
    /// 空闲句柄
    idle: HashMap<StreamId, Box<dyn StreamHandle>>,
}

impl<B: StreamBackend> MediaCache<B> {
    /// 创建空缓存
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            sources: HashMap::new(),
            idle: HashMap::new(),
        }
    }

    /// 底层后端
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 预加载清单中的所有主视频与叠加层
    ///
    /// 单个资源失败只记录日志，不影响其它资源。返回已开始加载的资源数。
    #[instrument(
        name = "media_cache_preload_manifest",
        skip(self, manifest),
        fields(video_count = manifest.videos.len(), overlay_count = manifest.overlay_count())
    )]
    pub fn preload_manifest(&mut self, manifest: &MediaManifest) -> usize {
        let mut started = 0;
        for (stream_id, path) in manifest.resources() {
            if self.preload(stream_id, &path) {
                started += 1;
            }
        }

        let failed = self.failed_ids();
        if !failed.is_empty() {
            warn!(failed = ?failed, "some resources failed to preload");
        }
        info!(started, cached = self.idle.len(), "preload completed");
        started
    }

    /// 打开并开始加载单个资源
    ///
    /// 已缓存且来源一致、未出错的句柄保持不变 (返回 false)。来源路径变化时
    /// 旧句柄被丢弃并重新打开。
    #[instrument(
        name = "media_cache_preload",
        skip(self, stream_id, source_path),
        fields(stream_id = %stream_id)
    )]
    pub fn preload(&mut self, stream_id: StreamId, source_path: &str) -> bool {
        let source_changed = self
            .sources
            .get(&stream_id)
            .is_some_and(|known| known != source_path);
        if source_changed {
            debug!(source = source_path, "source path changed, discarding cached handle");
            self.idle.remove(&stream_id);
        }
        self.sources
            .insert(stream_id.clone(), source_path.to_string());

        if let Some(handle) = self.idle.get(&stream_id) {
            if handle.ready_state() != ReadyState::Errored {
                return false;
            }
        }

        let handle = self.open_and_load(&stream_id, source_path);
        if handle.ready_state() == ReadyState::Errored {
            warn!(source = source_path, "resource failed to preload");
        }
        self.idle.insert(stream_id, handle);
        true
    }

    /// 借出句柄
    ///
    /// 出错或不在缓存中的已知资源会被重新打开并加载。
    ///
    /// # Errors
    /// 资源 id 未知时返回 `UnknownStream`。
    #[instrument(name = "media_cache_checkout", skip(self))]
    pub fn checkout(&mut self, stream_id: &str) -> Result<Box<dyn StreamHandle>, ContractError> {
        let (stream_id, source_path) = self
            .sources
            .get_key_value(stream_id)
            .map(|(id, path)| (id.clone(), path.clone()))
            .ok_or_else(|| ContractError::unknown_stream(stream_id))?;

        match self.idle.remove(&stream_id) {
            Some(handle) if handle.ready_state() != ReadyState::Errored => {
                metrics::counter!("overlay_sync_cache_hits_total").increment(1);
                debug!(ready_state = ?handle.ready_state(), "checkout from cache");
                Ok(handle)
            }
            stale => {
                metrics::counter!("overlay_sync_cache_misses_total").increment(1);
                if stale.is_some() {
                    info!("cached handle errored, reloading on demand");
                } else {
                    debug!("no idle handle, loading on demand");
                }
                Ok(self.open_and_load(&stream_id, &source_path))
            }
        }
    }

    /// 归还句柄
    ///
    /// 来源路径与登记不一致 (或资源未登记) 的句柄直接丢弃。
    #[instrument(
        name = "media_cache_checkin",
        skip(self, handle),
        fields(stream_id = %handle.stream_id())
    )]
    pub fn checkin(&mut self, handle: Box<dyn StreamHandle>) {
        let stream_id = handle.stream_id().clone();
        match self.sources.get(&stream_id) {
            Some(known) if known == handle.source_path() => {
                self.idle.insert(stream_id, handle);
            }
            _ => {
                debug!(source = handle.source_path(), "discarding handle with stale source");
            }
        }
    }

    /// 空闲句柄的加载状态 (借出中或未知返回 None)
    pub fn status(&self, stream_id: &str) -> Option<ReadyState> {
        self.idle.get(stream_id).map(|h| h.ready_state())
    }

    /// 资源是否已登记
    pub fn contains(&self, stream_id: &str) -> bool {
        self.sources.contains_key(stream_id)
    }

    /// 空闲句柄数量
    pub fn len(&self) -> usize {
        self.idle.len()
    }

    /// 是否没有空闲句柄
    pub fn is_empty(&self) -> bool {
        self.idle.is_empty()
    }

    /// 加载失败的空闲资源 (按 id 排序)
    pub fn failed_ids(&self) -> Vec<StreamId> {
        let mut ids: Vec<StreamId> = self
            .idle
            .iter()
            .filter(|(_, h)| h.ready_state() == ReadyState::Errored)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    fn open_and_load(&self, stream_id: &StreamId, source_path: &str) -> Box<dyn StreamHandle> {
        let mut handle = self.backend.open(stream_id.clone(), source_path);
        handle.load();
        metrics::counter!("overlay_sync_cache_loads_total").increment(1);
        handle
    }
}
