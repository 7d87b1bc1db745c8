//! 下载引擎：注册表 + 状态机 + 控制 API。
//!
//! 注册表是 `Arc<Mutex<HashMap<url, DownloadEntry>>>`，控制 API 与传输任务的收尾共用这一把锁。
//! 每个传输任务带一个编号，只有注册表中的活动任务仍是自己时才写回结果，
//! 因此过期任务的收尾不会覆盖新任务的状态。

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::FutureExt;
use percent_encoding::percent_decode_str;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::internal::download_error::DownloadError;
use crate::internal::engine::structs::download_entry::{ActiveTransfer, DownloadEntry};
use crate::internal::engine::structs::{DownloadSnapshot, DownloadStatus, EngineConfig};
use crate::internal::engine::transfer::{
    STAGING_EXTENSION, TransferContext, TransferOutcome, run_transfer, staging_path_for,
};
use crate::internal::progress::structs::{DownloadProgress, ProgressReporter};
use crate::internal::progress::traits::ProgressSink;
use crate::internal::record_store::traits::RecordStore;
use crate::internal::states::unlock_reactive::PropertyWatcher;
use crate::internal::transport::structs::HttpTransport;
use crate::internal::transport::traits::Transport;
use crate::internal::writer::file_ops::remove_if_exists;
use crate::internal::writer::file_size;

const FALLBACK_DESTINATION_NAME: &str = "download";

type Registry = Arc<Mutex<HashMap<String, DownloadEntry>>>;

/// 可续传下载引擎。由调用方持有 `Arc<DownloadEngine>`，没有全局单例。
pub struct DownloadEngine {
    config: EngineConfig,
    store: Arc<dyn RecordStore>,
    transport: Arc<dyn Transport>,
    registry: Registry,
}

impl DownloadEngine {
    /// 从记录存储恢复注册表，所有下载都以 `Paused` 开始，并清理上个进程残留的暂存文件。
    pub async fn load(
        config: EngineConfig,
        store: Arc<dyn RecordStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Arc<Self>, DownloadError> {
        let records = store.list().await?;

        let mut entries = HashMap::with_capacity(records.len());
        for record in records {
            let url = match Url::parse(&record.url) {
                Ok(url) => url,
                Err(e) => {
                    warn!(url = %record.url, error = %e, "跳过无法解析的下载记录");
                    continue;
                }
            };
            if let Err(e) = validate_destination_name(&record.destination_name) {
                warn!(%url, error = %e, "跳过文件名非法的下载记录");
                continue;
            }
            let on_disk = file_size(config.destination_path(&record.destination_name))
                .await
                .unwrap_or(0);
            entries.insert(
                url.as_str().to_string(),
                DownloadEntry::new(record.destination_name, DownloadStatus::Paused, on_disk),
            );
        }

        purge_staging_dir(&config.staging_dir).await;
        info!(count = entries.len(), dir = %config.download_dir.display(), "下载引擎已加载");

        Ok(Arc::new(Self {
            config,
            store,
            transport,
            registry: Arc::new(Mutex::new(entries)),
        }))
    }

    /// 使用默认的 [`HttpTransport`] 加载。
    pub async fn load_with_http(
        config: EngineConfig,
        store: Arc<dyn RecordStore>,
    ) -> Result<Arc<Self>, DownloadError> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new()?);
        Self::load(config, store, transport).await
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 登记一个下载。已存在时什么都不做；不会发起网络请求。
    ///
    /// `destination_name` 缺省时取 URL 最后一个路径段（解码后），没有则为 `"download"`。
    pub async fn add_download(
        &self,
        url: &Url,
        destination_name: Option<&str>,
    ) -> Result<(), DownloadError> {
        let name = match destination_name {
            Some(name) => {
                validate_destination_name(name)?;
                name.to_string()
            }
            None => default_destination_name(url),
        };

        let key = url.as_str();
        let on_disk = file_size(self.config.destination_path(&name))
            .await
            .unwrap_or(0);
        {
            let mut registry = self.registry.lock().await;
            if registry.contains_key(key) {
                debug!(%url, "下载已存在，忽略重复添加");
                return Ok(());
            }
            registry.insert(
                key.to_string(),
                DownloadEntry::new(name.clone(), DownloadStatus::Running, on_disk),
            );
        }
        info!(%url, destination = %name, "添加下载");

        // 记录写盘可能较慢，放在锁外
        if let Err(e) = self.store.add(key, &name).await {
            warn!(%url, error = %e, "写入下载记录失败");
        }
        Ok(())
    }

    /// 查询状态；未知 URL 返回 `Invalid`。
    pub async fn get_status(&self, url: &Url) -> DownloadStatus {
        self.registry
            .lock()
            .await
            .get(url.as_str())
            .map_or(DownloadStatus::Invalid, DownloadEntry::current_status)
    }

    /// 开始或继续下载，并替换进度接收端（后调用者生效）。
    ///
    /// 已有未取消的传输时只替换接收端；上一个传输正在退出时先等它结束再启动新的。
    pub async fn resume_download(
        &self,
        url: &Url,
        sink: Option<Arc<dyn ProgressSink>>,
    ) -> Result<(), DownloadError> {
        let key = url.as_str();
        loop {
            let mut registry = self.registry.lock().await;
            let entry = registry
                .get_mut(key)
                .ok_or_else(|| DownloadError::UnknownDownload(key.to_string()))?;

            if entry.has_live_transfer() {
                entry.sink.replace(sink);
                entry.set_status(DownloadStatus::Running);
                debug!(%url, "传输已在进行，仅替换进度接收端");
                return Ok(());
            }
            if let Some(active) = &entry.active {
                let finished = active.finished.clone();
                drop(registry);
                finished.await;
                continue;
            }

            entry.sink.replace(sink);
            entry.set_status(DownloadStatus::Running);
            self.spawn_transfer(url, entry);
            return Ok(());
        }
    }

    /// 暂停：置为 `Paused`，取消活动传输并等待它写盘退出。未知 URL 什么都不做。
    ///
    /// 没有活动传输的 `Completed` / `Error` 条目保持原状态。
    pub async fn pause_download(&self, url: &Url) {
        let finished = {
            let mut registry = self.registry.lock().await;
            let Some(entry) = registry.get_mut(url.as_str()) else {
                return;
            };
            if entry.active.is_none() && entry.current_status().is_settled() {
                return;
            }
            entry.set_status(DownloadStatus::Paused);
            match &entry.active {
                Some(active) => {
                    active.cancel.cancel();
                    active.finished.clone()
                }
                None => return,
            }
        };
        debug!(%url, "等待传输任务退出");
        finished.await;
        info!(%url, "下载已暂停");
    }

    /// 删除下载：移出注册表、取消并等待活动传输退出，再删除记录；暂存的续传数据一并丢弃。
    pub async fn remove_download(&self, url: &Url) {
        let key = url.as_str();
        let (mut entry, finished) = {
            let mut registry = self.registry.lock().await;
            let Some(mut entry) = registry.remove(key) else {
                return;
            };
            let finished = entry.active.take().map(|active| {
                active.cancel.cancel();
                active.finished
            });
            (entry, finished)
        };
        if let Some(finished) = finished {
            debug!(%url, "等待传输任务退出");
            finished.await;
        }

        if let Err(e) = self.store.delete(key).await {
            warn!(%url, error = %e, "删除下载记录失败");
        }

        let staging = match entry.resume_token.take() {
            Some(token) => token.staging_path().to_path_buf(),
            None => staging_path_for(&self.config.staging_dir, url),
        };
        if let Err(e) = remove_if_exists(&staging).await {
            warn!(%url, error = %e, "清理暂存文件失败");
        }
        info!(%url, "下载已删除");
    }

    /// 预留接口，暂无定义的行为。
    pub async fn modify_download_url(&self, _old: &Url, _new: &Url) -> Result<(), DownloadError> {
        Err(DownloadError::Unsupported("modify_download_url"))
    }

    /// 所有下载的快照，按 URL 排序。
    pub async fn list_downloads(&self) -> Vec<DownloadSnapshot> {
        let registry = self.registry.lock().await;
        let mut snapshots: Vec<_> = registry
            .iter()
            .map(|(url, entry)| entry.snapshot(url))
            .collect();
        snapshots.sort_by(|a, b| a.url.cmp(&b.url));
        snapshots
    }

    pub async fn watch_status(&self, url: &Url) -> Option<PropertyWatcher<DownloadStatus>> {
        let registry = self.registry.lock().await;
        registry.get(url.as_str()).map(|entry| entry.status.watch())
    }

    pub async fn watch_progress(&self, url: &Url) -> Option<PropertyWatcher<DownloadProgress>> {
        let registry = self.registry.lock().await;
        registry.get(url.as_str()).map(|entry| entry.progress.watch())
    }

    /// 等待当前传输任务退出（结果已写回注册表）；没有活动传输时立即返回。
    pub async fn wait_for_transfer(&self, url: &Url) {
        let finished = {
            let registry = self.registry.lock().await;
            registry
                .get(url.as_str())
                .and_then(|entry| entry.active.as_ref())
                .map(|active| active.finished.clone())
        };
        if let Some(finished) = finished {
            finished.await;
        }
    }

    /// 目标文件的完整路径：`download_dir/<name>`。
    pub fn destination_path(&self, destination_name: &str) -> PathBuf {
        self.config.destination_path(destination_name)
    }

    /// 在持有注册表锁时启动一个新传输任务。
    fn spawn_transfer(&self, url: &Url, entry: &mut DownloadEntry) {
        entry.generation += 1;
        let generation = entry.generation;
        let cancel = CancellationToken::new();

        let ctx = TransferContext {
            url: url.clone(),
            destination: self.config.destination_path(&entry.destination_name),
            staging_path: staging_path_for(&self.config.staging_dir, url),
            strategy: self.config.resume_strategy,
            buffer_size: self.config.buffer_size,
            resume_token: entry.resume_token.take(),
            transport: Arc::clone(&self.transport),
            reporter: ProgressReporter::new(
                entry.sink.clone(),
                entry.progress.clone(),
                self.config.estimated_size,
            ),
            cancel: cancel.clone(),
        };

        let registry = Arc::clone(&self.registry);
        let key = url.as_str().to_string();
        let handle = tokio::spawn(async move {
            let result = match AssertUnwindSafe(run_transfer(ctx)).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(DownloadError::TaskPanicked),
            };
            finish_transfer(&registry, &key, generation, result).await;
        });

        let finished = async move {
            let _ = handle.await;
        }
        .boxed()
        .shared();

        debug!(%url, generation, "传输任务已启动");
        entry.active = Some(ActiveTransfer {
            generation,
            cancel,
            finished,
        });
    }
}

impl std::fmt::Debug for DownloadEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// 传输任务的收尾：把结果写回注册表。条目已被删除或已换成新任务时丢弃结果。
async fn finish_transfer(
    registry: &Mutex<HashMap<String, DownloadEntry>>,
    key: &str,
    generation: u64,
    result: Result<TransferOutcome, DownloadError>,
) {
    let mut registry = registry.lock().await;
    let current = registry.get_mut(key).filter(|entry| {
        entry
            .active
            .as_ref()
            .is_some_and(|active| active.generation == generation)
    });
    let Some(entry) = current else {
        debug!(url = key, generation, "过期的传输结果，丢弃");
        if let Ok(TransferOutcome::Paused { token: Some(token) }) = result {
            let _ = remove_if_exists(token.staging_path()).await;
        }
        return;
    };

    entry.active = None;
    match result {
        Ok(TransferOutcome::Completed(update)) => {
            entry.resume_token = None;
            if update.is_completion() || update.is_empty_completion() {
                entry.set_status(DownloadStatus::Completed);
                info!(url = key, bytes = ?update.bytes_downloaded, "下载完成");
            } else {
                entry.set_status(DownloadStatus::Paused);
            }
        }
        Ok(TransferOutcome::Paused { token }) => {
            debug!(url = key, staged = token.is_some(), "传输已取消");
            entry.resume_token = token;
            entry.set_status(DownloadStatus::Paused);
        }
        Err(e) => {
            let status = e.settled_status();
            warn!(url = key, error = %e, ?status, "传输失败");
            entry.set_status(status);
        }
    }
}

/// URL 最后一个非空路径段（百分号解码），没有时回退为 `"download"`。
fn default_destination_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
        .filter(|name| validate_destination_name(name).is_ok())
        .unwrap_or_else(|| FALLBACK_DESTINATION_NAME.to_string())
}

/// 保存文件名只能是 `download_dir` 下的单个文件名。
fn validate_destination_name(name: &str) -> Result<(), DownloadError> {
    let invalid = name.is_empty()
        || name.contains("..")
        || name.contains(['/', '\\', '\0'])
        || Path::new(name).is_absolute();
    if invalid {
        return Err(DownloadError::InvalidDestinationName(name.to_string()));
    }
    Ok(())
}

/// 删除暂存目录中上个进程留下的 `.part` 文件；目录不存在时忽略。
async fn purge_staging_dir(staging_dir: &Path) {
    let mut dir = match tokio::fs::read_dir(staging_dir).await {
        Ok(dir) => dir,
        Err(_) => return,
    };
    let mut purged = 0usize;
    while let Ok(Some(item)) = dir.next_entry().await {
        let path = item.path();
        if path.extension().is_some_and(|ext| ext == STAGING_EXTENSION) {
            match remove_if_exists(&path).await {
                Ok(()) => purged += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "清理残留暂存文件失败"),
            }
        }
    }
    if purged > 0 {
        debug!(purged, "已清理残留暂存文件");
    }
}
