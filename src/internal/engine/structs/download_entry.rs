use futures_util::future::{BoxFuture, Shared};
use tokio_util::sync::CancellationToken;

use crate::internal::engine::structs::{DownloadSnapshot, DownloadStatus};
use crate::internal::progress::structs::DownloadProgress;
use crate::internal::progress::traits::SinkSlot;
use crate::internal::states::unlock_reactive::UnlockReactiveProperty;
use crate::internal::transport::structs::ResumeToken;

/// 注册表中的一条下载，只在引擎方法中、持有注册表锁时修改。
#[derive(Debug)]
pub(crate) struct DownloadEntry {
    pub(crate) destination_name: String,
    pub(crate) status: UnlockReactiveProperty<DownloadStatus>,
    pub(crate) progress: UnlockReactiveProperty<DownloadProgress>,
    pub(crate) sink: SinkSlot,
    pub(crate) active: Option<ActiveTransfer>,
    /// 暂存模式下被暂停的传输留下的令牌
    pub(crate) resume_token: Option<ResumeToken>,
    /// 最近一次启动的传输任务编号
    pub(crate) generation: u64,
}

impl DownloadEntry {
    pub(crate) fn new(destination_name: String, status: DownloadStatus, bytes_on_disk: u64) -> Self {
        Self {
            destination_name,
            status: UnlockReactiveProperty::new(status),
            progress: UnlockReactiveProperty::new(DownloadProgress {
                bytes_done: bytes_on_disk,
                ..Default::default()
            }),
            sink: SinkSlot::default(),
            active: None,
            resume_token: None,
            generation: 0,
        }
    }

    pub(crate) fn current_status(&self) -> DownloadStatus {
        self.status.get_or_default()
    }

    pub(crate) fn set_status(&self, status: DownloadStatus) {
        let _ = self.status.update(status);
    }

    /// 当前任务是否仍在运行且未被请求取消。
    pub(crate) fn has_live_transfer(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.cancel.is_cancelled())
    }

    pub(crate) fn snapshot(&self, url: &str) -> DownloadSnapshot {
        DownloadSnapshot {
            url: url.to_string(),
            destination_name: self.destination_name.clone(),
            status: self.current_status(),
            progress: self.progress.get_or_default(),
        }
    }
}

/// 正在运行的传输任务句柄。
///
/// `finished` 在任务把结果写回注册表之后才完成，可被多个等待方共享。
#[derive(Clone)]
pub(crate) struct ActiveTransfer {
    pub(crate) generation: u64,
    pub(crate) cancel: CancellationToken,
    pub(crate) finished: Shared<BoxFuture<'static, ()>>,
}

impl std::fmt::Debug for ActiveTransfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveTransfer")
            .field("generation", &self.generation)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
