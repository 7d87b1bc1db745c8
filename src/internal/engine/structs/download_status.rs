/// 下载状态（由引擎维护，外部只读监听）
///
/// `Invalid` 只作为未知 URL 的查询结果，从不写入注册表。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadStatus {
    #[default]
    Invalid,
    Paused,
    Running,
    Completed,
    Error,
}

impl DownloadStatus {
    /// 进入后不会自行离开的状态，只能由显式的 resume 重新开始。
    pub fn is_settled(&self) -> bool {
        matches!(self, DownloadStatus::Completed | DownloadStatus::Error)
    }
}
