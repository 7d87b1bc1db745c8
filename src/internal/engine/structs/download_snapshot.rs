use crate::internal::engine::structs::DownloadStatus;
use crate::internal::progress::structs::DownloadProgress;

/// `list_downloads` 返回的单条下载快照。
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSnapshot {
    pub url: String,
    pub destination_name: String,
    pub status: DownloadStatus,
    pub progress: DownloadProgress,
}
