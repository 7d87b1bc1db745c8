//! 下载相关错误类型。

use std::path::PathBuf;

use thiserror::Error;

use crate::internal::engine::structs::download_status::DownloadStatus;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP 请求失败: {0}")]
    Request(#[from] reqwest::Error),

    /// 非 reqwest 传输层的中断（连接重置等）。
    #[error("传输中断: {0}")]
    Stream(String),

    /// 响应体正常结束，但字节数少于服务器声明的长度。
    #[error("响应体提前结束: 收到 {received} 字节，声明 {expected} 字节")]
    IncompleteBody { received: u64, expected: u64 },

    #[error("无法打开文件 {path}: {source}")]
    CannotOpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("写入文件失败: {0}")]
    WriteFile(std::io::Error),

    #[error("刷新文件失败: {0}")]
    FlushFile(std::io::Error),

    #[error("合并暂存文件失败: {0}")]
    MergeFile(std::io::Error),

    #[error("删除临时文件失败: {0}")]
    RemoveTempFile(std::io::Error),

    #[error("服务器返回错误状态码: {status}")]
    ServerError { status: u16 },

    #[error("服务器无法满足 Range 请求")]
    RangeNotSatisfiable,

    #[error("未知的下载: {0}")]
    UnknownDownload(String),

    #[error("非法的保存文件名: {0}")]
    InvalidDestinationName(String),

    #[error("下载记录读写失败: {0}")]
    RecordStoreIo(std::io::Error),

    #[error("下载记录格式错误: {0}")]
    RecordStoreFormat(#[from] serde_json::Error),

    #[error("无法定位应用数据目录")]
    NoAppDir,

    #[error("暂不支持: {0}")]
    Unsupported(&'static str),

    #[error("传输任务异常退出")]
    TaskPanicked,
}

impl DownloadError {
    /// 一次失败的传输尝试结束后，条目应落到的状态。
    ///
    /// 服务端拒绝（4xx/5xx、Range 不可满足）是软停止，回到 `Paused`；
    /// 网络与磁盘故障进入 `Error`，不会自动重试。
    pub fn settled_status(&self) -> DownloadStatus {
        match self {
            DownloadError::ServerError { .. } | DownloadError::RangeNotSatisfiable => {
                DownloadStatus::Paused
            }
            _ => DownloadStatus::Error,
        }
    }

    pub(crate) fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            DownloadError::Request(_)
                | DownloadError::Stream(_)
                | DownloadError::IncompleteBody { .. }
        )
    }
}
