use async_trait::async_trait;

use crate::internal::download_error::DownloadError;
use crate::internal::record_store::structs::DownloadRecord;

/// 下载记录存储：需要跨进程重启持久。
///
/// 引擎只在启动时调用一次 `list`；`add` / `delete` 失败只记日志，不回滚内存中的注册表。
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(&self) -> Result<Vec<DownloadRecord>, DownloadError>;

    /// 写入记录；同一 url 已存在时覆盖其文件名。
    async fn add(&self, url: &str, destination_name: &str) -> Result<(), DownloadError>;

    /// 删除记录；不存在时视为成功。
    async fn delete(&self, url: &str) -> Result<(), DownloadError>;
}
