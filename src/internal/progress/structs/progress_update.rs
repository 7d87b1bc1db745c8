/// 一次进度通知。任一字段为 `None` 表示"未变化"，接收方不应覆盖已有值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressUpdate {
    pub bytes_downloaded: Option<u64>,
    pub total_bytes: Option<u64>,
}

impl ProgressUpdate {
    pub fn new(bytes_downloaded: Option<u64>, total_bytes: Option<u64>) -> Self {
        Self {
            bytes_downloaded,
            total_bytes,
        }
    }

    /// 传输结束标记：两个字段都存在、相等且非零。
    pub fn is_completion(&self) -> bool {
        matches!(
            (self.bytes_downloaded, self.total_bytes),
            (Some(done), Some(total)) if done == total && done > 0
        )
    }

    /// 空资源的结束通知 `(0, 0)`。
    pub(crate) fn is_empty_completion(&self) -> bool {
        self.bytes_downloaded == Some(0) && self.total_bytes == Some(0)
    }
}
