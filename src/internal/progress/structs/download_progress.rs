/// 下载进度：响应式状态，记录已下载字节数、总大小与本轮传输速度。
///
/// 调用方通过引擎的 `watch_progress()` 读取或监听；进度比例可用 [`DownloadProgress::pct`] 获取。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadProgress {
    /// 已下载的文件大小（字节），包含续传前已在磁盘上的部分
    pub bytes_done: u64,
    /// 文件总大小（字节）；服务器未声明时为滚动估算值，尚未开始过传输时为 `None`
    pub total: Option<u64>,
    /// 本轮传输的平均速度（字节/秒）
    pub bytes_per_sec: f64,
}

impl DownloadProgress {
    /// 进度百分比（0～100）；总大小为 0 或未知时返回 `f64::NAN`。
    pub fn pct(&self) -> f64 {
        self.total
            .filter(|&t| t > 0)
            .map(|t| (self.bytes_done as f64 / t as f64) * 100.0)
            .unwrap_or(f64::NAN)
    }
}
