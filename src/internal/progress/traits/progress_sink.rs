//! 进度接收端 trait，以及传输任务与注册表共享的接收端插槽。

use std::sync::{Arc, Mutex};

/// 进度接收端：由传输任务在后台执行上下文中调用。
///
/// 需要回到 UI 线程的调用方自行转发。闭包 `Fn(Option<u64>, Option<u64>)` 直接实现本 trait。
pub trait ProgressSink: Send + Sync {
    /// `bytes_downloaded` / `total_bytes` 为 `None` 表示该字段未变化。
    fn on_progress(&self, bytes_downloaded: Option<u64>, total_bytes: Option<u64>);
}

impl<F> ProgressSink for F
where
    F: Fn(Option<u64>, Option<u64>) + Send + Sync,
{
    fn on_progress(&self, bytes_downloaded: Option<u64>, total_bytes: Option<u64>) {
        self(bytes_downloaded, total_bytes)
    }
}

/// 可替换的接收端插槽：`resume_download` 写入，运行中的传输任务每次通知时读取（后写者生效）。
#[derive(Clone, Default)]
pub struct SinkSlot {
    inner: Arc<Mutex<Option<Arc<dyn ProgressSink>>>>,
}

impl SinkSlot {
    pub fn new(sink: Option<Arc<dyn ProgressSink>>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sink)),
        }
    }

    /// 替换接收端，返回旧的接收端。
    pub fn replace(&self, sink: Option<Arc<dyn ProgressSink>>) -> Option<Arc<dyn ProgressSink>> {
        match self.inner.lock() {
            Ok(mut guard) => std::mem::replace(&mut *guard, sink),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), sink),
        }
    }

    pub fn current(&self) -> Option<Arc<dyn ProgressSink>> {
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 转发一次通知；锁只用于取出接收端，回调在锁外执行。
    pub fn notify(&self, bytes_downloaded: Option<u64>, total_bytes: Option<u64>) {
        if let Some(sink) = self.current() {
            sink.on_progress(bytes_downloaded, total_bytes);
        }
    }
}

impl std::fmt::Debug for SinkSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let attached = self.current().is_some();
        f.debug_struct("SinkSlot")
            .field("attached", &attached)
            .finish()
    }
}
