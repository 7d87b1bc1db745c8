//! 进度上报器：一次传输内的进度通知全部经由它发出。
//!
//! - 已下载字节单调不减，较小的值直接丢弃；
//! - 服务器未声明长度时维护滚动估算总量，超出估算时增长并重新通告；
//! - 每次通知同时写入响应式快照，供 `watch_progress` 的监听方读取。

use std::time::Instant;

use crate::internal::progress::structs::{DownloadProgress, ProgressUpdate};
use crate::internal::progress::traits::SinkSlot;
use crate::internal::states::unlock_reactive::UnlockReactiveProperty;

/// 未声明长度时的估算步长：1 000 000 字节
pub const DEFAULT_ESTIMATED_SIZE: u64 = 1_000_000;

#[derive(Debug)]
pub struct ProgressReporter {
    sink: SinkSlot,
    state: UnlockReactiveProperty<DownloadProgress>,
    estimate_step: u64,
    declared_total: Option<u64>,
    announced_total: Option<u64>,
    last_bytes: Option<u64>,
    session_start: u64,
    started_at: Instant,
}

impl ProgressReporter {
    pub fn new(
        sink: SinkSlot,
        state: UnlockReactiveProperty<DownloadProgress>,
        estimate_step: u64,
    ) -> Self {
        Self {
            sink,
            state,
            estimate_step: estimate_step.max(1),
            declared_total: None,
            announced_total: None,
            last_bytes: None,
            session_start: 0,
            started_at: Instant::now(),
        }
    }

    /// 传输开始：`offset` 为已在磁盘上的字节，`total` 为服务器声明的总长度。
    pub fn start(&mut self, offset: u64, total: Option<u64>) -> ProgressUpdate {
        self.session_start = offset;
        self.started_at = Instant::now();
        self.declared_total = total;
        let announced = match total {
            Some(t) => t,
            None => offset.saturating_add(self.estimate_step),
        };
        self.announced_total = Some(announced);
        self.emit(Some(offset), Some(announced))
    }

    /// 传输中的进度。总量已声明且未被超出时只带字节数；否则按估算步长增长总量。
    pub fn advance(&mut self, bytes: u64) -> Option<ProgressUpdate> {
        if self.last_bytes.is_some_and(|last| bytes < last) {
            return None;
        }

        let exceeded = self.announced_total.is_none_or(|t| bytes > t);
        let needs_estimate = self.declared_total.is_none_or(|t| bytes > t);
        let total = if exceeded && needs_estimate {
            let grown = bytes.saturating_add(self.estimate_step);
            self.announced_total = Some(grown);
            Some(grown)
        } else {
            None
        };
        Some(self.emit(Some(bytes), total))
    }

    /// 传输结束：发出 `(n, n)`，这是引擎判定完成的唯一依据。
    ///
    /// 调用方须先确认字节数达到了声明的总长度。
    pub fn finish(&mut self, bytes: u64) -> ProgressUpdate {
        let bytes = self.last_bytes.map_or(bytes, |last| bytes.max(last));
        self.announced_total = Some(bytes);
        self.emit(Some(bytes), Some(bytes))
    }

    pub fn last_bytes(&self) -> Option<u64> {
        self.last_bytes
    }

    fn emit(&mut self, bytes: Option<u64>, total: Option<u64>) -> ProgressUpdate {
        if let Some(b) = bytes {
            self.last_bytes = Some(b);
        }
        let update = ProgressUpdate::new(bytes, total);

        // 接收端先于快照收到通知
        self.sink.notify(bytes, total);
        let speed = self.speed();
        let _ = self.state.update_field(|p| {
            if let Some(b) = bytes {
                p.bytes_done = b;
            }
            if let Some(t) = total {
                p.total = Some(t);
            }
            p.bytes_per_sec = speed;
        });
        update
    }

    fn speed(&self) -> f64 {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        let session_bytes = self
            .last_bytes
            .unwrap_or(self.session_start)
            .saturating_sub(self.session_start);
        if elapsed > 0.0 {
            session_bytes as f64 / elapsed
        } else {
            0.0
        }
    }
}
