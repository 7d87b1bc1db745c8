use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::internal::download_error::DownloadError;
use crate::internal::record_store::structs::DownloadRecord;
use crate::internal::record_store::traits::RecordStore;

/// 仅存在于内存中的记录存储，按插入顺序保存。适合测试与不需要持久化的场景。
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<DownloadRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用已有记录预填充（模拟上一次进程留下的数据）。
    pub fn with_records(records: Vec<DownloadRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list(&self) -> Result<Vec<DownloadRecord>, DownloadError> {
        Ok(self.records.lock().await.clone())
    }

    async fn add(&self, url: &str, destination_name: &str) -> Result<(), DownloadError> {
        let mut records = self.records.lock().await;
        match records.iter_mut().find(|r| r.url == url) {
            Some(existing) => existing.destination_name = destination_name.to_string(),
            None => records.push(DownloadRecord::new(url, destination_name)),
        }
        Ok(())
    }

    async fn delete(&self, url: &str) -> Result<(), DownloadError> {
        self.records.lock().await.retain(|r| r.url != url);
        Ok(())
    }
}
