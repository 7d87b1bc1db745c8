//! 以单个 JSON 文件保存下载记录：`<dir>/downloads.json`。
//!
//! 每次修改都整体重写：先写同目录下的临时文件，再 rename 覆盖，
//! 进程在写入途中退出也不会留下半截的记录文件。

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::internal::download_error::DownloadError;
use crate::internal::record_store::structs::DownloadRecord;
use crate::internal::record_store::traits::RecordStore;

const RECORD_FILE_NAME: &str = "downloads.json";
const TEMP_FILE_NAME: &str = "downloads.json.tmp";

#[derive(Debug)]
pub struct JsonFileRecordStore {
    path: PathBuf,
    temp_path: PathBuf,
    // 串行化读-改-写
    write_lock: Mutex<()>,
}

impl JsonFileRecordStore {
    /// 在 `dir` 下打开记录文件；目录会在第一次写入时创建。
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            path: dir.join(RECORD_FILE_NAME),
            temp_path: dir.join(TEMP_FILE_NAME),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<DownloadRecord>, DownloadError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DownloadError::RecordStoreIo(e)),
        };
        if raw.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&raw)?)
    }

    async fn write_all(&self, records: &[DownloadRecord]) -> Result<(), DownloadError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(DownloadError::RecordStoreIo)?;
        }

        let data = serde_json::to_vec_pretty(records)?;
        let mut file = fs::File::create(&self.temp_path)
            .await
            .map_err(DownloadError::RecordStoreIo)?;
        file.write_all(&data)
            .await
            .map_err(DownloadError::RecordStoreIo)?;
        file.sync_all().await.map_err(DownloadError::RecordStoreIo)?;
        drop(file);

        fs::rename(&self.temp_path, &self.path)
            .await
            .map_err(DownloadError::RecordStoreIo)?;
        debug!(path = %self.path.display(), count = records.len(), "下载记录已写入");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonFileRecordStore {
    async fn list(&self) -> Result<Vec<DownloadRecord>, DownloadError> {
        let _guard = self.write_lock.lock().await;
        self.read_all().await
    }

    async fn add(&self, url: &str, destination_name: &str) -> Result<(), DownloadError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_all().await?;
        match records.iter_mut().find(|r| r.url == url) {
            Some(existing) => existing.destination_name = destination_name.to_string(),
            None => records.push(DownloadRecord::new(url, destination_name)),
        }
        self.write_all(&records).await
    }

    async fn delete(&self, url: &str) -> Result<(), DownloadError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_all().await?;
        let before = records.len();
        records.retain(|r| r.url != url);
        if records.len() == before {
            return Ok(());
        }
        self.write_all(&records).await
    }
}
