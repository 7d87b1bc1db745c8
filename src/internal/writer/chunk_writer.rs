//! 缓冲追加写入器：把流式到达的小块数据攒到阈值后再一次性写盘。

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::internal::download_error::DownloadError;

/// 默认写缓冲阈值：64 KiB
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// 以追加模式写入目标文件的缓冲写入器。
///
/// `on_disk_len` 只统计已经写入文件的字节，缓冲区里的数据不计入。
#[derive(Debug)]
pub struct ChunkWriter {
    path: PathBuf,
    file: File,
    buffer: Vec<u8>,
    threshold: usize,
    on_disk_len: u64,
}

impl ChunkWriter {
    /// 以追加模式打开（不存在则创建，必要时创建父目录）。打开失败返回 `CannotOpenFile`。
    pub async fn open_append(
        path: impl AsRef<Path>,
        threshold: usize,
    ) -> Result<Self, DownloadError> {
        let path = path.as_ref().to_path_buf();
        let cannot_open = |source| DownloadError::CannotOpenFile {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(cannot_open)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(cannot_open)?;
        let on_disk_len = file.metadata().await.map_err(cannot_open)?.len();
        let threshold = threshold.max(1);

        Ok(Self {
            path,
            file,
            buffer: Vec::with_capacity(threshold),
            threshold,
            on_disk_len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 已落盘的字节数（含打开前文件已有的内容）。
    pub fn on_disk_len(&self) -> u64 {
        self.on_disk_len
    }

    /// 缓冲区中尚未落盘的字节数。
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// 写入一段数据；缓冲区达到阈值时落盘并返回新的落盘大小，否则返回 `None`。
    pub async fn write(&mut self, bytes: &[u8]) -> Result<Option<u64>, DownloadError> {
        if bytes.is_empty() {
            return Ok(None);
        }
        self.buffer.extend_from_slice(bytes);
        if self.buffer.len() >= self.threshold {
            return self.flush().await.map(Some);
        }
        Ok(None)
    }

    /// 把缓冲区写入文件，返回落盘大小。缓冲区为空时不产生写操作。
    pub async fn flush(&mut self) -> Result<u64, DownloadError> {
        if self.buffer.is_empty() {
            return Ok(self.on_disk_len);
        }
        self.file
            .write_all(&self.buffer)
            .await
            .map_err(DownloadError::WriteFile)?;
        self.file.flush().await.map_err(DownloadError::FlushFile)?;
        self.on_disk_len += self.buffer.len() as u64;
        self.buffer.clear();
        Ok(self.on_disk_len)
    }

    /// 写出最后不满阈值的缓冲并同步到磁盘，返回最终大小。
    pub async fn finish(mut self) -> Result<u64, DownloadError> {
        let len = self.flush().await?;
        self.file.sync_all().await.map_err(DownloadError::FlushFile)?;
        Ok(len)
    }
}
