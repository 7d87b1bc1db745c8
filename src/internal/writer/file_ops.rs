//! 文件级辅助：大小查询、暂存文件合并与清理。

use std::io::ErrorKind;
use std::path::Path;

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::internal::download_error::DownloadError;

/// 查询文件大小；文件不存在（或不是普通文件）时返回 `None`，表示从头开始下载。
pub async fn file_size(path: impl AsRef<Path>) -> Option<u64> {
    match fs::metadata(path.as_ref()).await {
        Ok(meta) if meta.is_file() => Some(meta.len()),
        _ => None,
    }
}

/// 把 `source` 并入 `destination`：目标不存在时重命名过去，否则把内容追加到目标末尾再删除 `source`。
pub(crate) async fn move_or_append(source: &Path, destination: &Path) -> Result<(), DownloadError> {
    if file_size(destination).await.is_none() {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(DownloadError::MergeFile)?;
        }
        // 跨文件系统时 rename 会失败，退回到追加拷贝
        if fs::rename(source, destination).await.is_ok() {
            return Ok(());
        }
    }

    let mut src = fs::File::open(source).await.map_err(DownloadError::MergeFile)?;
    let mut dest = OpenOptions::new()
        .create(true)
        .append(true)
        .open(destination)
        .await
        .map_err(|e| DownloadError::CannotOpenFile {
            path: destination.to_path_buf(),
            source: e,
        })?;
    tokio::io::copy(&mut src, &mut dest)
        .await
        .map_err(DownloadError::MergeFile)?;
    dest.flush().await.map_err(DownloadError::FlushFile)?;
    dest.sync_all().await.map_err(DownloadError::FlushFile)?;
    drop(src);

    remove_if_exists(source).await
}

/// 删除文件，不存在时视为成功。
pub(crate) async fn remove_if_exists(path: &Path) -> Result<(), DownloadError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DownloadError::RemoveTempFile(e)),
    }
}
