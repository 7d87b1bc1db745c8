//! 续传令牌：暂存模式下被中断的传输留下的可恢复数据。
//!
//! 令牌对调用方是不透明的，只能交还给 [`crate::transport::Transport::recover_partial_data`] 解读。

use std::path::{Path, PathBuf};

use crate::internal::download_error::DownloadError;
use crate::internal::writer::file_ops::{move_or_append, remove_if_exists};

/// 被中断传输的续传令牌。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeToken {
    staging_path: PathBuf,
}

impl ResumeToken {
    pub(crate) fn new(staging_path: PathBuf) -> Self {
        Self { staging_path }
    }

    pub(crate) fn staging_path(&self) -> &Path {
        &self.staging_path
    }
}

/// 从令牌中恢复出的部分数据（仍在暂存文件中，未合并到目标文件）。
#[derive(Debug)]
pub struct RecoveredPartial {
    path: PathBuf,
    len: u64,
}

impl RecoveredPartial {
    pub(crate) fn new(path: PathBuf, len: u64) -> Self {
        Self { path, len }
    }

    /// 已恢复的字节数。
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// 把恢复的数据并入目标文件：目标不存在时直接移动，否则追加后删除暂存文件。
    pub async fn merge_into(self, destination: &Path) -> Result<u64, DownloadError> {
        move_or_append(&self.path, destination).await?;
        Ok(self.len)
    }

    /// 丢弃恢复的数据。
    pub async fn discard(self) -> Result<(), DownloadError> {
        remove_if_exists(&self.path).await
    }

    /// 不消费数据，重新包装成令牌（例如新一轮传输在开始前就被取消）。
    pub fn into_token(self) -> ResumeToken {
        ResumeToken::new(self.path)
    }
}
