use std::path::PathBuf;

use crate::internal::download_error::DownloadError;
use crate::internal::progress::structs::DEFAULT_ESTIMATED_SIZE;
use crate::internal::writer::DEFAULT_BUFFER_SIZE;

const STAGING_DIR_NAME: &str = ".staging";

/// 续传策略，对同一个引擎运行的所有下载生效。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumeStrategy {
    /// 响应体直接追加到目标文件，续传起点就是目标文件大小。
    #[default]
    StreamingMerge,
    /// 响应体先写入私有暂存文件，成功后再并入目标文件；暂停时留下续传令牌。
    Staged,
}

/// 引擎配置。
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub download_dir: PathBuf,
    /// 暂存文件目录，默认 `download_dir/.staging`
    pub staging_dir: PathBuf,
    /// 写缓冲阈值（字节）
    pub buffer_size: usize,
    /// 未声明长度时的估算步长（字节）
    pub estimated_size: u64,
    pub resume_strategy: ResumeStrategy,
}

impl EngineConfig {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        let download_dir = download_dir.into();
        Self {
            staging_dir: download_dir.join(STAGING_DIR_NAME),
            download_dir,
            buffer_size: DEFAULT_BUFFER_SIZE,
            estimated_size: DEFAULT_ESTIMATED_SIZE,
            resume_strategy: ResumeStrategy::default(),
        }
    }

    /// 应用私有下载目录：`<data_dir>/<app_name>/downloads`。
    pub fn for_app(app_name: &str) -> Result<Self, DownloadError> {
        let data_dir = dirs::data_dir().ok_or(DownloadError::NoAppDir)?;
        Ok(Self::new(data_dir.join(app_name).join("downloads")))
    }

    pub fn staging_dir(mut self, staging_dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = staging_dir.into();
        self
    }

    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn estimated_size(mut self, estimated_size: u64) -> Self {
        self.estimated_size = estimated_size.max(1);
        self
    }

    pub fn resume_strategy(mut self, strategy: ResumeStrategy) -> Self {
        self.resume_strategy = strategy;
        self
    }

    /// 目标文件的完整路径。
    pub fn destination_path(&self, destination_name: &str) -> PathBuf {
        self.download_dir.join(destination_name)
    }
}
