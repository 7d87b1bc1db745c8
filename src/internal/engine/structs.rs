pub mod download_engine;
pub(crate) mod download_entry;
pub mod download_snapshot;
pub mod download_status;
pub mod engine_config;

// 重导出公共类型
pub use download_engine::DownloadEngine;
pub use download_snapshot::DownloadSnapshot;
pub use download_status::DownloadStatus;
pub use engine_config::{EngineConfig, ResumeStrategy};
