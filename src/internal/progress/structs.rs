pub mod download_progress;
pub mod progress_reporter;
pub mod progress_update;

// 重导出公共类型
pub use download_progress::DownloadProgress;
pub use progress_reporter::{DEFAULT_ESTIMATED_SIZE, ProgressReporter};
pub use progress_update::ProgressUpdate;
