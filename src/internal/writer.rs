//! 写盘：缓冲追加写入器与文件级辅助函数（大小查询、移动/追加合并）。

pub mod chunk_writer;
pub mod file_ops;

pub use chunk_writer::{ChunkWriter, DEFAULT_BUFFER_SIZE};
pub use file_ops::file_size;
