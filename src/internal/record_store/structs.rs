pub mod download_record;
pub mod json_file_record_store;
pub mod memory_record_store;

// 重导出公共类型
pub use download_record::DownloadRecord;
pub use json_file_record_store::JsonFileRecordStore;
pub use memory_record_store::MemoryRecordStore;
