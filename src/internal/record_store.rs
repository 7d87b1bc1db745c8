//! 下载记录的持久化：`{url, destination_name}`，进程重启后由引擎重新加载。

pub mod structs;
pub mod traits;
