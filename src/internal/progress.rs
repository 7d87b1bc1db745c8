//! 进度上报：通知对、快照状态与把两者串起来的上报器。

pub mod structs;
pub mod traits;
