//! 下载引擎：注册表、状态机，以及每个下载对应的可取消传输任务。

pub mod structs;
pub(crate) mod transfer;
