//! 传输层：单次 HTTP GET（可选 Range 头）+ 流式响应体，以及暂存数据的续传令牌。
//!
//! 对外导出以 [`crate::transport`] 为准，此处仅做模块划分。

pub mod structs;
pub mod traits;
