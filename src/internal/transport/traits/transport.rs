//! 传输层 trait：引擎只通过它发起请求，测试可以换成脚本化实现。

use async_trait::async_trait;
use tokio::fs;

use crate::internal::download_error::DownloadError;
use crate::internal::transport::structs::{
    RecoveredPartial, ResumeToken, TransferRequest, TransportResponse,
};

/// 单次 HTTP 传输。
///
/// 实现方只负责发请求、交回响应头信息与流式响应体；状态码的解释由引擎完成。
/// 超时沿用底层客户端的默认值。
#[async_trait]
pub trait Transport: Send + Sync {
    /// 发起 GET 请求；`request.range_start` 为 `Some(n)` 时带 `Range: bytes=n-`。
    async fn fetch(&self, request: TransferRequest) -> Result<TransportResponse, DownloadError>;

    /// 解读续传令牌，返回被中断传输已写下的数据；没有可恢复数据时返回 `Ok(None)`。
    ///
    /// 默认实现读取令牌指向的暂存文件，空文件会被删除并视为没有数据。
    async fn recover_partial_data(
        &self,
        token: ResumeToken,
    ) -> Result<Option<RecoveredPartial>, DownloadError> {
        let path = token.staging_path().to_path_buf();
        let len = match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => return Ok(None),
        };
        if len == 0 {
            let _ = fs::remove_file(&path).await;
            return Ok(None);
        }
        Ok(Some(RecoveredPartial::new(path, len)))
    }
}
