use std::fmt;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use url::Url;

use crate::internal::download_error::DownloadError;

/// 流式响应体：每一项是一段字节或一次传输错误。
pub type BodyStream = BoxStream<'static, Result<Bytes, DownloadError>>;

/// 单次传输请求。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub url: Url,
    /// 续传起点；`None` 或 `Some(0)` 时不带 Range 头
    pub range_start: Option<u64>,
}

impl TransferRequest {
    pub fn new(url: Url, range_start: u64) -> Self {
        Self {
            url,
            range_start: (range_start > 0).then_some(range_start),
        }
    }

    /// `Range` 请求头的值：`bytes=<offset>-`。
    pub fn range_header(&self) -> Option<String> {
        self.range_start.map(|start| format!("bytes={}-", start))
    }
}

/// 传输层返回的响应：状态码、长度信息与尚未读取的响应体。
pub struct TransportResponse {
    pub status: u16,
    /// 服务器声明的 `Content-Length`，未声明（chunked 等）时为 `None`
    pub content_length: Option<u64>,
    /// `Content-Range` 中响应体的起始位置
    pub content_range_start: Option<u64>,
    /// `Content-Range` 中 `/` 之后的资源总长度
    pub content_range_total: Option<u64>,
    pub body: BodyStream,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .field("content_range_start", &self.content_range_start)
            .field("content_range_total", &self.content_range_total)
            .field("body", &"<stream>")
            .finish()
    }
}
