//! 基于 reqwest 的传输层实现。

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{CONTENT_RANGE, HeaderMap, RANGE};
use reqwest::Client;

use crate::internal::download_error::DownloadError;
use crate::internal::transport::structs::{TransferRequest, TransportResponse};
use crate::internal::transport::traits::Transport;

/// HTTP 传输：一次请求对应一次 `fetch`，连接池由内部的 [`Client`] 复用。
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// 使用默认客户端创建。
    pub fn new() -> Result<Self, DownloadError> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }

    /// 使用调用方配置好的客户端（代理、证书等）。
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: TransferRequest) -> Result<TransportResponse, DownloadError> {
        let mut builder = self.client.get(request.url.clone());
        if let Some(range) = request.range_header() {
            builder = builder.header(RANGE, range);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let content_length = resp.content_length();
        let (content_range_start, content_range_total) = content_range(resp.headers());

        let body = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(DownloadError::Request))
            .boxed();

        Ok(TransportResponse {
            status,
            content_length,
            content_range_start,
            content_range_total,
            body,
        })
    }
}

/// `Content-Range` 头中的 (起始位置, 总长度)。
fn content_range(headers: &HeaderMap) -> (Option<u64>, Option<u64>) {
    match headers.get(CONTENT_RANGE).and_then(|v| v.to_str().ok()) {
        Some(value) => (
            parse_content_range_start(value),
            parse_content_range_total(value),
        ),
        None => (None, None),
    }
}

/// 解析 `bytes 400-999/1000` 中的起始位置 400；`bytes */1000` 没有起始位置。
pub(crate) fn parse_content_range_start(value: &str) -> Option<u64> {
    let range = value.trim().strip_prefix("bytes")?.trim_start();
    let (start, _) = range.split_once('-')?;
    start.trim().parse().ok()
}

/// 解析 `bytes 400-999/1000` 或 `bytes */1000` 中的总长度；`*` 表示未知。

pub(crate) fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.trim().parse().ok()
}

