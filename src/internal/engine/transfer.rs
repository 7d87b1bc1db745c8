//! 单次传输任务：发请求、解释响应、把响应体写盘，并交回一个 [`TransferOutcome`]。
//!
//! 任务本身不碰注册表，结果由引擎在任务结尾统一写回。

mod response_check;
mod staged;
mod streaming;

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::internal::download_error::DownloadError;
use crate::internal::engine::structs::ResumeStrategy;
use crate::internal::progress::structs::{ProgressReporter, ProgressUpdate};
use crate::internal::transport::structs::{BodyStream, ResumeToken, TransferRequest, TransportResponse};
use crate::internal::transport::traits::Transport;
use crate::internal::writer::ChunkWriter;

pub(crate) use staged::{STAGING_EXTENSION, staging_path_for};

/// 一次传输的结果。失败以 `Err(DownloadError)` 返回。
#[derive(Debug)]
pub(crate) enum TransferOutcome {
    /// 携带最后一次 `(n, n)` 通知
    Completed(ProgressUpdate),
    /// 被取消；暂存模式下带回续传令牌
    Paused { token: Option<ResumeToken> },
}

/// 启动一次传输所需的参数（形参超过 3 个，用 struct 承载）。
pub(crate) struct TransferContext {
    pub(crate) url: Url,
    pub(crate) destination: PathBuf,
    pub(crate) staging_path: PathBuf,
    pub(crate) strategy: ResumeStrategy,
    pub(crate) buffer_size: usize,
    pub(crate) resume_token: Option<ResumeToken>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) reporter: ProgressReporter,
    pub(crate) cancel: CancellationToken,
}

pub(crate) async fn run_transfer(ctx: TransferContext) -> Result<TransferOutcome, DownloadError> {
    match ctx.strategy {
        ResumeStrategy::StreamingMerge => streaming::run(ctx).await,
        ResumeStrategy::Staged => staged::run(ctx).await,
    }
}

/// 发起请求；在响应头到达前被取消时返回 `Ok(None)`。
async fn fetch_or_cancel(
    transport: &dyn Transport,
    request: TransferRequest,
    cancel: &CancellationToken,
) -> Result<Option<TransportResponse>, DownloadError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Ok(None),
        resp = transport.fetch(request) => resp.map(Some),
    }
}

/// 响应体正常结束后核对长度：少于声明的总长度说明连接提前断开，不能判定为完成。
fn ensure_complete(received: u64, total: Option<u64>) -> Result<(), DownloadError> {
    match total {
        Some(expected) if received < expected => {
            Err(DownloadError::IncompleteBody { received, expected })
        }
        _ => Ok(()),
    }
}

/// 响应体读取结束的方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpEnd {
    Finished,
    Cancelled,
}

/// 把响应体写入 `writer` 的参数。
struct PumpParams<'a> {
    body: BodyStream,
    writer: &'a mut ChunkWriter,
    reporter: &'a mut ProgressReporter,
    cancel: &'a CancellationToken,
    /// 上报进度时加在 writer 落盘大小之上的字节数
    base: u64,
    /// 响应体开头需要跳过的字节数（服务器忽略了 Range）
    skip: u64,
}

/// 逐块读取响应体并写盘。
///
/// 每读一块之前先检查取消；取消或传输中断时先把缓冲写出再返回，落盘部分始终是完整前缀。
async fn pump_body(params: PumpParams<'_>) -> Result<PumpEnd, DownloadError> {
    let PumpParams {
        mut body,
        writer,
        reporter,
        cancel,
        base,
        mut skip,
    } = params;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let on_disk = writer.flush().await?;
                reporter.advance(base + on_disk);
                return Ok(PumpEnd::Cancelled);
            }
            chunk = body.next() => chunk,
        };

        let chunk = match next {
            None => return Ok(PumpEnd::Finished),
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => {
                if let Ok(on_disk) = writer.flush().await {
                    reporter.advance(base + on_disk);
                }
                return Err(e);
            }
        };

        let mut data = &chunk[..];
        if skip > 0 {
            let n = skip.min(data.len() as u64) as usize;
            skip -= n as u64;
            data = &data[n..];
        }

        if let Some(on_disk) = writer.write(data).await? {
            reporter.advance(base + on_disk);
        }
    }
}
