//! 暂存模式：响应体先写入 `staging_dir/<sha256(url)>.part`，完整后再并入目标文件。
//!
//! - 暂停：暂存文件原样保留，交回续传令牌；
//! - 下一次传输：令牌交给 `recover_partial_data`，从"目标文件大小 + 已恢复字节"处续传，继续追加到同一个暂存文件；
//! - 服务器拒绝：丢弃已恢复的数据，目标文件不动；
//! - 传输中断或响应体短于声明长度：已收到的字节先并入目标文件，再报告错误。

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use url::Url;

use crate::internal::download_error::DownloadError;
use crate::internal::engine::transfer::response_check::{ResponsePlan, check_response};
use crate::internal::engine::transfer::{
    PumpEnd, PumpParams, TransferContext, TransferOutcome, ensure_complete, fetch_or_cancel,
    pump_body,
};
use crate::internal::transport::structs::{RecoveredPartial, ResumeToken, TransferRequest};
use crate::internal::writer::file_ops::{move_or_append, remove_if_exists};
use crate::internal::writer::{ChunkWriter, file_size};

pub(crate) const STAGING_EXTENSION: &str = "part";

/// 某个 URL 的暂存文件路径。
pub(crate) fn staging_path_for(staging_dir: &Path, url: &Url) -> PathBuf {
    let digest = Sha256::digest(url.as_str().as_bytes());
    let name: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    staging_dir.join(format!("{}.{}", name, STAGING_EXTENSION))
}

pub(super) async fn run(ctx: TransferContext) -> Result<TransferOutcome, DownloadError> {
    let TransferContext {
        url,
        destination,
        staging_path,
        buffer_size,
        resume_token,
        transport,
        mut reporter,
        cancel,
        ..
    } = ctx;

    let dest_len = file_size(&destination).await.unwrap_or(0);

    let (staging_path, recovered) = match resume_token {
        Some(token) => {
            let path = token.staging_path().to_path_buf();
            (path, transport.recover_partial_data(token).await?)
        }
        None => {
            // 没有令牌时残留的暂存数据与目标文件无法对齐，直接丢掉
            remove_if_exists(&staging_path).await?;
            (staging_path, None)
        }
    };
    let recovered_len = recovered.as_ref().map_or(0, RecoveredPartial::len);
    let offset = dest_len + recovered_len;
    debug!(%url, dest_len, recovered_len, "开始传输（暂存）");

    let request = TransferRequest::new(url, offset);
    let response = match fetch_or_cancel(transport.as_ref(), request, &cancel).await {
        Ok(Some(response)) => response,
        Ok(None) => {
            return Ok(TransferOutcome::Paused {
                token: recovered.map(RecoveredPartial::into_token),
            });
        }
        Err(e) => {
            if let Some(partial) = recovered {
                merge_after_failure(partial, &destination).await;
            }
            return Err(e);
        }
    };

    let (skip, total) = match check_response(&response, offset) {
        Ok(ResponsePlan::AlreadyComplete { total }) => {
            if let Some(partial) = recovered {
                partial.merge_into(&destination).await?;
            }
            return Ok(TransferOutcome::Completed(reporter.finish(total)));
        }
        Ok(ResponsePlan::Append { skip, total }) => (skip, total),
        Err(e) => {
            if let Some(partial) = recovered {
                partial.discard().await?;
            }
            return Err(e);
        }
    };

    let mut writer = ChunkWriter::open_append(&staging_path, buffer_size).await?;
    reporter.start(offset, total);

    let end = pump_body(PumpParams {
        body: response.body,
        writer: &mut writer,
        reporter: &mut reporter,
        cancel: &cancel,
        base: dest_len,
        skip,
    })
    .await;

    match end {
        Ok(PumpEnd::Cancelled) => {
            drop(writer);
            Ok(TransferOutcome::Paused {
                token: Some(ResumeToken::new(staging_path)),
            })
        }
        Ok(PumpEnd::Finished) => {
            let staged = writer.finish().await?;
            if let Err(e) = ensure_complete(dest_len + staged, total) {
                merge_after_failure(RecoveredPartial::new(staging_path, staged), &destination)
                    .await;
                return Err(e);
            }
            move_or_append(&staging_path, &destination).await?;
            Ok(TransferOutcome::Completed(reporter.finish(dest_len + staged)))
        }
        Err(e) => {
            let staged = writer.on_disk_len();
            drop(writer);
            if e.is_transport_failure() {
                merge_after_failure(RecoveredPartial::new(staging_path, staged), &destination)
                    .await;
            } else if let Err(cleanup) = remove_if_exists(&staging_path).await {
                warn!(error = %cleanup, "清理暂存文件失败");
            }
            Err(e)
        }
    }
}

/// 传输中断后把已收到的数据并入目标文件；合并本身失败只记日志，调用方报告原始错误。
async fn merge_after_failure(partial: RecoveredPartial, destination: &Path) {
    if partial.is_empty() {
        let _ = partial.discard().await;
        return;
    }
    let path = partial.path().display().to_string();
    match partial.merge_into(destination).await {
        Ok(merged) => debug!(merged, "中断前的数据已并入目标文件"),
        Err(e) => warn!(staging = %path, error = %e, "合并暂存文件失败"),
    }
}
