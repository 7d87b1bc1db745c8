//! 直接追加模式：响应体写入目标文件末尾，续传起点就是目标文件大小。

use tracing::debug;

use crate::internal::download_error::DownloadError;
use crate::internal::engine::transfer::response_check::{ResponsePlan, check_response};
use crate::internal::engine::transfer::{
    PumpEnd, PumpParams, TransferContext, TransferOutcome, ensure_complete, fetch_or_cancel,
    pump_body,
};
use crate::internal::transport::structs::TransferRequest;
use crate::internal::writer::{ChunkWriter, file_size};

pub(super) async fn run(ctx: TransferContext) -> Result<TransferOutcome, DownloadError> {
    let TransferContext {
        url,
        destination,
        buffer_size,
        transport,
        mut reporter,
        cancel,
        ..
    } = ctx;

    let offset = file_size(&destination).await.unwrap_or(0);
    debug!(%url, offset, "开始传输（直接追加）");

    let request = TransferRequest::new(url, offset);
    let Some(response) = fetch_or_cancel(transport.as_ref(), request, &cancel).await? else {
        return Ok(TransferOutcome::Paused { token: None });
    };

    let (skip, total) = match check_response(&response, offset)? {
        ResponsePlan::AlreadyComplete { total } => {
            return Ok(TransferOutcome::Completed(reporter.finish(total)));
        }
        ResponsePlan::Append { skip, total } => (skip, total),
    };

    let mut writer = ChunkWriter::open_append(&destination, buffer_size).await?;
    reporter.start(offset, total);

    let end = pump_body(PumpParams {
        body: response.body,
        writer: &mut writer,
        reporter: &mut reporter,
        cancel: &cancel,
        base: 0,
        skip,
    })
    .await?;

    match end {
        PumpEnd::Cancelled => Ok(TransferOutcome::Paused { token: None }),
        PumpEnd::Finished => {
            let written = writer.finish().await?;
            ensure_complete(written, total)?;
            Ok(TransferOutcome::Completed(reporter.finish(written)))
        }
    }
}
