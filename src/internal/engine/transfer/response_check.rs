//! 根据状态码与长度头决定如何处理响应体。

use crate::internal::download_error::DownloadError;
use crate::internal::transport::structs::TransportResponse;

const PARTIAL_CONTENT: u16 = 206;
const RANGE_NOT_SATISFIABLE: u16 = 416;

/// 响应检查结果：资源已完整，或从某个位置开始追加响应体。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResponsePlan {
    AlreadyComplete { total: u64 },
    Append {
        /// 响应体开头需要丢弃的字节数
        skip: u64,
        /// 资源总长度，未声明时为 `None`
        total: Option<u64>,
    },
}

/// `offset` 为请求的续传起点（0 表示没有带 Range）。
pub(crate) fn check_response(
    response: &TransportResponse,
    offset: u64,
) -> Result<ResponsePlan, DownloadError> {
    match response.status {
        PARTIAL_CONTENT => {
            let start = response.content_range_start.unwrap_or(offset);
            // 响应体从续传起点之后开始，中间缺的字节无法补上
            if start > offset {
                return Err(DownloadError::RangeNotSatisfiable);
            }
            let total = response
                .content_length
                .map(|len| start + len)
                .or(response.content_range_total);
            Ok(ResponsePlan::Append {
                skip: offset - start,
                total,
            })
        }
        RANGE_NOT_SATISFIABLE => match response.content_range_total {
            Some(total) if total == offset => Ok(ResponsePlan::AlreadyComplete { total }),
            _ => Err(DownloadError::RangeNotSatisfiable),
        },
        // 200 等完整响应：服务器忽略了 Range，已在磁盘上的部分从响应体开头跳过
        _ if response.is_success() => match response.content_length {
            // 磁盘上的数据比服务器上的整个资源还长，无法接续
            Some(len) if len < offset => Err(DownloadError::RangeNotSatisfiable),
            total => Ok(ResponsePlan::Append {
                skip: offset,
                total,
            }),
        },
        status => Err(DownloadError::ServerError { status }),
    }
}
