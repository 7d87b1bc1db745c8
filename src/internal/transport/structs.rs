pub mod http_transport;
pub mod resume_token;
pub mod transfer_request;

// 重导出公共类型
pub use http_transport::HttpTransport;
pub use resume_token::{RecoveredPartial, ResumeToken};
pub use transfer_request::{BodyStream, TransferRequest, TransportResponse};
