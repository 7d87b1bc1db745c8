/// 内部导出的模块
mod internal;


/// 下载引擎入口：注册表、状态机与控制 API
pub mod engine {
    use crate::internal;
    pub use internal::engine::structs::*;
}

pub mod error {
    use crate::internal;
    pub use internal::download_error::DownloadError;
}

/// 传输层：trait 与基于 reqwest 的默认实现，调用方可以换成自己的实现
pub mod transport {
    use crate::internal;
    pub use internal::transport::structs::*;
    pub use internal::transport::traits::*;
}

pub mod progress {
    use crate::internal;
    pub use internal::progress::structs::*;
    pub use internal::progress::traits::*;
}

/// 下载记录持久化
pub mod record_store {
    use crate::internal;
    pub use internal::record_store::structs::*;
    pub use internal::record_store::traits::*;
}

pub mod writer {
    use crate::internal;
    pub use internal::writer::*;
}

pub mod states {
    pub mod unlock_reactive {
        use crate::internal;
        pub use internal::states::unlock_reactive::*;
    }
}

pub use engine::{DownloadEngine, DownloadStatus, EngineConfig, ResumeStrategy};
pub use error::DownloadError;
