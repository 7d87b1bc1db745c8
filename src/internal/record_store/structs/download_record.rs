use serde::{Deserialize, Serialize};

/// 持久化的下载记录，身份为 `url`（解析后的字符串形式，区分大小写、精确匹配）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub url: String,
    pub destination_name: String,
}

impl DownloadRecord {
    pub fn new(url: impl Into<String>, destination_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            destination_name: destination_name.into(),
        }
    }
}
