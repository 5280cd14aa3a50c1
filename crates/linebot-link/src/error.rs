//! 远程链路层错误类型定义

use thiserror::Error;

/// 配置摄取错误
///
/// 只覆盖“整份文档无法解析”的情况；单个条目的字段校验失败不会报错，
/// 而是在 [`crate::IngestReport`] 里计入 `skipped`。
#[derive(Error, Debug)]
pub enum IngestError {
    /// 载荷不是合法的 UTF-8
    #[error("Config payload is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),

    /// 载荷不是格式良好的 JSON 文档
    #[error("Failed to parse config document: {0}")]
    DocumentParse(#[from] serde_json::Error),
}

/// 链路会话错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// 尚未挂接传输层
    #[error("Link client not started")]
    NotStarted,

    /// 传输层返回的错误
    #[error("Transport error: {0}")]
    Transport(String),
}
