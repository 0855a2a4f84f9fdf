//! # API 错误模型
//!
//! ## 设计思路
//!
//! 网络/HTTP 层的每一种失败都被归类到且仅归类到一种错误：
//! 前置校验、超时、不可达、远端拒绝、响应格式错误。
//! `Display` 只输出可直接展示给用户的文案，底层原因通过 `source()` 保留，
//! 仅用于日志与诊断。

use crate::error::ErrorKind;

/// 底层原因的统一装箱类型（reqwest / serde_json / 测试替身均可）。
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub const TIMEOUT_MESSAGE: &str = "Request timed out. Please try again.";
pub const UNREACHABLE_MESSAGE: &str =
    "The recipe service is at capacity and cannot take more requests right now. Please try again later.";
pub const PROTOCOL_MESSAGE: &str = "Invalid response from server.";

/// 非 2xx 响应的原始信息，作为 `RemoteRejected` 的底层原因。
#[derive(Debug, thiserror::Error)]
#[error("HTTP {status}: {body}")]
pub struct HttpStatusError {
    pub status: u16,
    pub body: String,
}

/// API 调用统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 客户端前置校验失败，未发起网络请求。
    #[error("{0}")]
    Validation(String),

    #[error("{}", TIMEOUT_MESSAGE)]
    Timeout {
        #[source]
        source: BoxError,
    },

    /// 没有收到任何响应（连接 / DNS 失败、连接中断）。
    #[error("{}", UNREACHABLE_MESSAGE)]
    Unreachable {
        #[source]
        source: BoxError,
    },

    #[error("{message}")]
    RemoteRejected {
        status: u16,
        message: String,
        #[source]
        source: HttpStatusError,
    },

    #[error("{}", PROTOCOL_MESSAGE)]
    Protocol {
        #[source]
        source: BoxError,
    },
}

impl ApiError {
    pub fn timeout(source: impl Into<BoxError>) -> Self {
        Self::Timeout {
            source: source.into(),
        }
    }

    pub fn unreachable(source: impl Into<BoxError>) -> Self {
        Self::Unreachable {
            source: source.into(),
        }
    }

    pub fn protocol(source: impl Into<BoxError>) -> Self {
        Self::Protocol {
            source: source.into(),
        }
    }

    pub fn rejected(status: u16, message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::RemoteRejected {
            status,
            message: message.into(),
            source: HttpStatusError {
                status,
                body: body.into(),
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Unreachable { .. } => ErrorKind::Unreachable,
            Self::RemoteRejected { .. } => ErrorKind::RemoteRejected,
            Self::Protocol { .. } => ErrorKind::Protocol,
        }
    }

    /// 远端返回的 HTTP 状态码（仅 `RemoteRejected` 有）。
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn user_message(&self) -> String {
        self.to_string()
    }
}
