//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 各子模块定义自己的错误枚举（`CompressionError` / `ApiError` / `ConfigError`），
//! 在工作流边界统一上转为 `AppError`，再转换为面向用户的文案写入会话状态。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息，`#[from]` 免去手动 map。
//! - `kind()` 给出与界面无关的稳定分类，便于测试与埋点。
//! - 实现 `Serialize` 将错误序列化为用户文案，满足前端桥接层的需要。

use serde::Serialize;

use crate::api::ApiError;
use crate::compressor::CompressionError;
use crate::config::ConfigError;

pub const COMPRESSION_FAILURE_MESSAGE: &str =
    "We couldn't process that image. Please choose a different photo.";

/// 错误分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 客户端前置校验失败（未发起请求）
    Validation,
    Timeout,
    /// 没有收到响应
    Unreachable,
    /// 收到非 2xx 响应
    RemoteRejected,
    /// 响应结构不符合预期
    Protocol,
    /// 图片无法解码或重新编码
    CompressionFailure,
    Configuration,
}

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{}", COMPRESSION_FAILURE_MESSAGE)]
    Compression(#[from] CompressionError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Compression(_) => ErrorKind::CompressionFailure,
            Self::Api(err) => err.kind(),
            Self::Config(_) => ErrorKind::Configuration,
        }
    }

    /// 可直接展示给用户的文案（不含底层原因）。
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// 完整的原因链，仅用于日志。
    pub fn diagnostic_chain(&self) -> String {
        let mut chain = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            chain.push_str(" <- ");
            chain.push_str(&cause.to_string());
            source = cause.source();
        }
        chain
    }
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.user_message())
    }
}
