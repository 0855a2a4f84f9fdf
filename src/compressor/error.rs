//! # 压缩错误模型
//!
//! 使用单一错误枚举承载压缩链路中的所有失败来源。对上层而言它们都属于
//! `CompressionFailure`：不可重试，需要提示用户换一张图片。

/// 图片压缩统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("unsupported image type: {0}")]
    UnsupportedFormat(String),

    #[error("image decode failed")]
    Decode(#[source] image::ImageError),

    #[error("invalid compression options: {0}")]
    InvalidOptions(String),

    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),

    #[error("drawing surface could not be created: {0}")]
    Surface(String),

    #[error("image encode failed")]
    Encode(#[source] image::ImageError),

    #[error("compressed image still exceeds {limit} bytes ({actual} bytes)")]
    OutputTooLarge { actual: u64, limit: u64 },

    #[error("compression worker failed")]
    Worker(#[source] tokio::task::JoinError),
}
