//! # 图片压缩模块（compressor）
//!
//! ## 设计思路
//!
//! 该模块将“媒体类型校验 → header 尺寸检查 → 解码 → 等比缩放 → JPEG 重新编码”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `config`：压缩参数与档位（quality / balanced / speed）
//! - `pipeline`：`ImageCompressor` 与纯函数 `compress` / `fit_within`
//! - `source`：`RawImage` / `CompressedImage` / `CompressionReport` 数据模型
//! - `error`：`CompressionError`
//!
//! ## 调用链
//!
//! ```text
//! RawImage（用户选择的文件）
//!    ↓
//! pipeline.rs（签名校验 + 像素限制 + 解码 + 降采样 + 编码）
//!    ↓
//! CompressionOutput { CompressedImage, CompressionReport }
//!    ↓
//! api::RecipeService::analyze_image
//! ```
//!
//! 压缩是 CPU 密集操作，工作流层通过 `ImageCompressor::compress_async`
//! 放到 blocking 线程池执行，不阻塞事件循环。

mod config;
mod error;
mod pipeline;
mod source;

pub use config::{CompressionOptions, CompressionProfile, ResizeFilter, MIN_QUALITY, QUALITY_STEP};
pub use error::CompressionError;
pub use pipeline::{ImageCompressor, compress, fit_within};
pub use source::{CompressedImage, CompressionOutput, CompressionReport, OUTPUT_MEDIA_TYPE, RawImage};
