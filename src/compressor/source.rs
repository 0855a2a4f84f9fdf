//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“用户选择的原始文件”和“压缩后的上传载荷”解耦：
//! - `RawImage` 表示用户选择、尚未解码的字节与声明的媒体类型
//! - `CompressedImage` 表示可直接交给 API 层上传的 JPEG 字节
//! - `CompressionReport` 记录体积与尺寸变化，供界面展示压缩率

use bytes::Bytes;
use serde::Serialize;

/// 压缩输出的固定媒体类型。
pub const OUTPUT_MEDIA_TYPE: &str = "image/jpeg";

/// 用户选择的原始图片。
#[derive(Debug, Clone)]
pub struct RawImage {
    bytes: Bytes,
    media_type: String,
    file_name: Option<String>,
}

impl RawImage {
    pub fn new(bytes: impl Into<Bytes>, media_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: media_type.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// 压缩阶段输出：可上传的图片载荷。
///
/// 只能由压缩流水线构造，保证尺寸与体积上限已被校验。
#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub(crate) bytes: Bytes,
    pub(crate) media_type: &'static str,
    pub(crate) file_name: String,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl CompressedImage {
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn media_type(&self) -> &str {
        self.media_type
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 测试替身与上层调用方可用此入口构造任意载荷（例如验证 API 层的前置校验）。
    pub fn from_parts(
        bytes: impl Into<Bytes>,
        media_type: &'static str,
        file_name: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            media_type,
            file_name: file_name.into(),
            width,
            height,
        }
    }
}

/// 压缩前后的体积与尺寸对比。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompressionReport {
    pub original_bytes: u64,
    pub compressed_bytes: u64,
    pub original_width: u32,
    pub original_height: u32,
    pub width: u32,
    pub height: u32,
    /// 实际使用的编码质量（可能因体积上限被下调）。
    pub quality: f32,
    /// 是否直接沿用了原始字节（重新编码没有带来收益时）。
    pub reused_original: bool,
}

impl CompressionReport {
    /// 体积缩减百分比：`round((1 - compressed / original) * 100)`。
    ///
    /// 重新编码变大时为负数；原始体积为 0 时返回 0。
    pub fn reduction_percent(&self) -> i64 {
        if self.original_bytes == 0 {
            return 0;
        }
        let ratio = self.compressed_bytes as f64 / self.original_bytes as f64;
        ((1.0 - ratio) * 100.0).round() as i64
    }
}

/// 压缩结果：上传载荷 + 统计报告。
#[derive(Debug, Clone)]
pub struct CompressionOutput {
    pub image: CompressedImage,
    pub report: CompressionReport,
}
