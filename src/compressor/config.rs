//! # 压缩配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `CompressionOptions`，保证压缩行为可观测、可调整、可测试。
//! 其中压缩档位（quality / balanced / speed）作为高层语义，映射到底层参数组合。
//!
//! ## 实现思路
//!
//! - `Default` 提供上传场景可用的平衡配置（1200px、质量 0.8、1MB 上限）。
//! - `CompressionProfile` 负责档位字符串解析与反向输出。
//! - `apply_profile` 将档位转换为具体阈值。
//! - `infer_profile` 用于从当前配置反推档位（给前端展示状态）。

use std::str::FromStr;

use fast_image_resize as fr;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use super::CompressionError;

/// 编码质量下限；体积超限时逐级下调到此为止。
pub const MIN_QUALITY: f32 = 0.1;
/// 每次超限后下调的质量步长。
pub const QUALITY_STEP: f32 = 0.1;

/// 降采样滤镜。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    Bilinear,
    CatmullRom,
    Lanczos3,
}

impl ResizeFilter {
    pub(crate) fn to_fast_filter(self) -> fr::FilterType {
        match self {
            Self::Nearest => fr::FilterType::Box,
            Self::Bilinear => fr::FilterType::Bilinear,
            Self::CatmullRom => fr::FilterType::CatmullRom,
            Self::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }

    pub(crate) fn to_image_filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// 图片压缩配置。
///
/// 字段覆盖了解码、降采样与重新编码三个阶段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionOptions {
    /// 输出宽度上限（像素）。
    pub max_width: u32,
    /// 输出高度上限（像素）。
    pub max_height: u32,
    /// 有损编码质量，取值 `(0, 1]`。
    pub quality: f32,
    /// 输出体积硬上限（字节）。
    pub max_output_bytes: u64,
    /// 解码前按 header 尺寸校验的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 降采样滤镜策略。
    pub resize_filter: ResizeFilter,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            max_width: 1200,
            max_height: 1200,
            quality: 0.8,
            max_output_bytes: 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            resize_filter: ResizeFilter::Bilinear,
        }
    }
}

impl CompressionOptions {
    /// 以契约参数（宽高上限 + 质量）构造，其余字段取默认值。
    pub fn with_bounds(max_width: u32, max_height: u32, quality: f32) -> Self {
        Self {
            max_width,
            max_height,
            quality,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), CompressionError> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(CompressionError::InvalidOptions(format!(
                "max dimensions must be positive (got {}x{})",
                self.max_width, self.max_height
            )));
        }
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(CompressionError::InvalidOptions(format!(
                "quality must be in (0, 1] (got {})",
                self.quality
            )));
        }
        if self.max_output_bytes == 0 {
            return Err(CompressionError::InvalidOptions(
                "max_output_bytes must be positive".to_string(),
            ));
        }
        if self.max_decoded_pixels == 0 {
            return Err(CompressionError::InvalidOptions(
                "max_decoded_pixels must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// 基于当前参数反推压缩档位。
    pub fn infer_profile(&self) -> CompressionProfile {
        let max_dimension = self.max_width.max(self.max_height);

        if max_dimension >= 2048 && self.quality >= 0.9 {
            return CompressionProfile::Quality;
        }

        if max_dimension <= 800 || self.quality <= 0.7 {
            return CompressionProfile::Speed;
        }

        CompressionProfile::Balanced
    }

    /// 应用指定压缩档位到实际参数。
    ///
    /// 体积上限与解码上限不随档位变化。
    pub fn apply_profile(&mut self, profile: CompressionProfile) {
        match profile {
            CompressionProfile::Quality => {
                self.max_width = 2048;
                self.max_height = 2048;
                self.quality = 0.92;
                self.resize_filter = ResizeFilter::Lanczos3;
            }
            CompressionProfile::Balanced => {
                self.max_width = 1200;
                self.max_height = 1200;
                self.quality = 0.8;
                self.resize_filter = ResizeFilter::Bilinear;
            }
            CompressionProfile::Speed => {
                self.max_width = 800;
                self.max_height = 800;
                self.quality = 0.7;
                self.resize_filter = ResizeFilter::Nearest;
            }
        }
    }

    /// 0~1 质量映射到 JPEG 编码器的 1~100。
    pub(crate) fn jpeg_quality(quality: f32) -> u8 {
        (quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

/// 压缩档位（面向产品/用户语义）。
///
/// - `Quality`：尽量保真，上传更慢
/// - `Balanced`：识别效果与上传速度平衡
/// - `Speed`：优先上传速度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionProfile {
    Quality,
    Balanced,
    Speed,
}

impl CompressionProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Balanced => "balanced",
            Self::Speed => "speed",
        }
    }
}

impl FromStr for CompressionProfile {
    type Err = CompressionError;

    fn from_str(profile: &str) -> Result<Self, Self::Err> {
        match profile.trim().to_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "balanced" => Ok(Self::Balanced),
            "speed" => Ok(Self::Speed),
            other => Err(CompressionError::InvalidOptions(format!(
                "unknown compression profile: {} (expected quality / balanced / speed)",
                other
            ))),
        }
    }
}
