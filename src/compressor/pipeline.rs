//! # 解码与重新编码流水线
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → 缩放 → JPEG”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做尺寸检查，再进行完整解码，降低超大输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 声明类型只要求 `image/*`；真实格式按文件签名识别（决定能否沿用原始字节）
//! 2. 读取 header 尺寸并按像素上限快速拒绝
//! 3. 完整解码，按 `min(1, maxW/w, maxH/h)` 计算目标尺寸（只缩小、不放大）
//! 4. `fast_image_resize` 降采样，失败时回退 `image::resize_exact`
//! 5. JPEG 编码；超出体积上限时逐级降低质量
//!
//! 解码得到的像素表面只在本函数作用域内存活，编码完成即释放。

use std::io::Cursor;

use fast_image_resize as fr;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageBuffer, ImageFormat, ImageReader, Rgb, RgbImage};

use super::config::{MIN_QUALITY, QUALITY_STEP};
use super::source::{CompressedImage, CompressionOutput, CompressionReport, OUTPUT_MEDIA_TYPE, RawImage};
use super::{CompressionError, CompressionOptions};

const DEFAULT_OUTPUT_FILE_NAME: &str = "upload.jpg";

/// 图片压缩器。
///
/// 持有一份已校验的 `CompressionOptions`，可被多次复用。
#[derive(Debug, Clone)]
pub struct ImageCompressor {
    options: CompressionOptions,
}

impl ImageCompressor {
    pub fn new(options: CompressionOptions) -> Result<Self, CompressionError> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &CompressionOptions {
        &self.options
    }

    /// 同步压缩（CPU 密集，调用方需自行避免阻塞事件循环）。
    pub fn compress(&self, raw: &RawImage) -> Result<CompressionOutput, CompressionError> {
        compress_with_options(raw, &self.options)
    }

    /// 在 blocking 线程池中执行压缩。
    pub async fn compress_async(&self, raw: RawImage) -> Result<CompressionOutput, CompressionError> {
        let options = self.options.clone();
        tokio::task::spawn_blocking(move || compress_with_options(&raw, &options))
            .await
            .map_err(CompressionError::Worker)?
    }
}

/// 按给定宽高上限与质量压缩图片。
pub fn compress(
    image: &RawImage,
    max_width: u32,
    max_height: u32,
    quality: f32,
) -> Result<CompressionOutput, CompressionError> {
    let options = CompressionOptions::with_bounds(max_width, max_height, quality);
    options.validate()?;
    compress_with_options(image, &options)
}

/// 计算等比缩放后的目标尺寸。
///
/// 比例为 `min(1, max_width / width, max_height / height)`：
/// 已在范围内的图片原样返回；否则受约束的一边恰好等于上限，另一边四舍五入到整像素。
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let (w, h) = (width as u64, height as u64);
    let (mw, mh) = (max_width as u64, max_height as u64);

    // mw / w <= mh / h 时宽度是约束边
    if mw * h <= mh * w {
        let scaled_height = (h * mw + w / 2) / w;
        (max_width, (scaled_height as u32).clamp(1, max_height))
    } else {
        let scaled_width = (w * mh + h / 2) / h;
        ((scaled_width as u32).clamp(1, max_width), max_height)
    }
}

pub(crate) fn compress_with_options(
    raw: &RawImage,
    options: &CompressionOptions,
) -> Result<CompressionOutput, CompressionError> {
    validate_declared_type(raw.media_type())?;
    validate_image_signature(raw.bytes())?;
    let actual = detect_format(raw.bytes(), raw.media_type())?;

    let (header_width, header_height) = inspect_dimensions(raw.bytes())?;
    validate_pixel_limits(options, header_width, header_height)?;

    let decoded = image::load_from_memory(raw.bytes()).map_err(CompressionError::Decode)?;
    let (width, height) = (decoded.width(), decoded.height());
    validate_pixel_limits(options, width, height)?;

    let (target_width, target_height) =
        fit_within(width, height, options.max_width, options.max_height);
    let resized = (target_width, target_height) != (width, height);

    let surface = if resized {
        log::info!(
            "🧩 等比缩放：{}x{} -> {}x{}（filter={:?}）",
            width,
            height,
            target_width,
            target_height,
            options.resize_filter
        );
        downscale(decoded, target_width, target_height, options)?
    } else {
        decoded.into_rgb8()
    };

    let original_bytes = raw.len() as u64;
    let mut quality = options.quality;
    let mut encoded = encode_jpeg(&surface, quality)?;

    let reuse_original = !resized
        && actual == ImageFormat::Jpeg
        && encoded.len() as u64 >= original_bytes
        && original_bytes <= options.max_output_bytes;

    if reuse_original {
        log::debug!(
            "♻️ 重新编码未减小体积（{} -> {} bytes），沿用原始 JPEG",
            original_bytes,
            encoded.len()
        );
        let report = CompressionReport {
            original_bytes,
            compressed_bytes: original_bytes,
            original_width: width,
            original_height: height,
            width,
            height,
            quality: options.quality,
            reused_original: true,
        };
        return Ok(CompressionOutput {
            image: CompressedImage {
                bytes: raw.bytes().clone(),
                media_type: OUTPUT_MEDIA_TYPE,
                file_name: output_file_name(raw.file_name()),
                width,
                height,
            },
            report,
        });
    }

    while encoded.len() as u64 > options.max_output_bytes {
        if quality <= MIN_QUALITY + f32::EPSILON {
            return Err(CompressionError::OutputTooLarge {
                actual: encoded.len() as u64,
                limit: options.max_output_bytes,
            });
        }
        let next_quality = (quality - QUALITY_STEP).max(MIN_QUALITY);
        log::debug!(
            "📉 输出 {} bytes 超过上限 {} bytes，质量 {:.2} -> {:.2}",
            encoded.len(),
            options.max_output_bytes,
            quality,
            next_quality
        );
        quality = next_quality;
        encoded = encode_jpeg(&surface, quality)?;
    }

    let (out_width, out_height) = surface.dimensions();
    drop(surface);

    let report = CompressionReport {
        original_bytes,
        compressed_bytes: encoded.len() as u64,
        original_width: width,
        original_height: height,
        width: out_width,
        height: out_height,
        quality,
        reused_original: false,
    };

    log::info!(
        "✅ 图片压缩完成 - {}x{} -> {}x{}，{} -> {} bytes（缩减 {}%）",
        width,
        height,
        out_width,
        out_height,
        report.original_bytes,
        report.compressed_bytes,
        report.reduction_percent()
    );

    Ok(CompressionOutput {
        image: CompressedImage {
            bytes: encoded.into(),
            media_type: OUTPUT_MEDIA_TYPE,
            file_name: output_file_name(raw.file_name()),
            width: out_width,
            height: out_height,
        },
        report,
    })
}

/// 按 JPEG 编码 RGB 表面。
pub(crate) fn encode_jpeg(surface: &RgbImage, quality: f32) -> Result<Vec<u8>, CompressionError> {
    let mut buffer = Vec::new();
    let mut encoder =
        JpegEncoder::new_with_quality(&mut buffer, CompressionOptions::jpeg_quality(quality));
    encoder
        .encode(
            surface.as_raw(),
            surface.width(),
            surface.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(CompressionError::Encode)?;
    Ok(buffer)
}

/// 声明的媒体类型只要求是 `image/*`，真实格式以内容嗅探为准。
fn validate_declared_type(media_type: &str) -> Result<(), CompressionError> {
    let is_image = media_type
        .split(';')
        .next()
        .map(|base| base.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false);

    if !is_image {
        return Err(CompressionError::UnsupportedFormat(media_type.to_string()));
    }

    Ok(())
}

/// 按文件内容识别格式，并确认当前构建可以解码。
fn detect_format(bytes: &[u8], declared: &str) -> Result<ImageFormat, CompressionError> {
    let format = image::guess_format(bytes)
        .map_err(|_| CompressionError::UnsupportedFormat(declared.to_string()))?;

    if !format.reading_enabled() {
        return Err(CompressionError::UnsupportedFormat(declared.to_string()));
    }

    if !declared.trim().to_ascii_lowercase().starts_with(format.to_mime_type()) {
        log::debug!("🔍 声明类型 {} 与内容格式 {:?} 不一致，以内容为准", declared, format);
    }

    Ok(format)
}

/// 通过文件签名（magic bytes）校验内容确实是图片。
fn validate_image_signature(bytes: &[u8]) -> Result<(), CompressionError> {
    if bytes.is_empty() {
        return Err(CompressionError::UnsupportedFormat("empty file".to_string()));
    }

    let kind = infer::get(bytes)
        .ok_or_else(|| CompressionError::UnsupportedFormat("unrecognized file signature".to_string()))?;

    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(CompressionError::UnsupportedFormat(format!(
            "file signature is not an image: {}",
            kind.mime_type()
        )));
    }

    Ok(())
}

/// 仅通过图片头信息读取宽高，用于完整解码前的像素限制检查。
fn inspect_dimensions(bytes: &[u8]) -> Result<(u32, u32), CompressionError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CompressionError::UnsupportedFormat(format!("cannot detect format: {}", e)))?;

    reader.into_dimensions().map_err(CompressionError::Decode)
}

fn validate_pixel_limits(
    options: &CompressionOptions,
    width: u32,
    height: u32,
) -> Result<(), CompressionError> {
    let pixels = (width as u64) * (height as u64);

    if pixels == 0 {
        return Err(CompressionError::Surface(format!(
            "image has no pixels ({}x{})",
            width, height
        )));
    }

    if pixels > options.max_decoded_pixels {
        return Err(CompressionError::ResourceLimit(format!(
            "{} pixels exceeds limit of {} pixels",
            pixels, options.max_decoded_pixels
        )));
    }

    Ok(())
}

fn downscale(
    image: DynamicImage,
    target_width: u32,
    target_height: u32,
    options: &CompressionOptions,
) -> Result<RgbImage, CompressionError> {
    let src = image.to_rgb8();
    drop(image);

    match resize_with_fast_image_resize(&src, target_width, target_height, options) {
        Ok(resized) => Ok(resized),
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 降采样失败，回退 image::resize_exact：{}", err);
            Ok(image::imageops::resize(
                &src,
                target_width,
                target_height,
                options.resize_filter.to_image_filter(),
            ))
        }
    }
}

fn resize_with_fast_image_resize(
    src: &RgbImage,
    target_width: u32,
    target_height: u32,
    options: &CompressionOptions,
) -> Result<RgbImage, CompressionError> {
    let (src_width, src_height) = src.dimensions();

    let src_image = fr::images::Image::from_vec_u8(
        src_width,
        src_height,
        src.as_raw().clone(),
        fr::PixelType::U8x3,
    )
    .map_err(|e| CompressionError::Surface(format!("source buffer: {}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x3);

    let mut resizer = fr::Resizer::new();
    let resize_options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(
        options.resize_filter.to_fast_filter(),
    ));

    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .map_err(|e| CompressionError::Surface(format!("resize: {}", e)))?;

    ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| CompressionError::Surface("resized buffer length mismatch".to_string()))
}

fn output_file_name(original: Option<&str>) -> String {
    let stem = original
        .and_then(|name| std::path::Path::new(name).file_stem())
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty());

    match stem {
        Some(stem) => format!("{}.jpg", stem),
        None => DEFAULT_OUTPUT_FILE_NAME.to_string(),
    }
}
