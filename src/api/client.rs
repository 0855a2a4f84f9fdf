//! # HTTP 客户端
//!
//! ## 设计思路
//!
//! `RecipeService` 是工作流层依赖的抽象：生产实现为基于 reqwest 的 `ApiClient`，
//! 测试中可替换为任意替身，不再依赖隐藏的全局客户端。
//!
//! ## 实现思路
//!
//! - 复用同一个 `reqwest::Client`（连接池 + 统一超时 + 固定请求头）。
//! - 前置校验失败直接返回 `Validation`，不发起网络请求。
//! - 传输错误按 `is_timeout` 区分超时与不可达；非 2xx 提取服务端文案。
//! - 成功响应交给 `response` 模块做结构校验。
//! - 不做自动重试：重试由用户重新提交触发。

use std::future::Future;
use std::time::Instant;

use bytes::Bytes;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};

use super::models::{RecommendationRequest, RecommendationResponse};
use super::{ApiError, response};
use crate::compressor::CompressedImage;
use crate::config::{ApiConfig, ConfigError};

pub const ANALYZE_IMAGE_PATH: &str = "analyze-image";
pub const RECOMMEND_PATH: &str = "recommend";

pub const ANALYZE_DEFAULT_MESSAGE: &str = "Failed to analyze image. Please try again.";
pub const RECOMMEND_DEFAULT_MESSAGE: &str = "Failed to get recipe recommendations. Please try again.";
pub const INVALID_IMAGE_MESSAGE: &str = "Please upload a valid image file.";
pub const NO_INGREDIENTS_PROVIDED_MESSAGE: &str = "No ingredients provided. Please upload an image first.";

/// 超出上传上限时的提示，上限取自配置（默认 10MB）。
pub fn image_too_large_message(limit_bytes: u64) -> String {
    const MB: u64 = 1024 * 1024;
    const KB: u64 = 1024;

    let limit = if limit_bytes % MB == 0 {
        format!("{}MB", limit_bytes / MB)
    } else if limit_bytes % KB == 0 {
        format!("{}KB", limit_bytes / KB)
    } else {
        format!("{} bytes", limit_bytes)
    };
    format!("Image size must be less than {}.", limit)
}

/// 工作流依赖的远端能力。
pub trait RecipeService: Send + Sync {
    /// 上传图片并返回识别出的食材（空列表是合法结果）。
    fn analyze_image(
        &self,
        image: &CompressedImage,
    ) -> impl Future<Output = Result<Vec<String>, ApiError>> + Send;

    /// 根据食材与偏好请求菜谱推荐（空列表是合法结果）。
    fn get_recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> impl Future<Output = Result<RecommendationResponse, ApiError>> + Send;
}

/// 基于 reqwest 的远端服务客户端。
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    max_upload_bytes: u64,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_upload_bytes: config.max_upload_bytes,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// 上传前校验：媒体类型必须是 `image/*`，体积不超过上限。
    fn validate_upload(&self, image: &CompressedImage) -> Result<(), ApiError> {
        if !is_image_media_type(image.media_type()) {
            return Err(ApiError::Validation(INVALID_IMAGE_MESSAGE.to_string()));
        }

        if image.len() as u64 > self.max_upload_bytes {
            return Err(ApiError::Validation(image_too_large_message(self.max_upload_bytes)));
        }

        Ok(())
    }

    /// 读取响应体；非 2xx 映射为 `RemoteRejected`。
    async fn read_body(
        response: reqwest::Response,
        default_message: &str,
    ) -> Result<Bytes, ApiError> {
        let status = response.status();

        if !status.is_success() {
            // 读不到响应体时仍按状态码归类，原因保留在诊断信息里
            let (body, raw_body) = match response.bytes().await {
                Ok(body) => {
                    let raw_body = String::from_utf8_lossy(&body).into_owned();
                    (body, raw_body)
                }
                Err(err) => {
                    log::debug!("⚠️ 读取错误响应体失败 - HTTP {}: {}", status.as_u16(), err);
                    (Bytes::new(), format!("<body unavailable: {}>", err))
                }
            };
            let message = response::rejection_message(&body)
                .unwrap_or_else(|| default_message.to_string());
            log::warn!("❌ 服务端拒绝请求 - HTTP {}: {}", status.as_u16(), message);
            return Err(ApiError::rejected(status.as_u16(), message, raw_body));
        }

        response.bytes().await.map_err(classify_transport_error)
    }
}

impl RecipeService for ApiClient {
    async fn analyze_image(&self, image: &CompressedImage) -> Result<Vec<String>, ApiError> {
        self.validate_upload(image)?;

        let part = Part::bytes(image.bytes().to_vec())
            .file_name(image.file_name().to_string())
            .mime_str(image.media_type())
            .map_err(|_| ApiError::Validation(INVALID_IMAGE_MESSAGE.to_string()))?;
        let form = Form::new().part("file", part);

        let start = Instant::now();
        log::info!("📤 上传图片识别食材 - {} bytes", image.len());

        let response = self
            .http
            .post(self.endpoint(ANALYZE_IMAGE_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let body = Self::read_body(response, ANALYZE_DEFAULT_MESSAGE).await?;
        let ingredients = response::parse_ingredients(&body)?;

        log::info!(
            "✅ 食材识别完成 - {} 项，耗时 {}ms",
            ingredients.len(),
            start.elapsed().as_millis()
        );

        Ok(ingredients)
    }

    async fn get_recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse, ApiError> {
        if request.ingredients.is_empty() {
            return Err(ApiError::Validation(NO_INGREDIENTS_PROVIDED_MESSAGE.to_string()));
        }

        let start = Instant::now();
        log::info!(
            "📤 请求菜谱推荐 - {} 种食材，meal_type={} cuisine={}",
            request.ingredients.len(),
            request.preferences.meal_type,
            request.preferences.cuisine
        );

        let response = self
            .http
            .post(self.endpoint(RECOMMEND_PATH))
            .json(request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let body = Self::read_body(response, RECOMMEND_DEFAULT_MESSAGE).await?;
        let recommendations = response::parse_recommendations(&body)?;

        log::info!(
            "✅ 菜谱推荐完成 - {} 道，耗时 {}ms",
            recommendations.recipes.len(),
            start.elapsed().as_millis()
        );

        Ok(recommendations)
    }
}

/// 没有拿到完整响应的传输错误：超时单独归类，其余都视为不可达。
fn classify_transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        log::warn!("⏱️ 请求超时：{}", err);
        ApiError::timeout(err)
    } else {
        log::warn!("🔌 无法获得服务端响应：{}", err);
        ApiError::unreachable(err)
    }
}

fn is_image_media_type(media_type: &str) -> bool {
    media_type
        .split(';')
        .next()
        .map(|base| base.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false)
}
