//! # 远端接口模块（api）
//!
//! ## 设计思路
//!
//! 把两个远端操作（图片识别、菜谱推荐）收敛到统一的请求 / 响应 / 错误契约后面：
//!
//! - `client`：`RecipeService` 抽象与 reqwest 实现 `ApiClient`
//! - `models`：请求与响应的强类型模型
//! - `response`：成功响应结构校验、失败响应文案提取
//! - `error`：`ApiError` 分类（校验 / 超时 / 不可达 / 远端拒绝 / 协议错误）
//!
//! ## 调用链
//!
//! ```text
//! CompressedImage ──analyze_image──▶ POST /analyze-image (multipart: file)
//!                                      └─▶ Vec<String>
//! RecommendationRequest ──get_recommendations──▶ POST /recommend (json)
//!                                      └─▶ RecommendationResponse
//! ```

mod client;
mod error;
mod models;
mod response;

pub use client::{
    ANALYZE_DEFAULT_MESSAGE, ANALYZE_IMAGE_PATH, ApiClient, INVALID_IMAGE_MESSAGE,
    NO_INGREDIENTS_PROVIDED_MESSAGE, RECOMMEND_DEFAULT_MESSAGE, RECOMMEND_PATH, RecipeService,
    image_too_large_message,
};
pub use error::{
    ApiError, BoxError, HttpStatusError, PROTOCOL_MESSAGE, TIMEOUT_MESSAGE, UNREACHABLE_MESSAGE,
};
pub use models::{
    Cuisine, MealType, Preferences, Recipe, RecommendationRequest, RecommendationResponse,
};
