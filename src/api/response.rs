//! # 响应结构校验
//!
//! 不信任线上载荷的结构：成功响应必须能解码为预期类型，否则一律归为
//! `ApiError::Protocol`。失败响应只尝试提取 `message` / `error` 文案。

use serde_json::Value;

use super::ApiError;
use super::models::RecommendationResponse;

/// `/analyze-image` 成功响应：字符串数组（允许为空）。
pub(crate) fn parse_ingredients(body: &[u8]) -> Result<Vec<String>, ApiError> {
    serde_json::from_slice::<Vec<String>>(body).map_err(ApiError::protocol)
}

/// `/recommend` 成功响应：必须是含 `recipes` 数组的对象。
pub(crate) fn parse_recommendations(body: &[u8]) -> Result<RecommendationResponse, ApiError> {
    serde_json::from_slice::<RecommendationResponse>(body).map_err(ApiError::protocol)
}

/// 从失败响应中提取服务端文案：优先 `message`，其次 `error`，空串视为缺失。
pub(crate) fn rejection_message(body: &[u8]) -> Option<String> {
    let value = serde_json::from_slice::<Value>(body).ok()?;

    ["message", "error"].into_iter().find_map(|field| {
        value
            .get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    })
}
