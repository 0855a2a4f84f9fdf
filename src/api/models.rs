//! # 接口数据模型
//!
//! 与远端 `/recommend` 契约一一对应的类型。枚举统一按小写字符串序列化，
//! 与偏好表单的取值保持一致。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    #[default]
    Dinner,
    Snack,
}

impl MealType {
    pub const ALL: [MealType; 4] = [Self::Breakfast, Self::Lunch, Self::Dinner, Self::Snack];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snack => "snack",
        }
    }
}

impl FromStr for MealType {
    type Err = ApiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|meal| meal.as_str() == normalized)
            .ok_or_else(|| ApiError::Validation(format!("Unknown meal type: {}", value)))
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cuisine {
    #[default]
    Any,
    Italian,
    Mexican,
    Indian,
    Chinese,
    American,
}

impl Cuisine {
    pub const ALL: [Cuisine; 6] = [
        Self::Any,
        Self::Italian,
        Self::Mexican,
        Self::Indian,
        Self::Chinese,
        Self::American,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Italian => "italian",
            Self::Mexican => "mexican",
            Self::Indian => "indian",
            Self::Chinese => "chinese",
            Self::American => "american",
        }
    }
}

impl FromStr for Cuisine {
    type Err = ApiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|cuisine| cuisine.as_str() == normalized)
            .ok_or_else(|| ApiError::Validation(format!("Unknown cuisine: {}", value)))
    }
}

impl fmt::Display for Cuisine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 用户偏好。默认值与表单初始值一致：晚餐、不限菜系、无常备调料。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preferences {
    pub meal_type: MealType,
    pub cuisine: Cuisine,
    pub has_basic_spices: bool,
    pub has_cooking_oil: bool,
    pub has_salt_pepper: bool,
}

impl Preferences {
    pub fn new(meal_type: MealType, cuisine: Cuisine) -> Self {
        Self {
            meal_type,
            cuisine,
            ..Self::default()
        }
    }
}

/// `/recommend` 请求体：食材列表 + 展开的偏好字段。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationRequest {
    pub ingredients: Vec<String>,
    #[serde(flatten)]
    pub preferences: Preferences,
}

impl RecommendationRequest {
    pub fn new(ingredients: Vec<String>, preferences: Preferences) -> Self {
        Self {
            ingredients,
            preferences,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub prep_time: String,
    #[serde(deserialize_with = "deserialize_calories")]
    pub calories: u32,
}

/// `/recommend` 成功响应。`recipes` 为必填字段，缺失即视为协议错误。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recipes: Vec<Recipe>,
    #[serde(default)]
    pub thought_process: Option<String>,
}

/// 热量字段在线上是 JSON number，可能带小数；四舍五入为整数，拒绝负数。
fn deserialize_calories<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;

    if let Some(value) = number.as_u64() {
        return u32::try_from(value).map_err(serde::de::Error::custom);
    }

    match number.as_f64() {
        Some(value) if value.is_finite() && value >= 0.0 && value <= u32::MAX as f64 => {
            Ok(value.round() as u32)
        }
        _ => Err(serde::de::Error::custom(format!(
            "calories must be a non-negative number, got {}",
            number
        ))),
    }
}
