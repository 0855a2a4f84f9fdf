//! # 配置模块
//!
//! ## 设计思路
//!
//! 远端地址、超时与上传上限不再是编译期常量，而是集中在 `AppConfig` 中：
//! - `api`：服务地址、请求/连接超时、上传体积上限、User-Agent
//! - `compression`：压缩参数（见 `compressor::CompressionOptions`）
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用配置（30 秒超时、10MB 上传上限）。
//! - 可从 JSON 设置文件加载，缺失字段取默认值。
//! - 环境变量可覆盖服务地址与超时，便于部署切换。
//! - 加载完成后统一校验，避免运行中才发现非法参数。

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::compressor::{CompressionOptions, CompressionProfile};

pub const DEFAULT_API_BASE_URL: &str = "https://backend-khaki-ten-18.vercel.app/api/v1";
pub const ENV_API_BASE_URL: &str = "MEAL_SNAP_API_BASE_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "MEAL_SNAP_REQUEST_TIMEOUT_SECS";
pub const ENV_COMPRESSION_PROFILE: &str = "MEAL_SNAP_COMPRESSION_PROFILE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("cannot build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}

/// 远端服务配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// 服务根地址，例如 `https://host/api/v1`。
    pub base_url: String,
    /// 单次请求总超时（毫秒）。
    pub request_timeout_ms: u64,
    /// 建立连接（TCP/TLS）超时（毫秒）。
    pub connect_timeout_ms: u64,
    /// 上传图片的体积硬上限（字节）。
    pub max_upload_bytes: u64,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            max_upload_bytes: 10 * 1024 * 1024,
            user_agent: format!("meal-snap/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ApiConfig {
    /// 指向指定地址的默认配置（测试与本地调试常用）。
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ConfigError::Invalid(format!("base_url {:?}: {}", self.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "base_url must use http or https (got {})",
                url.scheme()
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("request_timeout_ms must be positive".to_string()));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid("connect_timeout_ms must be positive".to_string()));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("max_upload_bytes must be positive".to_string()));
        }
        Ok(())
    }
}

/// 应用配置。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub compression: CompressionOptions,
    /// 压缩档位；设置后覆盖 `compression` 中的尺寸、质量与滤镜。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<CompressionProfile>,
}

impl AppConfig {
    /// 加载配置：可选的 JSON 文件 → 环境变量覆盖 → 校验。
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            Some(path) => {
                log::info!("⚙️ 配置文件不存在，使用默认配置: {}", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.apply_profile();
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件读取配置（不做覆盖与校验）。
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 应用键值覆盖；`lookup` 通常是环境变量读取。
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(ENV_API_BASE_URL).filter(|v| !v.trim().is_empty()) {
            log::info!("⚙️ {} 覆盖服务地址: {}", ENV_API_BASE_URL, base_url.trim());
            self.api.base_url = base_url.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                log::warn!("⚠️ {} 取值无效 {:?}: {}", ENV_REQUEST_TIMEOUT_SECS, raw, e);
                ConfigError::Invalid(format!("{} must be an integer: {}", ENV_REQUEST_TIMEOUT_SECS, e))
            })?;
            log::info!("⚙️ {} 覆盖请求超时: {}s", ENV_REQUEST_TIMEOUT_SECS, secs);
            self.api.request_timeout_ms = secs.saturating_mul(1000);
        }

        if let Some(raw) = lookup(ENV_COMPRESSION_PROFILE).filter(|v| !v.trim().is_empty()) {
            let profile = raw.parse::<CompressionProfile>().map_err(|e| {
                log::warn!("⚠️ {} 取值无效 {:?}: {}", ENV_COMPRESSION_PROFILE, raw, e);
                ConfigError::Invalid(e.to_string())
            })?;
            log::info!("⚙️ {} 覆盖压缩档位: {}", ENV_COMPRESSION_PROFILE, profile.as_str());
            self.profile = Some(profile);
        }

        Ok(())
    }

    /// 将 `profile` 展开到压缩参数；未设置档位时保持原值。
    pub fn apply_profile(&mut self) {
        if let Some(profile) = self.profile {
            self.compression.apply_profile(profile);
        }
        log::info!(
            "⚙️ 压缩参数: {}x{} 质量 {:.2}（档位 {}）",
            self.compression.max_width,
            self.compression.max_height,
            self.compression.quality,
            self.compression.infer_profile().as_str()
        );
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()?;
        self.compression
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.compression.max_output_bytes > self.api.max_upload_bytes {
            return Err(ConfigError::Invalid(format!(
                "compression.max_output_bytes ({}) exceeds api.max_upload_bytes ({})",
                self.compression.max_output_bytes, self.api.max_upload_bytes
            )));
        }

        Ok(())
    }
}
