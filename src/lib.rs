//! # 拍照识菜 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │              宿主界面（任意 UI / CLI / 桥接层）           │
//! │                                                          │
//! │   选择照片 ── 填写偏好 ── 浏览菜谱 ── 返回 / 重新开始     │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕ SessionState 快照（Serialize）
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕                                                  │
//! │  ┌─ workflow ─── WorkflowController + transition (纯函数) │
//! │  │   └─ InFlight 守卫 (RAII) + generation 防过期          │
//! │  │                                                       │
//! │  ├─ compressor ─ 解码·等比缩放·JPEG 重新编码              │
//! │  ├─ api ──────── RecipeService / ApiClient (reqwest)      │
//! │  ├─ config ───── AppConfig (JSON 文件 + 环境变量覆盖)     │
//! │  ├─ error ────── AppError (统一错误类型)                  │
//! │  └─ logging ──── env_logger 初始化                        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`workflow`] | 上传 → 偏好 → 结果 三阶段状态机，统一错误文案与 loading |
//! | [`compressor`] | 上传前把照片压缩为尺寸受限、体积受限的 JPEG |
//! | [`api`] | 食材识别与菜谱推荐两个远端接口，错误分类 |
//! | [`config`] | 服务地址、超时、上传上限与压缩参数 |
//! | [`error`] | 统一错误类型 `AppError` 与 `ErrorKind` |
//! | [`logging`] | 日志初始化 |

pub mod api;
pub mod compressor;
pub mod config;
pub mod error;
pub mod logging;
pub mod workflow;

pub use api::{ApiClient, ApiError, Preferences, Recipe, RecipeService};
pub use compressor::{CompressedImage, CompressionReport, ImageCompressor, RawImage};
pub use config::AppConfig;
pub use error::{AppError, ErrorKind};
pub use workflow::{SessionState, Stage, WorkflowController};
