//! # 工作流模块（workflow）
//!
//! - `state`：会话状态与纯状态迁移函数
//! - `controller`：执行压缩 / 远端调用并派发事件的控制器

mod controller;
mod state;

pub use controller::WorkflowController;
pub use state::{Event, NO_INGREDIENTS_MESSAGE, NO_RECIPES_MESSAGE, SessionState, Stage, transition};
