//! # 会话状态机
//!
//! ## 设计思路
//!
//! 所有状态迁移规则集中在纯函数 `transition(state, event) -> state` 中，
//! 与界面框架、网络、线程模型完全无关，可以直接单元测试。
//!
//! ## 实现思路
//!
//! - 阶段：`Upload → Preferences → Results`，返回 / 重新开始可回退。
//! - 提交类事件（`SubmitImage` / `SubmitPreferences`）只在对应阶段且未处于 loading 时生效，
//!   生效时置 loading、清除错误并递增 `generation`。
//! - 完成类事件携带发起时的 `generation`，与当前值不一致即视为过期响应，直接忽略。
//! - 返回 / 重新开始同样递增 `generation` 并清除 loading，放弃仍在途的请求。
//!
//! ```text
//!            SubmitImage                 SubmitPreferences
//! ┌────────┐ ──ingredients≠∅──▶ ┌─────────────┐ ──recipes≠∅──▶ ┌─────────┐
//! │ Upload │                    │ Preferences │                │ Results │
//! └────────┘ ◀──────Back─────── └─────────────┘ ◀─────Back──── └─────────┘
//!      ▲                                                            │
//!      └──────────────────────────StartOver─────────────────────────┘
//! ```

use serde::Serialize;

use crate::api::{Preferences, Recipe};
use crate::compressor::CompressionReport;

pub const NO_INGREDIENTS_MESSAGE: &str =
    "No ingredients detected in the image. Please try another image.";
pub const NO_RECIPES_MESSAGE: &str = "No recipes found. Please try different preferences.";

/// 工作流阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Upload,
    Preferences,
    Results,
}

/// 单个用户会话的全部易失状态。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionState {
    stage: Stage,
    ingredients: Vec<String>,
    recipes: Vec<Recipe>,
    preferences: Option<Preferences>,
    compression: Option<CompressionReport>,
    loading: bool,
    error: Option<String>,
    generation: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn ingredients(&self) -> &[String] {
        &self.ingredients
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    /// 最近一次提交的偏好（返回偏好页时可用于回显）。
    pub fn preferences(&self) -> Option<&Preferences> {
        self.preferences.as_ref()
    }

    pub fn compression(&self) -> Option<&CompressionReport> {
        self.compression.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 提交控件是否可用。
    pub fn can_submit(&self) -> bool {
        !self.loading
    }

    fn begin_operation(&mut self) {
        self.loading = true;
        self.error = None;
        self.generation += 1;
    }

    fn is_current(&self, generation: u64) -> bool {
        self.loading && self.generation == generation
    }

    fn abandon_in_flight(&mut self) {
        self.loading = false;
        self.generation += 1;
    }
}

/// 驱动状态机的事件。
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SubmitImage,
    ImageCompressed {
        generation: u64,
        report: CompressionReport,
    },
    IngredientsDetected {
        generation: u64,
        ingredients: Vec<String>,
    },
    SubmitPreferences {
        preferences: Preferences,
    },
    RecipesReceived {
        generation: u64,
        recipes: Vec<Recipe>,
    },
    OperationFailed {
        generation: u64,
        message: String,
    },
    /// 在途操作在完成前被丢弃（例如调用方取消了 future）。
    OperationAbandoned {
        generation: u64,
    },
    Back,
    StartOver,
    DismissError,
}

/// 纯状态迁移函数。非法或过期的事件返回原状态。
pub fn transition(mut state: SessionState, event: Event) -> SessionState {
    match event {
        Event::SubmitImage => {
            if state.stage == Stage::Upload && !state.loading {
                state.begin_operation();
            }
        }
        Event::ImageCompressed { generation, report } => {
            if state.is_current(generation) {
                state.compression = Some(report);
            }
        }
        Event::IngredientsDetected {
            generation,
            ingredients,
        } => {
            if state.stage == Stage::Upload && state.is_current(generation) {
                state.loading = false;
                if ingredients.is_empty() {
                    state.error = Some(NO_INGREDIENTS_MESSAGE.to_string());
                } else {
                    state.ingredients = ingredients;
                    state.stage = Stage::Preferences;
                }
            }
        }
        Event::SubmitPreferences { preferences } => {
            if state.stage == Stage::Preferences && !state.loading && !state.ingredients.is_empty() {
                state.begin_operation();
                state.preferences = Some(preferences);
            }
        }
        Event::RecipesReceived {
            generation,
            recipes,
        } => {
            if state.stage == Stage::Preferences && state.is_current(generation) {
                state.loading = false;
                if recipes.is_empty() {
                    state.error = Some(NO_RECIPES_MESSAGE.to_string());
                } else {
                    state.recipes = recipes;
                    state.stage = Stage::Results;
                }
            }
        }
        Event::OperationFailed {
            generation,
            message,
        } => {
            if state.is_current(generation) {
                state.loading = false;
                state.error = Some(message);
            }
        }
        Event::OperationAbandoned { generation } => {
            if state.is_current(generation) {
                state.loading = false;
            }
        }
        Event::Back => {
            let previous = match state.stage {
                Stage::Upload => None,
                Stage::Preferences => Some(Stage::Upload),
                Stage::Results => Some(Stage::Preferences),
            };
            if let Some(previous) = previous {
                state.stage = previous;
                state.abandon_in_flight();
            }
        }
        Event::StartOver => {
            let generation = state.generation + 1;
            state = SessionState {
                generation,
                ..SessionState::default()
            };
        }
        Event::DismissError => {
            state.error = None;
        }
    }

    state
}
