//! # 工作流控制器
//!
//! ## 设计思路
//!
//! 控制器只负责“执行副作用 + 派发事件”，所有规则都在 `state::transition` 中。
//! 远端能力通过 `RecipeService` 注入，图片压缩通过 `ImageCompressor` 注入。
//!
//! ## 实现思路
//!
//! 1. 提交类操作先派发提交事件；被状态机拒绝（loading 中 / 阶段不符）则直接返回
//! 2. 接受后拿到本次操作的 `generation`，并创建 `InFlight` 守卫
//! 3. 执行压缩 / 网络请求，期间不持有状态锁
//! 4. 完成后派发携带 `generation` 的完成事件，过期结果由状态机丢弃
//! 5. 若 future 在完成前被丢弃，守卫在 `Drop` 中派发 `OperationAbandoned` 清除 loading

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::state::{Event, SessionState, transition};
use crate::api::{ApiClient, Preferences, RecipeService, RecommendationRequest};
use crate::compressor::{ImageCompressor, RawImage};
use crate::config::AppConfig;
use crate::error::AppError;

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 在途操作守卫（RAII 模式）
///
/// 操作正常结束时完成事件已清除 loading，`Drop` 中派发的放弃事件不再生效；
/// 操作中途被丢弃时由它负责清除 loading。
struct InFlight<'a> {
    state: &'a Mutex<SessionState>,
    generation: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        let was_loading = state.loading();
        *state = transition(
            std::mem::take(&mut *state),
            Event::OperationAbandoned {
                generation: self.generation,
            },
        );
        if was_loading && !state.loading() {
            log::warn!("🚫 操作未完成即被放弃 - generation={}", self.generation);
        }
    }
}

/// 单个会话的工作流控制器。
pub struct WorkflowController<S> {
    service: S,
    compressor: ImageCompressor,
    state: Mutex<SessionState>,
}

impl WorkflowController<ApiClient> {
    /// 按配置构造生产环境控制器。
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        config.validate()?;
        let service = ApiClient::new(&config.api)?;
        let compressor = ImageCompressor::new(config.compression.clone())?;
        log::info!("🚀 工作流初始化完成 - 服务地址: {}", service.base_url());
        Ok(Self::new(service, compressor))
    }
}

impl<S: RecipeService> WorkflowController<S> {
    pub fn new(service: S, compressor: ImageCompressor) -> Self {
        Self {
            service,
            compressor,
            state: Mutex::new(SessionState::new()),
        }
    }

    /// 当前状态快照。
    pub fn state(&self) -> SessionState {
        lock(&self.state).clone()
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// 提交图片：压缩 → 识别食材。
    pub async fn submit_image(&self, raw: RawImage) -> SessionState {
        let Some((guard, _)) = self.begin(Event::SubmitImage) else {
            log::debug!("⏭️ 忽略图片提交：当前不可提交");
            return self.state();
        };

        let event = match self.detect_ingredients(raw, guard.generation).await {
            Ok(ingredients) => Event::IngredientsDetected {
                generation: guard.generation,
                ingredients,
            },
            Err(err) => {
                log::warn!("❌ 食材识别失败: {}", err.diagnostic_chain());
                Event::OperationFailed {
                    generation: guard.generation,
                    message: err.user_message(),
                }
            }
        };

        self.dispatch(event)
    }

    /// 提交偏好：用当前食材请求菜谱推荐。
    pub async fn submit_preferences(&self, preferences: Preferences) -> SessionState {
        let Some((guard, snapshot)) = self.begin(Event::SubmitPreferences { preferences }) else {
            log::debug!("⏭️ 忽略偏好提交：当前不可提交");
            return self.state();
        };

        let request = RecommendationRequest::new(snapshot.ingredients().to_vec(), preferences);

        let event = match self.service.get_recommendations(&request).await {
            Ok(response) => {
                if let Some(thoughts) = response.thought_process.as_deref() {
                    log::debug!("💭 推荐思路: {}", thoughts);
                }
                Event::RecipesReceived {
                    generation: guard.generation,
                    recipes: response.recipes,
                }
            }
            Err(err) => {
                let err = AppError::from(err);
                log::warn!("❌ 菜谱推荐失败: {}", err.diagnostic_chain());
                Event::OperationFailed {
                    generation: guard.generation,
                    message: err.user_message(),
                }
            }
        };

        self.dispatch(event)
    }

    pub fn back(&self) -> SessionState {
        self.dispatch(Event::Back)
    }

    pub fn start_over(&self) -> SessionState {
        self.dispatch(Event::StartOver)
    }

    pub fn dismiss_error(&self) -> SessionState {
        self.dispatch(Event::DismissError)
    }

    async fn detect_ingredients(&self, raw: RawImage, generation: u64) -> Result<Vec<String>, AppError> {
        let output = self.compressor.compress_async(raw).await?;
        self.dispatch(Event::ImageCompressed {
            generation,
            report: output.report,
        });

        Ok(self.service.analyze_image(&output.image).await?)
    }

    /// 派发提交事件；被接受时返回在途守卫与新状态。
    fn begin(&self, event: Event) -> Option<(InFlight<'_>, SessionState)> {
        let mut state = lock(&self.state);
        let before = state.generation();
        let next = transition(state.clone(), event);
        if next.generation() == before {
            return None;
        }

        *state = next.clone();
        let guard = InFlight {
            state: &self.state,
            generation: next.generation(),
        };
        Some((guard, next))
    }

    fn dispatch(&self, event: Event) -> SessionState {
        let mut state = lock(&self.state);
        let previous = state.stage();
        *state = transition(std::mem::take(&mut *state), event);
        if state.stage() != previous {
            log::info!("🔀 阶段切换: {:?} → {:?}", previous, state.stage());
        }
        state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, Cuisine, MealType, Recipe, RecommendationResponse};
    use crate::compressor::{CompressedImage, CompressionOptions};
    use crate::error::COMPRESSION_FAILURE_MESSAGE;
    use crate::workflow::{NO_INGREDIENTS_MESSAGE, NO_RECIPES_MESSAGE, Stage};
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// 按预设队列应答的远端服务替身。
    #[derive(Default)]
    struct FakeService {
        ingredients: Mutex<VecDeque<Result<Vec<String>, ApiError>>>,
        recipes: Mutex<VecDeque<Result<RecommendationResponse, ApiError>>>,
        uploads: Mutex<Vec<(u32, u32)>>,
        requests: Mutex<Vec<RecommendationRequest>>,
        gate: Option<Arc<Notify>>,
    }

    impl FakeService {
        fn with_ingredients(self, result: Result<Vec<String>, ApiError>) -> Self {
            self.ingredients.lock().unwrap().push_back(result);
            self
        }

        fn with_recipes(self, result: Result<RecommendationResponse, ApiError>) -> Self {
            self.recipes.lock().unwrap().push_back(result);
            self
        }

        fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }

        async fn wait_gate(&self) {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
        }
    }

    impl RecipeService for FakeService {
        async fn analyze_image(&self, image: &CompressedImage) -> Result<Vec<String>, ApiError> {
            self.uploads.lock().unwrap().push(image.dimensions());
            self.wait_gate().await;
            let next = self.ingredients.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn get_recommendations(
            &self,
            request: &RecommendationRequest,
        ) -> Result<RecommendationResponse, ApiError> {
            self.requests.lock().unwrap().push(request.clone());
            self.wait_gate().await;
            let next = self.recipes.lock().unwrap().pop_front();
            next.unwrap_or_else(|| {
                Ok(RecommendationResponse {
                    recipes: Vec::new(),
                    thought_process: None,
                })
            })
        }
    }

    fn controller(service: FakeService) -> WorkflowController<FakeService> {
        let compressor = ImageCompressor::new(CompressionOptions::default()).expect("valid options");
        WorkflowController::new(service, compressor)
    }

    fn jpeg(width: u32, height: u32) -> RawImage {
        let surface = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(surface)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .expect("encode jpeg");
        RawImage::new(buf, "image/jpeg").with_file_name("fridge.jpg")
    }

    fn egg_and_spinach() -> Vec<String> {
        vec!["egg".to_string(), "spinach".to_string()]
    }

    fn frittata() -> RecommendationResponse {
        RecommendationResponse {
            recipes: vec![Recipe {
                title: "Spinach Frittata".to_string(),
                ingredients: egg_and_spinach(),
                instructions: vec!["Whisk".to_string(), "Bake".to_string()],
                prep_time: "20 minutes".to_string(),
                calories: 320,
            }],
            thought_process: Some("eggs bind well".to_string()),
        }
    }

    async fn at_preferences(service: FakeService) -> WorkflowController<FakeService> {
        let controller = controller(service.with_ingredients(Ok(egg_and_spinach())));
        let state = controller.submit_image(jpeg(64, 48)).await;
        assert_eq!(state.stage(), Stage::Preferences);
        controller
    }

    #[test]
    fn from_config_rejects_output_cap_above_upload_cap() {
        let mut config = AppConfig::default();
        config.compression.max_output_bytes = config.api.max_upload_bytes + 1;

        let result = WorkflowController::from_config(&config);

        match result {
            Err(err) => assert_eq!(err.kind(), crate::error::ErrorKind::Configuration),
            Ok(_) => panic!("inconsistent caps must be rejected"),
        }
    }

    #[tokio::test]
    async fn large_photo_is_downscaled_and_advances_to_preferences() {
        let controller = controller(FakeService::default().with_ingredients(Ok(egg_and_spinach())));

        let state = controller.submit_image(jpeg(3000, 2000)).await;

        assert_eq!(state.stage(), Stage::Preferences);
        assert_eq!(state.ingredients(), egg_and_spinach().as_slice());
        assert!(!state.loading());
        assert_eq!(controller.service().uploads.lock().unwrap().as_slice(), &[(1200u32, 800u32)]);
        let report = state.compression().expect("compression report recorded");
        assert_eq!((report.original_width, report.original_height), (3000, 2000));
    }

    #[tokio::test]
    async fn no_ingredients_keeps_upload_stage() {
        let controller = controller(FakeService::default().with_ingredients(Ok(Vec::new())));

        let state = controller.submit_image(jpeg(64, 48)).await;

        assert_eq!(state.stage(), Stage::Upload);
        assert_eq!(state.error(), Some(NO_INGREDIENTS_MESSAGE));
        assert!(!state.loading());
    }

    #[tokio::test]
    async fn undecodable_upload_reports_compression_failure_without_network() {
        let controller = controller(FakeService::default());

        let state = controller
            .submit_image(RawImage::new(&b"hello"[..], "text/plain"))
            .await;

        assert_eq!(state.stage(), Stage::Upload);
        assert_eq!(state.error(), Some(COMPRESSION_FAILURE_MESSAGE));
        assert!(!state.loading());
        assert!(controller.service().uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn analyze_error_message_is_surfaced() {
        let controller = controller(
            FakeService::default().with_ingredients(Err(ApiError::rejected(413, "Too big", "{}"))),
        );

        let state = controller.submit_image(jpeg(64, 48)).await;

        assert_eq!(state.stage(), Stage::Upload);
        assert_eq!(state.error(), Some("Too big"));
    }

    #[tokio::test]
    async fn preferences_lead_to_results() {
        let controller = at_preferences(FakeService::default().with_recipes(Ok(frittata()))).await;

        let state = controller
            .submit_preferences(Preferences::new(MealType::Dinner, Cuisine::Italian))
            .await;

        assert_eq!(state.stage(), Stage::Results);
        assert_eq!(state.recipes().len(), 1);

        let requests = controller.service().requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].ingredients, egg_and_spinach());
        assert_eq!(requests[0].preferences.cuisine, Cuisine::Italian);
    }

    #[tokio::test]
    async fn empty_recipes_keep_preferences_stage() {
        let controller = at_preferences(FakeService::default()).await;

        let state = controller.submit_preferences(Preferences::default()).await;

        assert_eq!(state.stage(), Stage::Preferences);
        assert_eq!(state.error(), Some(NO_RECIPES_MESSAGE));
    }

    #[tokio::test]
    async fn timeout_keeps_stage_and_sets_message() {
        let controller = at_preferences(FakeService::default().with_recipes(Err(ApiError::timeout(
            std::io::Error::new(std::io::ErrorKind::TimedOut, "deadline elapsed"),
        ))))
        .await;

        let state = controller.submit_preferences(Preferences::default()).await;

        assert_eq!(state.stage(), Stage::Preferences);
        assert_eq!(state.error(), Some(crate::api::TIMEOUT_MESSAGE));
        assert!(!state.loading());

        let state = controller.dismiss_error();
        assert_eq!(state.error(), None);
        assert_eq!(controller.dismiss_error(), state);
    }

    #[tokio::test]
    async fn submission_is_ignored_outside_its_stage() {
        let controller = controller(FakeService::default());

        let state = controller.submit_preferences(Preferences::default()).await;

        assert_eq!(state.stage(), Stage::Upload);
        assert!(controller.service().requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_submission_while_loading_is_ignored() {
        let gate = Arc::new(Notify::new());
        // 先放行识别请求
        gate.notify_one();
        let controller = at_preferences(
            FakeService::default()
                .with_recipes(Ok(frittata()))
                .gated(gate.clone()),
        )
        .await;

        let (first, second) = tokio::join!(
            controller.submit_preferences(Preferences::default()),
            async {
                while !controller.state().loading() {
                    tokio::task::yield_now().await;
                }
                let duplicate = controller.submit_preferences(Preferences::default()).await;
                gate.notify_one();
                duplicate
            }
        );

        assert!(second.loading());
        assert_eq!(first.stage(), Stage::Results);
        assert_eq!(controller.service().requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_reply_after_back_is_ignored() {
        let gate = Arc::new(Notify::new());
        let controller = controller(
            FakeService::default()
                .with_ingredients(Ok(egg_and_spinach()))
                .with_recipes(Ok(frittata()))
                .gated(gate.clone()),
        );
        gate.notify_one();
        controller.submit_image(jpeg(64, 48)).await;
        assert_eq!(controller.state().stage(), Stage::Preferences);

        let (state, _) = tokio::join!(
            controller.submit_preferences(Preferences::default()),
            async {
                while !controller.state().loading() {
                    tokio::task::yield_now().await;
                }
                controller.back();
                gate.notify_one();
            }
        );

        assert_eq!(state.stage(), Stage::Upload);
        assert!(state.recipes().is_empty());
        assert!(!state.loading());
    }

    #[tokio::test]
    async fn dropped_operation_clears_loading() {
        let gate = Arc::new(Notify::new());
        let controller = controller(
            FakeService::default()
                .with_ingredients(Ok(egg_and_spinach()))
                .gated(gate),
        );

        let result = tokio::time::timeout(
            Duration::from_millis(200),
            controller.submit_image(jpeg(64, 48)),
        )
        .await;

        assert!(result.is_err(), "gated call must not complete");
        let state = controller.state();
        assert!(!state.loading());
        assert!(state.can_submit());
        assert_eq!(state.stage(), Stage::Upload);
    }

    #[tokio::test]
    async fn start_over_returns_to_upload_from_results() {
        let controller = at_preferences(FakeService::default().with_recipes(Ok(frittata()))).await;
        controller.submit_preferences(Preferences::default()).await;

        let once = controller.start_over();
        let twice = controller.start_over();

        for state in [once, twice] {
            assert_eq!(state.stage(), Stage::Upload);
            assert!(state.ingredients().is_empty());
            assert!(state.recipes().is_empty());
            assert_eq!(state.error(), None);
        }
    }

    #[tokio::test]
    async fn back_from_results_allows_resubmitting_preferences() {
        let controller = at_preferences(
            FakeService::default()
                .with_recipes(Ok(frittata()))
                .with_recipes(Ok(frittata())),
        )
        .await;
        controller.submit_preferences(Preferences::default()).await;

        let state = controller.back();
        assert_eq!(state.stage(), Stage::Preferences);

        let state = controller
            .submit_preferences(Preferences::new(MealType::Lunch, Cuisine::Mexican))
            .await;
        assert_eq!(state.stage(), Stage::Results);
        assert_eq!(controller.service().requests.lock().unwrap().len(), 2);
    }
}
