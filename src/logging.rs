//! 日志初始化
//!
//! 全库通过 `log` 门面输出；宿主程序调用 `init()` 接入 `env_logger`，
//! 默认级别 `info`，可用 `RUST_LOG` 覆盖。

/// 初始化全局日志。重复调用无副作用。
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

/// 测试用日志：输出交给测试框架捕获。
pub fn init_for_tests() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}
