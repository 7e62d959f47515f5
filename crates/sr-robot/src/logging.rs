//! 日志初始化
//!
//! 库内部只通过 `tracing` 宏记录日志，是否输出由应用决定。

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// 安装 fmt subscriber，并把 `log` 记录桥接到 `tracing`
///
/// `RUST_LOG` 存在时优先于 `default_directive`（例如 `"sr_robot=info"`）。
/// 重复调用是无操作；已有其他全局 subscriber 时保留原有的。
pub fn init_logging(default_directive: &str) {
    INIT.call_once(|| {
        let _ = tracing_log::LogTracer::init_with_filter(log::LevelFilter::Trace);

        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_directive))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}
