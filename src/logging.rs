// ==========================================
// 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// 输出: 文本（默认）或 JSON 行（便于采集长时间扫描的进度）
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn filter_or(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// 初始化日志系统
///
/// # 参数
/// - default_level: RUST_LOG 未设置时使用的级别（CLI 的 --verbose 传 "debug"）
/// - format: 文本 / JSON
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器
///   例如: RUST_LOG=debug 或 RUST_LOG=vaccine_allocation::engine=trace,perf=info
///
/// # 示例
/// ```no_run
/// use vaccine_allocation::logging::{self, LogFormat};
/// logging::init("info", LogFormat::Text);
/// ```
pub fn init(default_level: &str, format: LogFormat) {
    let builder = fmt()
        .with_env_filter(filter_or(default_level))
        .with_target(true)
        .with_line_number(true);

    // try_init: 库被多次初始化时不 panic
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };
}

/// 初始化测试环境的日志系统
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
