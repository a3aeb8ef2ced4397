use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

static PERF_ENABLED: AtomicBool = AtomicBool::new(false);
static SOLVER_CALLS: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static PERF_DEPTH: Cell<u32> = Cell::new(0);
}

fn is_true(v: &str) -> bool {
    matches!(
        v.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// 根据环境变量设置性能日志开关
///
/// 开关：
/// - Debug 默认开启；Release 默认关闭（可通过环境变量开启）
/// - `VACCINE_ALLOC_PERF=1` 强制开启，`VACCINE_ALLOC_PERF=0` 强制关闭
pub fn install_from_env() {
    let enabled = match std::env::var("VACCINE_ALLOC_PERF") {
        Ok(v) => is_true(&v),
        Err(_) => cfg!(debug_assertions),
    };
    PERF_ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    PERF_ENABLED.load(Ordering::Relaxed)
}

/// 求解器调用计数（进程级，跨工作线程累计）
pub fn record_solver_call() {
    SOLVER_CALLS.fetch_add(1, Ordering::Relaxed);
}

pub fn solver_calls() -> u64 {
    SOLVER_CALLS.load(Ordering::Relaxed)
}

/// 性能统计 Guard：记录 elapsed_ms + 求解器调用次数
///
/// 使用方式：
/// ```ignore
/// let _perf = vaccine_allocation::perf::PerfGuard::new("evaluate_parallel");
/// // do work...
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    solver_start: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        PERF_DEPTH.with(|d| d.set(d.get().saturating_add(1)));
        Self {
            op,
            start: Instant::now(),
            solver_start: solver_calls(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let depth = PERF_DEPTH.with(|d| d.get());
        if is_enabled() {
            let solver_calls = solver_calls().saturating_sub(self.solver_start);
            tracing::info!(
                target: "perf",
                op = self.op,
                elapsed_ms = self.elapsed_ms(),
                solver_calls,
                depth,
                "done"
            );
        }
        PERF_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}
