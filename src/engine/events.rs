// ==========================================
// 疫苗分配优化系统 - 扫描进度观察者
// ==========================================
// 职责: 定义扫描进度回调 trait，评估器只依赖 trait
// 说明: 进度上报不影响选优结果；实现必须线程安全
// ==========================================

use crate::engine::evaluator::{CandidateRecord, SweepSummary};
use std::sync::atomic::{AtomicUsize, Ordering};

/// 扫描进度观察者
///
/// 评估器在扫描开始、每个候选完成、扫描结束时回调
/// 并行扫描时回调顺序为完成顺序，不保证按枚举顺序
pub trait SweepProgress: Send + Sync {
    /// 扫描开始
    fn on_start(&self, _total: usize) {}

    /// 单个候选完成（done 为已完成数量，含本次）
    fn on_candidate(&self, _record: &CandidateRecord, _done: usize, _total: usize) {}

    /// 扫描结束（含取消）
    fn on_finish(&self, _summary: &SweepSummary) {}
}

/// 空操作观察者
///
/// 用于不需要进度上报的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpProgress;

impl SweepProgress for NoOpProgress {}

/// 日志观察者：每完成 `every` 个候选输出一次 info 日志
#[derive(Debug)]
pub struct TracingProgress {
    every: usize,
    feasible_count: AtomicUsize,
}

impl TracingProgress {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            feasible_count: AtomicUsize::new(0),
        }
    }

    /// 目前为止可行候选数
    pub fn feasible_seen(&self) -> usize {
        self.feasible_count.load(Ordering::Relaxed)
    }
}

impl Default for TracingProgress {
    fn default() -> Self {
        Self::new(50)
    }
}

impl SweepProgress for TracingProgress {
    fn on_start(&self, total: usize) {
        tracing::info!(total, "开始评估候选时机");
    }

    fn on_candidate(&self, record: &CandidateRecord, done: usize, total: usize) {
        if record.status.is_feasible() {
            self.feasible_count.fetch_add(1, Ordering::Relaxed);
        }
        if done % self.every == 0 || done == total {
            tracing::info!(
                done,
                total,
                feasible = self.feasible_seen(),
                "候选评估进度"
            );
        }
    }

    fn on_finish(&self, summary: &SweepSummary) {
        tracing::info!(
            evaluated = summary.evaluated,
            total = summary.total,
            optimal = summary.optimal,
            cancelled = summary.cancelled,
            elapsed_ms = summary.elapsed_ms,
            "候选评估结束"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timing::{GroupTiming, TimingCandidate};
    use crate::engine::evaluator::CandidateStatus;

    fn record(status: CandidateStatus) -> CandidateRecord {
        CandidateRecord {
            candidate: TimingCandidate::new(0, [GroupTiming::new(10, 14), GroupTiming::new(10, 14)]),
            status,
            objective: None,
            detail: None,
        }
    }

    #[test]
    fn test_noop_progress() {
        let progress = NoOpProgress;
        progress.on_start(3);
        progress.on_candidate(&record(CandidateStatus::Optimal), 1, 3);
        progress.on_finish(&SweepSummary::default());
    }

    #[test]
    fn test_tracing_progress_counts_feasible() {
        let progress = TracingProgress::new(2);
        progress.on_candidate(&record(CandidateStatus::Optimal), 1, 3);
        progress.on_candidate(&record(CandidateStatus::Infeasible), 2, 3);
        progress.on_candidate(&record(CandidateStatus::Optimal), 3, 3);
        assert_eq!(progress.feasible_seen(), 2);
    }
}
