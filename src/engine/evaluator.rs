// ==========================================
// 疫苗分配优化系统 - 候选评估器 / 最优选择器
// ==========================================
// 职责: 对每个候选 构建 + 求解，归约出唯一最优解
// 规则:
// 1) Infeasible / Unbounded / 求解错误 / 被拒候选 不参与选优
// 2) 最优 = 目标值最小；目标值相同取枚举序号最小者（与完成顺序无关）
// 3) 零可行候选 -> NoFeasibleSolutionError（携带扫描统计）
// 并发: 快照、成本模型只读共享；仅累加器由归约循环独占
// 中止: 取消令牌 / 扫描截止时间 / 求解错误上限，中止后已有最优解仍然有效
// ==========================================

use crate::domain::allocation::Solution;
use crate::domain::epidemic::EpidemicSnapshot;
use crate::domain::policy::AllocationPolicy;
use crate::domain::timing::TimingCandidate;
use crate::domain::types::SolveStatus;
use crate::engine::cost_model::CostModel;
use crate::engine::error::{EngineError, EngineResult, InvalidParameterError, NoFeasibleSolutionError, SolverError};
use crate::engine::events::{NoOpProgress, SweepProgress};
use crate::engine::model_builder::AllocationModelBuilder;
use crate::engine::solver::{GoodLpSolver, SolverAdapter};
use crate::engine::timing_grid::TimingGrid;
use crate::perf::PerfGuard;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

// ==========================================
// CancellationToken - 扫描取消令牌
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ==========================================
// EvaluatorOptions - 评估选项
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorOptions {
    /// 并行扫描的工作线程数
    pub workers: usize,
    /// 单个候选求解超时
    pub solver_timeout: Option<Duration>,
    /// 求解错误达到该数量时中止扫描
    pub max_solver_errors: Option<usize>,
    /// 扫描总时长上限
    pub sweep_deadline: Option<Duration>,
    /// 是否记录每个候选的评估轨迹
    pub record_trace: bool,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            solver_timeout: Some(Duration::from_secs(30)),
            max_solver_errors: None,
            sweep_deadline: None,
            record_trace: false,
        }
    }
}

// ==========================================
// 单个候选的评估结果
// ==========================================
#[derive(Debug, Clone)]
pub enum CandidateOutcome {
    /// 最优（可行）
    Solved(Solution),
    /// Infeasible / Unbounded
    NotFeasible {
        candidate: TimingCandidate,
        status: SolveStatus,
    },
    /// 数值失败 / 超时
    Failed {
        candidate: TimingCandidate,
        error: SolverError,
    },
    /// 构建阶段被拒（间隔过短、超出数据范围）
    Rejected {
        candidate: TimingCandidate,
        error: InvalidParameterError,
    },
}

impl CandidateOutcome {
    pub fn candidate(&self) -> &TimingCandidate {
        match self {
            CandidateOutcome::Solved(solution) => &solution.candidate,
            CandidateOutcome::NotFeasible { candidate, .. }
            | CandidateOutcome::Failed { candidate, .. }
            | CandidateOutcome::Rejected { candidate, .. } => candidate,
        }
    }

    pub fn to_record(&self) -> CandidateRecord {
        let candidate = *self.candidate();
        match self {
            CandidateOutcome::Solved(solution) => CandidateRecord {
                candidate,
                status: CandidateStatus::Optimal,
                objective: Some(solution.objective),
                detail: None,
            },
            CandidateOutcome::NotFeasible { status, .. } => CandidateRecord {
                candidate,
                status: if *status == SolveStatus::Unbounded {
                    CandidateStatus::Unbounded
                } else {
                    CandidateStatus::Infeasible
                },
                objective: None,
                detail: None,
            },
            CandidateOutcome::Failed { error, .. } => CandidateRecord {
                candidate,
                status: CandidateStatus::SolverError,
                objective: None,
                detail: Some(error.to_string()),
            },
            CandidateOutcome::Rejected { error, .. } => CandidateRecord {
                candidate,
                status: CandidateStatus::Rejected,
                objective: None,
                detail: Some(error.to_string()),
            },
        }
    }
}

/// 轨迹中的候选状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateStatus {
    Optimal,
    Infeasible,
    Unbounded,
    SolverError,
    Rejected,
}

impl CandidateStatus {
    pub fn is_feasible(self) -> bool {
        self == CandidateStatus::Optimal
    }
}

/// 单个候选的评估轨迹（时机敏感性分析用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub candidate: TimingCandidate,
    pub status: CandidateStatus,
    pub objective: Option<f64>,
    pub detail: Option<String>,
}

// ==========================================
// SweepSummary - 扫描统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub total: usize,
    pub evaluated: usize,
    pub optimal: usize,
    pub infeasible: usize,
    pub unbounded: usize,
    pub solver_errors: usize,
    pub rejected: usize,
    pub cancelled: bool,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub trace: Vec<CandidateRecord>,
}

impl SweepSummary {
    /// 可行候选占比（可行数 / 候选总数）
    pub fn feasible_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.optimal as f64 / self.total as f64
        }
    }

    fn count(&mut self, status: CandidateStatus) {
        self.evaluated += 1;
        match status {
            CandidateStatus::Optimal => self.optimal += 1,
            CandidateStatus::Infeasible => self.infeasible += 1,
            CandidateStatus::Unbounded => self.unbounded += 1,
            CandidateStatus::SolverError => self.solver_errors += 1,
            CandidateStatus::Rejected => self.rejected += 1,
        }
    }
}

/// 扫描结果：最优解 + 统计
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub best: Solution,
    pub summary: SweepSummary,
}

// ==========================================
// BestSelector - 最优解累加器
// ==========================================
#[derive(Debug, Default)]
pub struct BestSelector {
    best: Option<Solution>,
    summary: SweepSummary,
    record_trace: bool,
}

impl BestSelector {
    pub fn new(total: usize, record_trace: bool) -> Self {
        Self {
            best: None,
            summary: SweepSummary {
                total,
                ..Default::default()
            },
            record_trace,
        }
    }

    /// 接收一个候选结果，返回其轨迹记录
    pub fn offer(&mut self, outcome: CandidateOutcome) -> CandidateRecord {
        let record = outcome.to_record();
        self.summary.count(record.status);
        if self.record_trace {
            self.summary.trace.push(record.clone());
        }

        if let CandidateOutcome::Solved(solution) = outcome {
            let replace = match &self.best {
                Some(current) => solution.is_better_than(current),
                None => true,
            };
            if replace {
                self.best = Some(solution);
            }
        }
        record
    }

    pub fn best(&self) -> Option<&Solution> {
        self.best.as_ref()
    }

    pub fn summary(&self) -> &SweepSummary {
        &self.summary
    }

    pub fn mark_cancelled(&mut self) {
        self.summary.cancelled = true;
    }

    /// 结束扫描：无可行解时返回 NoFeasibleSolutionError
    pub fn finish(mut self, elapsed: Duration) -> Result<SweepOutcome, NoFeasibleSolutionError> {
        self.summary.elapsed_ms = elapsed.as_millis() as u64;
        self.summary.trace.sort_by_key(|r| r.candidate.index);
        match self.best {
            Some(best) => Ok(SweepOutcome {
                best,
                summary: self.summary,
            }),
            None => Err(NoFeasibleSolutionError { summary: self.summary }),
        }
    }
}

// ==========================================
// 共享只读上下文（可跨线程）
// ==========================================
#[derive(Clone)]
struct SweepContext {
    snapshot: Arc<EpidemicSnapshot>,
    cost_model: Arc<CostModel>,
    policy: Arc<AllocationPolicy>,
    solver: Arc<dyn SolverAdapter>,
}

impl SweepContext {
    fn evaluate_candidate(&self, candidate: &TimingCandidate) -> CandidateOutcome {
        let builder = AllocationModelBuilder::new(&self.snapshot, &self.cost_model, &self.policy);
        let model = match builder.build(candidate) {
            Ok(model) => model,
            Err(error) => {
                return CandidateOutcome::Rejected {
                    candidate: *candidate,
                    error,
                }
            }
        };

        let outcome = self.solver.solve(&model);
        match outcome.status {
            SolveStatus::Optimal => match outcome.allocation {
                Some(allocation) => {
                    let breakdown = self.cost_model.evaluate_components(&allocation, &model.terms);
                    let doses = self.cost_model.dose_counts(&allocation, &model.terms);
                    CandidateOutcome::Solved(Solution {
                        candidate: *candidate,
                        status: SolveStatus::Optimal,
                        objective: self.cost_model.weighted(&breakdown),
                        allocation,
                        breakdown,
                        doses,
                    })
                }
                None => CandidateOutcome::Failed {
                    candidate: *candidate,
                    error: SolverError::Numerical("求解器返回 Optimal 但没有变量取值".to_string()),
                },
            },
            SolveStatus::Infeasible | SolveStatus::Unbounded => CandidateOutcome::NotFeasible {
                candidate: *candidate,
                status: outcome.status,
            },
            SolveStatus::Error => CandidateOutcome::Failed {
                candidate: *candidate,
                error: outcome
                    .error
                    .unwrap_or_else(|| SolverError::Numerical("未知求解错误".to_string())),
            },
        }
    }
}

/// 扫描中止条件
struct StopRule {
    token: CancellationToken,
    internal: Arc<AtomicBool>,
    deadline: Option<Instant>,
    max_solver_errors: Option<usize>,
}

impl StopRule {
    fn new(token: CancellationToken, options: &EvaluatorOptions, start: Instant) -> Self {
        Self {
            token,
            internal: Arc::new(AtomicBool::new(false)),
            deadline: options.sweep_deadline.map(|d| start + d),
            max_solver_errors: options.max_solver_errors,
        }
    }

    fn should_stop(&self) -> bool {
        self.token.is_cancelled()
            || self.internal.load(Ordering::SeqCst)
            || self.deadline.map(|d| Instant::now() >= d).unwrap_or(false)
    }

    /// 每个结果归约后检查错误上限
    fn check_errors(&self, summary: &SweepSummary) {
        if let Some(limit) = self.max_solver_errors {
            if summary.solver_errors >= limit && !self.internal.swap(true, Ordering::SeqCst) {
                warn!(solver_errors = summary.solver_errors, limit, "求解错误达到上限，中止扫描");
            }
        }
    }
}

// ==========================================
// CandidateEvaluator
// ==========================================
pub struct CandidateEvaluator {
    context: SweepContext,
    options: EvaluatorOptions,
    progress: Arc<dyn SweepProgress>,
    cancellation: CancellationToken,
}

impl CandidateEvaluator {
    pub fn new(snapshot: Arc<EpidemicSnapshot>, cost_model: Arc<CostModel>, policy: Arc<AllocationPolicy>) -> Self {
        let options = EvaluatorOptions::default();
        Self {
            context: SweepContext {
                snapshot,
                cost_model,
                policy,
                solver: Self::default_solver(&options),
            },
            options,
            progress: Arc::new(NoOpProgress),
            cancellation: CancellationToken::new(),
        }
    }

    fn default_solver(options: &EvaluatorOptions) -> Arc<dyn SolverAdapter> {
        match options.solver_timeout {
            Some(timeout) => Arc::new(GoodLpSolver::with_timeout(timeout)),
            None => Arc::new(GoodLpSolver::new()),
        }
    }

    /// 设置选项（同时按 solver_timeout 重建默认求解器，自定义求解器需在此之后设置）
    pub fn with_options(mut self, options: EvaluatorOptions) -> Self {
        self.context.solver = Self::default_solver(&options);
        self.options = options;
        self
    }

    pub fn with_solver(mut self, solver: Arc<dyn SolverAdapter>) -> Self {
        self.context.solver = solver;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn SweepProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn options(&self) -> &EvaluatorOptions {
        &self.options
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.context.cost_model
    }

    /// 评估单个候选（构建 + 求解）
    pub fn evaluate_candidate(&self, candidate: &TimingCandidate) -> CandidateOutcome {
        self.context.evaluate_candidate(candidate)
    }

    fn log_outcome(record: &CandidateRecord) {
        match record.status {
            CandidateStatus::SolverError => {
                warn!(candidate = %record.candidate, detail = ?record.detail, "候选求解失败，跳过")
            }
            _ => debug!(
                candidate = %record.candidate,
                status = ?record.status,
                objective = ?record.objective,
                "候选评估完成"
            ),
        }
    }

    fn finish(&self, mut selector: BestSelector, stopped: bool, start: Instant) -> EngineResult<SweepOutcome> {
        if stopped {
            selector.mark_cancelled();
        }
        let result = selector.finish(start.elapsed());
        match &result {
            Ok(outcome) => {
                self.progress.on_finish(&outcome.summary);
                info!(
                    best = %outcome.best.candidate,
                    objective = outcome.best.objective,
                    feasible = outcome.summary.optimal,
                    total = outcome.summary.total,
                    cancelled = outcome.summary.cancelled,
                    "扫描完成"
                );
            }
            Err(e) => {
                self.progress.on_finish(&e.summary);
                warn!(evaluated = e.summary.evaluated, total = e.summary.total, "扫描结束，无可行候选");
            }
        }
        result.map_err(EngineError::from)
    }

    /// 顺序扫描
    #[instrument(skip_all, fields(total = grid.len()))]
    pub fn evaluate(&self, grid: &TimingGrid) -> EngineResult<SweepOutcome> {
        let _perf = PerfGuard::new("evaluate");
        let start = Instant::now();
        let total = grid.len();
        let stop = StopRule::new(self.cancellation.clone(), &self.options, start);
        let mut selector = BestSelector::new(total, self.options.record_trace);
        let mut stopped = false;

        self.progress.on_start(total);
        for candidate in grid.iter() {
            if stop.should_stop() {
                stopped = true;
                break;
            }
            let record = selector.offer(self.context.evaluate_candidate(&candidate));
            Self::log_outcome(&record);
            self.progress.on_candidate(&record, selector.summary().evaluated, total);
            stop.check_errors(selector.summary());
        }

        self.finish(selector, stopped, start)
    }

    /// 并行扫描（tokio 阻塞线程池，最多 workers 个候选同时求解）
    #[instrument(skip_all, fields(total = grid.len(), workers = self.options.workers))]
    pub async fn evaluate_parallel(&self, grid: &TimingGrid) -> EngineResult<SweepOutcome> {
        let _perf = PerfGuard::new("evaluate_parallel");
        let start = Instant::now();
        let total = grid.len();
        let stop = Arc::new(StopRule::new(self.cancellation.clone(), &self.options, start));
        let mut selector = BestSelector::new(total, self.options.record_trace);
        let workers = self.options.workers.max(1);

        self.progress.on_start(total);
        let mut results = stream::iter(grid.iter())
            .map(|candidate| {
                let context = self.context.clone();
                let stop = Arc::clone(&stop);
                async move {
                    let handle = tokio::task::spawn_blocking(move || {
                        if stop.should_stop() {
                            None
                        } else {
                            Some(context.evaluate_candidate(&candidate))
                        }
                    });
                    (candidate, handle.await)
                }
            })
            .buffer_unordered(workers);

        let mut skipped = 0usize;
        while let Some((candidate, joined)) = results.next().await {
            let outcome = match joined {
                Ok(Some(outcome)) => outcome,
                Ok(None) => {
                    skipped += 1;
                    continue;
                }
                Err(e) => CandidateOutcome::Failed {
                    candidate,
                    error: SolverError::WorkerPanicked(e.to_string()),
                },
            };
            let record = selector.offer(outcome);
            Self::log_outcome(&record);
            self.progress.on_candidate(&record, selector.summary().evaluated, total);
            stop.check_errors(selector.summary());
        }

        self.finish(selector, skipped > 0, start)
    }
}
