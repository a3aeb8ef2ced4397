// ==========================================
// 疫苗分配优化系统 - 求解器适配层
// ==========================================
// 职责: AllocationModel -> good_lp (microlp 后端) -> SolveOutcome
// 状态: Optimal / Infeasible / Unbounded 为正常结果；
//       数值失败、超时以 SolverError 表示，状态记为 Error
// 超时: 求解在独立线程运行，超时后放弃等待（线程自然结束）
//       已放弃但仍在运行的线程计入线程上限，达到上限时直接返回 Saturated
// 复核: 结果违反约束（超出容差）按数值失败处理，不进入选优
// ==========================================

use crate::domain::allocation::Allocation;
use crate::domain::types::{GroupId, SolveStatus, NUM_GROUPS};
use crate::engine::error::SolverError;
use crate::engine::linear::{LinearExpr, Var};
use crate::engine::model_builder::{AllocationModel, ConstraintSense};
use crate::perf;
use good_lp::{
    constraint, microlp, variable, Expression, ProblemVariables, ResolutionError, Solution as _, SolverModel,
    Variable,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use tracing::{trace, warn};

/// 可行性复核容差（按总产量放大，剂量约束的量级与产量相同）
const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// 同时存在的求解线程上限（含超时后仍在运行的线程）
pub const DEFAULT_MAX_SOLVE_THREADS: usize = 64;

/// 单次求解结果
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    /// 仅 Optimal 时存在
    pub allocation: Option<Allocation>,
    pub objective: Option<f64>,
    /// 仅 Error 时存在
    pub error: Option<SolverError>,
}

impl SolveOutcome {
    pub fn optimal(allocation: Allocation, objective: f64) -> Self {
        Self {
            status: SolveStatus::Optimal,
            allocation: Some(allocation),
            objective: Some(objective),
            error: None,
        }
    }

    pub fn with_status(status: SolveStatus) -> Self {
        Self {
            status,
            allocation: None,
            objective: None,
            error: None,
        }
    }

    pub fn failed(error: SolverError) -> Self {
        Self {
            status: SolveStatus::Error,
            allocation: None,
            objective: None,
            error: Some(error),
        }
    }
}

/// 求解器接口
pub trait SolverAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, model: &AllocationModel) -> SolveOutcome;
}

// ==========================================
// GoodLpSolver
// ==========================================
#[derive(Debug, Clone)]
pub struct GoodLpSolver {
    timeout: Option<Duration>,
    max_threads: usize,
    /// 正在运行的求解线程数（克隆共享同一计数）
    running: Arc<AtomicUsize>,
}

impl Default for GoodLpSolver {
    fn default() -> Self {
        Self {
            timeout: None,
            max_threads: DEFAULT_MAX_SOLVE_THREADS,
            running: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// 线程退出（含 panic 展开）时归还计数
struct RunningGuard(Arc<AtomicUsize>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl GoodLpSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }

    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// 当前仍在运行的求解线程数
    pub fn running_threads(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    fn solve_with_timeout(&self, model: &AllocationModel, timeout: Duration) -> SolveOutcome {
        let running = self.running.fetch_add(1, Ordering::SeqCst);
        let guard = RunningGuard(Arc::clone(&self.running));
        if running >= self.max_threads {
            return SolveOutcome::failed(SolverError::Saturated {
                running,
                limit: self.max_threads,
            });
        }

        let (tx, rx) = mpsc::channel();
        let shared = Arc::new(model.clone());
        let spawned = thread::Builder::new()
            .name(format!("lp-candidate-{}", model.candidate.index))
            .spawn(move || {
                let outcome = solve_model(&shared);
                drop(guard);
                // 接收端已超时放弃时发送失败，忽略即可
                let _ = tx.send(outcome);
            });

        if let Err(e) = spawned {
            return SolveOutcome::failed(SolverError::WorkerPanicked(e.to_string()));
        }

        match rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(mpsc::RecvTimeoutError::Timeout) => SolveOutcome::failed(SolverError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
            Err(mpsc::RecvTimeoutError::Disconnected) => SolveOutcome::failed(SolverError::WorkerPanicked(
                format!("候选 {} 的求解线程未返回结果", model.candidate),
            )),
        }
    }
}

impl SolverAdapter for GoodLpSolver {
    fn name(&self) -> &'static str {
        "good_lp/microlp"
    }

    fn solve(&self, model: &AllocationModel) -> SolveOutcome {
        perf::record_solver_call();
        match self.timeout {
            Some(timeout) => self.solve_with_timeout(model, timeout),
            None => solve_model(model),
        }
    }
}

/// LinearExpr -> good_lp::Expression
fn to_expression(expr: &LinearExpr, vars: &HashMap<Var, Variable>) -> Expression {
    let mut out = Expression::from(expr.constant);
    for (var, coef) in &expr.terms {
        if let Some(v) = vars.get(var) {
            out += *coef * *v;
        }
    }
    out
}

fn solve_model(model: &AllocationModel) -> SolveOutcome {
    let mut problem_vars = ProblemVariables::new();
    let mut vars: HashMap<Var, Variable> = HashMap::with_capacity(model.variables.len());
    for spec in &model.variables {
        let v = problem_vars.add(variable().min(spec.lower).max(spec.upper));
        vars.insert(spec.var, v);
    }

    let objective = to_expression(&model.objective, &vars);
    let mut problem = problem_vars.minimise(objective).using(microlp);
    for c in &model.constraints {
        let lhs = to_expression(&c.expr, &vars);
        let rhs = c.rhs;
        problem = match c.sense {
            ConstraintSense::LessEq => problem.with(constraint!(lhs <= rhs)),
            ConstraintSense::GreaterEq => problem.with(constraint!(lhs >= rhs)),
        };
    }

    let solution = match problem.solve() {
        Ok(solution) => solution,
        Err(ResolutionError::Infeasible) => return SolveOutcome::with_status(SolveStatus::Infeasible),
        Err(ResolutionError::Unbounded) => return SolveOutcome::with_status(SolveStatus::Unbounded),
        Err(other) => return SolveOutcome::failed(SolverError::Numerical(other.to_string())),
    };

    let value_of = |var: Var| vars.get(&var).map(|v| solution.value(*v)).unwrap_or(0.0);
    let mut allocation = Allocation {
        dose1_coverage: [0.0; NUM_GROUPS],
        dose2_coverage: [0.0; NUM_GROUPS],
        production_units: (0..model.num_producers)
            .map(|p| value_of(Var::Production(p)))
            .collect(),
    };
    for group in GroupId::ALL {
        allocation.dose1_coverage[group.index()] = value_of(Var::Dose1Coverage(group));
        allocation.dose2_coverage[group.index()] = value_of(Var::Dose2Coverage(group));
    }

    verify_solution(model, allocation)
}

/// 复核求解结果：目标值有限且满足全部约束，否则按数值失败处理
fn verify_solution(model: &AllocationModel, allocation: Allocation) -> SolveOutcome {
    let objective = model.objective.evaluate(&allocation);
    if !objective.is_finite() {
        return SolveOutcome::failed(SolverError::Numerical(format!("目标值非有限: {}", objective)));
    }

    let tolerance = FEASIBILITY_TOLERANCE * (1.0 + allocation.total_production());
    let violated = model.violations(&allocation, tolerance);
    if !violated.is_empty() {
        warn!(candidate = %model.candidate, ?violated, "求解结果超出可行性容差");
        return SolveOutcome::failed(SolverError::Numerical(format!(
            "求解结果违反约束: {}",
            violated.join(", ")
        )));
    }

    trace!(candidate = %model.candidate, objective, "候选求解完成");
    SolveOutcome::optimal(allocation, objective)
}
