// ==========================================
// 疫苗分配优化系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类:
// - InvalidParameterError: 参数校验失败（扫描开始前，致命；定义在领域层）
// - SolverError: 单个候选求解失败（记录后跳过，扫描继续）
// - NoFeasibleSolutionError: 全部候选均不可行（终止性失败）
// ==========================================

use crate::engine::evaluator::SweepSummary;
use thiserror::Error;

pub use crate::domain::error::{check_non_negative, check_range, InvalidParameterError};

/// 单个候选的求解失败（数值失败 / 超时），与“不可行”严格区分
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("求解超时: 超过 {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("求解器数值失败: {0}")]
    Numerical(String),

    #[error("求解线程异常退出: {0}")]
    WorkerPanicked(String),

    #[error("求解线程已达上限 ({running}/{limit})，超时线程尚未结束")]
    Saturated { running: usize, limit: usize },
}

/// 整个扫描空间内没有任何可行候选
#[derive(Error, Debug, Clone)]
#[error(
    "搜索空间内没有可行解 (已评估 {evaluated}/{total}，不可行 {infeasible}，求解错误 {solver_errors}，被拒 {rejected})；\
     建议放宽最低覆盖率或提高产能上限",
    evaluated = .summary.evaluated,
    total = .summary.total,
    infeasible = .summary.infeasible,
    solver_errors = .summary.solver_errors,
    rejected = .summary.rejected
)]
pub struct NoFeasibleSolutionError {
    pub summary: SweepSummary,
}

impl NoFeasibleSolutionError {
    /// 面向运维的常见原因提示
    pub fn hint(&self) -> &'static str {
        "常见原因: 最低覆盖率过高 / 产能上限过低 / 剂次间隔小于最小临床间隔 / 时机超出疫情数据范围"
    }
}

/// 引擎层统一错误
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    InvalidParameter(#[from] InvalidParameterError),

    #[error(transparent)]
    NoFeasibleSolution(#[from] NoFeasibleSolutionError),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
