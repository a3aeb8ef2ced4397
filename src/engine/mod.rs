// ==========================================
// 疫苗分配优化系统 - 引擎层
// ==========================================
// 职责: 时机枚举、模型构建、求解、选优
// 红线: Engine 不做 I/O, 不做交互；所有候选失败必须记录原因
// ==========================================

pub mod cost_model;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod linear;
pub mod model_builder;
pub mod orchestrator;
pub mod solver;
pub mod timing_grid;

// 重导出核心引擎
pub use cost_model::{CandidateTerms, CostModel, GroupTerms, WindowSums};
pub use error::{EngineError, EngineResult, InvalidParameterError, NoFeasibleSolutionError, SolverError};
pub use evaluator::{
    BestSelector, CancellationToken, CandidateEvaluator, CandidateOutcome, CandidateRecord, CandidateStatus,
    EvaluatorOptions, SweepOutcome, SweepSummary,
};
pub use events::{NoOpProgress, SweepProgress, TracingProgress};
pub use linear::{LinearExpr, Var};
pub use model_builder::{AllocationModel, AllocationModelBuilder, ConstraintSense, ModelConstraint, VariableSpec};
pub use orchestrator::{AllocationOrchestrator, WeightRun};
pub use solver::{GoodLpSolver, SolveOutcome, SolverAdapter};
pub use timing_grid::{TimingGrid, TimingGridEnumerator, TimingGridIter};
