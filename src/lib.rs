// ==========================================
// 疫苗分配优化系统 - 核心库
// ==========================================
// 功能: 接种时机搜索 + 每个候选时机下的剂量分配线性规划
// 定位: 决策支持（疫情轨迹由外部模型提供，本库不做传播模拟）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 时机枚举、建模、求解、选优
pub mod engine;

// 导入层 - 疫情轨迹
pub mod importer;

// 配置层 - 运行配置解析
pub mod config;

// 报告层 - 结果导出
pub mod report;

// API 层 - 运行入口
pub mod api;

// 日志系统
pub mod logging;

// 性能统计
pub mod perf;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    Allocation, AllocationPolicy, CostBreakdown, CostParameters, DoseCounts, EpidemicSnapshot, FixedTiming,
    GroupId, ObjectiveWeights, Solution, SolveStatus, TimingCandidate, TimingGridConfig,
};

// 引擎
pub use engine::{
    AllocationModelBuilder, AllocationOrchestrator, CancellationToken, CandidateEvaluator, CostModel,
    EvaluatorOptions, GoodLpSolver, SolverAdapter, SweepOutcome, SweepSummary, TimingGridEnumerator,
};

// API
pub use api::{ApiError, OptimizationApi};
pub use config::RunConfig;
pub use importer::EpidemicSnapshotStore;
pub use report::OptimizationReport;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "疫苗分配优化系统";
