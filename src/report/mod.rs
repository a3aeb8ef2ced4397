// ==========================================
// 疫苗分配优化系统 - 报告层
// ==========================================
// 职责: 最优解 -> 结构化报告 / JSON 文件 / 控制台摘要
// 说明: 图表绘制不在本 crate 范围内，报告中保留完整时机轨迹供外部绘图
// ==========================================

pub mod summary;
pub mod writer;

pub use summary::{
    AllocationReport, CapacityReport, ComparisonEntry, ComparisonReport, EquityMetrics, ObjectiveComponents,
    OptimizationReport, SearchReport, TimingReport,
};
pub use writer::{ReportError, ReportWriter};
