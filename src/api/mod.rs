// ==========================================
// 疫苗分配优化系统 - API 层
// ==========================================
// 职责: 提供优化运行接口,供 CLI 与调用方使用
// ==========================================

pub mod error;
pub mod optimization_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use optimization_api::{OptimizationApi, RunArtifacts};
