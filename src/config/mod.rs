// ==========================================
// 疫苗分配优化系统 - 配置层
// ==========================================
// 职责: 读取时机网格 / 权重 / 模型参数 JSON，解析为 RunConfig
// ==========================================

pub mod error;
pub mod json_file;
pub mod run_config;
pub mod timing_config;
pub mod weights_config;

// 重导出核心配置
pub use error::{ConfigError, ConfigResult};
pub use run_config::{ConfigSources, ModelConfig, RunConfig};
pub use timing_config::{load_timing_config, save_timing_config};
pub use weights_config::{comparison_weight_set, dedupe_weights, load_weights};
