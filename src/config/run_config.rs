// ==========================================
// 疫苗分配优化系统 - 运行配置解析
// ==========================================
// 职责: 将 CLI / 调用方给出的配置来源解析为唯一、不可变的 RunConfig
// 规则:
// 1) 不搜索 -> 固定时机
// 2) 搜索 + 时机文件存在 -> 文件网格；文件缺失 -> 固定时机（告警）
// 3) 搜索 + 未指定时机文件 -> 默认网格
// 4) 权重文件缺失 -> 默认均衡权重；对比运行 = 用户权重 + 内置预设
// 5) 模型参数文件（成本参数 + 分配策略）缺失 -> 全部默认
// 引擎层只消费 RunConfig，不做任何 I/O 与交互
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::json_file;
use crate::config::timing_config::load_timing_config;
use crate::config::weights_config::{comparison_weight_set, load_weights};
use crate::domain::cost::{CostParameters, ObjectiveWeights};
use crate::domain::policy::AllocationPolicy;
use crate::domain::timing::{FixedTiming, TimingGridConfig};
use crate::engine::evaluator::EvaluatorOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// 模型参数文件：成本参数 + 分配策略
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub cost: CostParameters,
    pub policy: AllocationPolicy,
}

/// 配置来源（CLI 参数或调用方直接构造）
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub data_path: PathBuf,
    /// 是否搜索最优时机
    pub search: bool,
    pub timing_config_path: Option<PathBuf>,
    pub weights_path: Option<PathBuf>,
    /// 是否进行多权重对比运行
    pub compare_weights: bool,
    pub model_config_path: Option<PathBuf>,
    /// 覆盖产能上限 L
    pub capacity_override: Option<f64>,
    pub output_dir: Option<PathBuf>,
    pub workers: Option<usize>,
    pub solver_timeout_ms: Option<u64>,
    pub max_solver_errors: Option<usize>,
    pub sweep_deadline_secs: Option<u64>,
    pub record_trace: bool,
    pub clip_to_horizon: bool,
}

// ==========================================
// RunConfig - 解析后的运行配置
// ==========================================
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data_path: PathBuf,
    /// None 表示不搜索
    pub timing_grid: Option<TimingGridConfig>,
    pub fixed_timing: FixedTiming,
    /// 主运行权重
    pub weights: ObjectiveWeights,
    /// 对比运行权重集（未启用对比时为 None）
    pub comparison_weights: Option<Vec<ObjectiveWeights>>,
    pub cost_parameters: CostParameters,
    pub policy: AllocationPolicy,
    pub evaluator: EvaluatorOptions,
    pub clip_to_horizon: bool,
    pub output_dir: Option<PathBuf>,
}

impl RunConfig {
    /// 以默认值构造（程序化调用）
    pub fn with_defaults(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            timing_grid: None,
            fixed_timing: FixedTiming::default(),
            weights: ObjectiveWeights::balanced(),
            comparison_weights: None,
            cost_parameters: CostParameters::default(),
            policy: AllocationPolicy::default(),
            evaluator: EvaluatorOptions::default(),
            clip_to_horizon: false,
            output_dir: None,
        }
    }

    pub fn search_enabled(&self) -> bool {
        self.timing_grid.is_some()
    }

    /// 解析配置来源；所有参数在此校验，扫描开始前失败
    pub fn resolve(sources: ConfigSources) -> ConfigResult<Self> {
        if sources.data_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing("疫情数据文件路径".to_string()));
        }

        let timing_grid = if !sources.search {
            None
        } else {
            match &sources.timing_config_path {
                Some(path) => {
                    let loaded = load_timing_config(path)?;
                    if loaded.is_none() {
                        warn!(path = %path.display(), "时机配置文件不存在，关闭时机搜索");
                    }
                    loaded
                }
                None => Some(TimingGridConfig::default()),
            }
        };

        let custom_weights = match &sources.weights_path {
            Some(path) => load_weights(path)?,
            None => None,
        };
        let weights = custom_weights
            .as_ref()
            .and_then(|list| list.first().cloned())
            .unwrap_or_else(ObjectiveWeights::balanced);
        let comparison_weights = if sources.compare_weights {
            Some(comparison_weight_set(custom_weights.as_deref().unwrap_or(&[])))
        } else {
            None
        };

        let model = match &sources.model_config_path {
            Some(path) => json_file::read_optional::<ModelConfig>(path)?.unwrap_or_else(|| {
                warn!(path = %path.display(), "模型参数文件不存在，使用默认成本参数与策略");
                ModelConfig::default()
            }),
            None => ModelConfig::default(),
        };
        let mut cost_parameters = model.cost;
        if let Some(capacity) = sources.capacity_override {
            cost_parameters = cost_parameters.with_capacity(capacity);
        }
        cost_parameters.validate()?;
        model.policy.validate()?;

        let defaults = EvaluatorOptions::default();
        let evaluator = EvaluatorOptions {
            workers: sources.workers.unwrap_or(defaults.workers).max(1),
            solver_timeout: match sources.solver_timeout_ms {
                Some(0) => None,
                Some(ms) => Some(Duration::from_millis(ms)),
                None => defaults.solver_timeout,
            },
            max_solver_errors: sources.max_solver_errors,
            sweep_deadline: sources.sweep_deadline_secs.map(Duration::from_secs),
            record_trace: sources.record_trace,
        };

        let config = Self {
            data_path: sources.data_path,
            timing_grid,
            fixed_timing: FixedTiming::default(),
            weights,
            comparison_weights,
            cost_parameters,
            policy: model.policy,
            evaluator,
            clip_to_horizon: sources.clip_to_horizon,
            output_dir: sources.output_dir,
        };

        info!(
            data = %config.data_path.display(),
            search = config.search_enabled(),
            weights = %config.weights.name,
            compare = config.comparison_weights.is_some(),
            capacity = config.cost_parameters.production_capacity,
            workers = config.evaluator.workers,
            "运行配置解析完成"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sources() -> ConfigSources {
        ConfigSources {
            data_path: PathBuf::from("data.csv"),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_without_search() {
        let config = RunConfig::resolve(sources()).unwrap();
        assert!(!config.search_enabled());
        assert_eq!(config.weights, ObjectiveWeights::balanced());
        assert!(config.comparison_weights.is_none());
        assert_eq!(config.cost_parameters.production_capacity, 3000.0);
    }

    #[test]
    fn test_search_without_file_uses_default_grid() {
        let config = RunConfig::resolve(ConfigSources {
            search: true,
            ..sources()
        })
        .unwrap();
        assert_eq!(config.timing_grid, Some(TimingGridConfig::default()));
    }

    #[test]
    fn test_search_with_missing_file_falls_back_to_fixed() {
        let config = RunConfig::resolve(ConfigSources {
            search: true,
            timing_config_path: Some(PathBuf::from("does_not_exist.json")),
            ..sources()
        })
        .unwrap();
        assert!(!config.search_enabled());
    }

    #[test]
    fn test_capacity_override_validated() {
        let err = RunConfig::resolve(ConfigSources {
            capacity_override: Some(-5.0),
            ..sources()
        })
        .unwrap_err();
        assert!(err.to_string().contains("production_capacity"));
    }

    #[test]
    fn test_model_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"cost": {{"production_capacity": 5000}}, "policy": {{"max_coverage_gap": 0.3}}}}"#
        )
        .unwrap();
        let config = RunConfig::resolve(ConfigSources {
            model_config_path: Some(file.path().to_path_buf()),
            compare_weights: true,
            solver_timeout_ms: Some(0),
            ..sources()
        })
        .unwrap();
        assert_eq!(config.cost_parameters.production_capacity, 5000.0);
        assert_eq!(config.cost_parameters.producer_unit_costs, vec![8.0, 6.0]);
        assert_eq!(config.policy.max_coverage_gap, Some(0.3));
        assert_eq!(config.comparison_weights.map(|w| w.len()), Some(4));
        assert!(config.evaluator.solver_timeout.is_none());
    }

    #[test]
    fn test_missing_data_path() {
        assert!(matches!(
            RunConfig::resolve(ConfigSources::default()),
            Err(ConfigError::Missing(_))
        ));
    }
}
