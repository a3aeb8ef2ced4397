// ==========================================
// 疫苗分配优化系统 - 成本参数与目标权重
// ==========================================
// 职责: 成本系数、目标权重的不可变值对象
// 红线: 构造后不可原地修改，校验统一在 CostModel 构造时完成
// ==========================================

use crate::domain::types::NUM_GROUPS;
use crate::domain::error::{check_non_negative, check_range, InvalidParameterError};
use serde::{Deserialize, Serialize};

/// 权重归一化容差
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// 权重判重容差（多权重对比运行）
pub const WEIGHT_DUPLICATE_TOLERANCE: f64 = 0.01;

// ==========================================
// CostParameters - 成本参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostParameters {
    /// 各生产商单剂供应成本 P
    pub producer_unit_costs: Vec<f64>,
    /// 各分组社会成本系数 SC
    pub social_costs: [f64; NUM_GROUPS],
    /// 各分组停工/隔离成本系数 Cq
    pub closure_costs: [f64; NUM_GROUPS],
    /// 第一剂固定接种成本 CV1（每剂）
    pub dose1_fixed_cost: f64,
    /// 第二剂固定接种成本 CV2（每剂）
    pub dose2_fixed_cost: f64,
    /// 总产能上限 L（剂）
    pub production_capacity: f64,
    /// 第一剂保护效力（0~1）
    pub dose1_efficacy: f64,
    /// 第二剂保护效力（0~1）
    pub dose2_efficacy: f64,
    /// Z1/Z2/Z3 归一化除数
    pub normalization: [f64; 3],
}

impl Default for CostParameters {
    fn default() -> Self {
        Self {
            producer_unit_costs: vec![8.0, 6.0],
            social_costs: [300.0, 300.0],
            closure_costs: [200.0, 220.0],
            dose1_fixed_cost: 50.0,
            dose2_fixed_cost: 30.0,
            production_capacity: 3000.0,
            dose1_efficacy: 0.7,
            dose2_efficacy: 0.9,
            normalization: [5_000.0, 400_000.0, 10_000_000.0],
        }
    }
}

impl CostParameters {
    pub fn num_producers(&self) -> usize {
        self.producer_unit_costs.len()
    }

    /// 返回修改产能上限后的副本
    pub fn with_capacity(mut self, production_capacity: f64) -> Self {
        self.production_capacity = production_capacity;
        self
    }

    /// 校验所有系数有限、非负；效力落在 [0,1]；归一化除数为正
    pub fn validate(&self) -> Result<(), InvalidParameterError> {
        if self.producer_unit_costs.is_empty() {
            return Err(InvalidParameterError::Missing(
                "producer_unit_costs (至少需要一个生产商)".to_string(),
            ));
        }
        for (i, cost) in self.producer_unit_costs.iter().enumerate() {
            check_non_negative(&format!("producer_unit_costs[{}]", i), *cost)?;
        }
        for i in 0..NUM_GROUPS {
            check_non_negative(&format!("social_costs[{}]", i), self.social_costs[i])?;
            check_non_negative(&format!("closure_costs[{}]", i), self.closure_costs[i])?;
        }
        check_non_negative("dose1_fixed_cost", self.dose1_fixed_cost)?;
        check_non_negative("dose2_fixed_cost", self.dose2_fixed_cost)?;
        check_non_negative("production_capacity", self.production_capacity)?;
        check_range("dose1_efficacy", self.dose1_efficacy, 0.0, 1.0)?;
        check_range("dose2_efficacy", self.dose2_efficacy, 0.0, 1.0)?;
        for (i, divisor) in self.normalization.iter().enumerate() {
            check_non_negative(&format!("normalization[{}]", i), *divisor)?;
            if *divisor == 0.0 {
                return Err(InvalidParameterError::OutOfRange {
                    field: format!("normalization[{}]", i),
                    value: 0.0,
                    min: f64::MIN_POSITIVE,
                    max: f64::MAX,
                });
            }
        }
        Ok(())
    }
}

// ==========================================
// ObjectiveWeights - 目标函数权重
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    /// 标签（仅用于展示，不参与计算）
    #[serde(default = "default_weight_name")]
    pub name: String,
    pub w1: f64,
    pub w2: f64,
    pub w3: f64,
}

fn default_weight_name() -> String {
    "custom".to_string()
}

impl ObjectiveWeights {
    /// 构造并校验
    pub fn new(name: impl Into<String>, w1: f64, w2: f64, w3: f64) -> Result<Self, InvalidParameterError> {
        let weights = Self {
            name: name.into(),
            w1,
            w2,
            w3,
        };
        weights.validate()?;
        Ok(weights)
    }

    /// 默认均衡权重
    pub fn balanced() -> Self {
        Self {
            name: "balanced".to_string(),
            w1: 0.33,
            w2: 0.33,
            w3: 0.34,
        }
    }

    /// 内置对比权重集：均衡 / 供应成本 / 社会成本 / 经济成本
    pub fn presets() -> Vec<Self> {
        vec![
            Self::balanced(),
            Self {
                name: "supply_cost_focus".to_string(),
                w1: 0.8,
                w2: 0.1,
                w3: 0.1,
            },
            Self {
                name: "social_cost_focus".to_string(),
                w1: 0.1,
                w2: 0.8,
                w3: 0.1,
            },
            Self {
                name: "economic_cost_focus".to_string(),
                w1: 0.1,
                w2: 0.1,
                w3: 0.8,
            },
        ]
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.w1, self.w2, self.w3]
    }

    pub fn sum(&self) -> f64 {
        self.w1 + self.w2 + self.w3
    }

    /// 每个权重在 [0,1]，且和为 1（容差 1e-6）
    pub fn validate(&self) -> Result<(), InvalidParameterError> {
        check_range("w1", self.w1, 0.0, 1.0)?;
        check_range("w2", self.w2, 0.0, 1.0)?;
        check_range("w3", self.w3, 0.0, 1.0)?;
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(InvalidParameterError::WeightsNotNormalized {
                sum,
                tolerance: WEIGHT_SUM_TOLERANCE,
            });
        }
        Ok(())
    }

    /// 三个权重均在 0.01 以内视为重复
    pub fn is_near_duplicate(&self, other: &ObjectiveWeights) -> bool {
        self.as_array()
            .iter()
            .zip(other.as_array().iter())
            .all(|(a, b)| (a - b).abs() < WEIGHT_DUPLICATE_TOLERANCE)
    }
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self::balanced()
    }
}
