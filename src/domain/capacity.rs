// ==========================================
// 疫苗分配优化系统 - 产能领域模型
// ==========================================
// 红线: 产能约束优先于覆盖率目标
// 用途: 产能预检、产能利用率报表
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// ProductionPool - 产能池（总产能 + 已分配产量）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductionPool {
    pub limit_units: f64, // 产能上限 L (剂)
    pub used_units: f64,  // 已分配产量 Σx_p (剂)
}

impl ProductionPool {
    pub fn new(limit_units: f64) -> Self {
        Self {
            limit_units,
            used_units: 0.0,
        }
    }

    pub fn with_used(limit_units: f64, used_units: f64) -> Self {
        Self {
            limit_units,
            used_units,
        }
    }
}

// ==========================================
// Trait: CapacityConstraint
// ==========================================
pub trait CapacityConstraint {
    /// 检查追加 doses 剂后是否仍不超过上限
    fn can_supply(&self, doses: f64) -> bool;

    /// 检查是否超限
    fn is_overflow(&self) -> bool;

    /// 剩余产能
    fn remaining_units(&self) -> f64;

    /// 产能利用率（已分配 / 上限）
    fn utilization_ratio(&self) -> f64;
}

impl CapacityConstraint for ProductionPool {
    fn can_supply(&self, doses: f64) -> bool {
        self.used_units + doses <= self.limit_units
    }

    fn is_overflow(&self) -> bool {
        self.used_units > self.limit_units
    }

    fn remaining_units(&self) -> f64 {
        (self.limit_units - self.used_units).max(0.0)
    }

    fn utilization_ratio(&self) -> f64 {
        if self.limit_units <= 0.0 {
            return 0.0;
        }
        self.used_units / self.limit_units
    }
}
