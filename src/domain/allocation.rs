// ==========================================
// 疫苗分配优化系统 - 分配方案与解
// ==========================================
// Allocation: 决策变量取值（覆盖率 + 各生产商产量）
// Solution: 单个候选的求解结果（由 Builder + Solver 产生，Evaluator 消费）
// ==========================================

use crate::domain::timing::TimingCandidate;
use crate::domain::types::{GroupId, SolveStatus, NUM_GROUPS};
use serde::{Deserialize, Serialize};

// ==========================================
// Allocation - 决策输出
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Allocation {
    /// U1_g: τ1 当天易感人群中接种第一剂的比例
    pub dose1_coverage: [f64; NUM_GROUPS],
    /// U2_g: τ1 当天易感人群中接种第二剂的比例（不超过 U1_g）
    pub dose2_coverage: [f64; NUM_GROUPS],
    /// x_p: 各生产商供应剂量
    pub production_units: Vec<f64>,
}

impl Allocation {
    pub fn u1(&self, group: GroupId) -> f64 {
        self.dose1_coverage[group.index()]
    }

    pub fn u2(&self, group: GroupId) -> f64 {
        self.dose2_coverage[group.index()]
    }

    pub fn total_production(&self) -> f64 {
        self.production_units.iter().sum()
    }

    /// 覆盖率之和（单调性检查用的总覆盖指标）
    pub fn total_coverage(&self) -> f64 {
        self.dose1_coverage.iter().chain(self.dose2_coverage.iter()).sum()
    }
}

// ==========================================
// DoseCounts - 各组各剂次剂量
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DoseCounts {
    pub dose1: [f64; NUM_GROUPS],
    pub dose2: [f64; NUM_GROUPS],
}

impl DoseCounts {
    pub fn group_total(&self, group: GroupId) -> f64 {
        self.dose1[group.index()] + self.dose2[group.index()]
    }

    pub fn total_dose1(&self) -> f64 {
        self.dose1.iter().sum()
    }

    pub fn total_dose2(&self) -> f64 {
        self.dose2.iter().sum()
    }

    pub fn total(&self) -> f64 {
        self.total_dose1() + self.total_dose2()
    }
}

// ==========================================
// CostBreakdown - 目标分量
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Z1 供应成本
    pub supply: f64,
    /// Z2 社会成本
    pub social: f64,
    /// Z3 经济成本
    pub economic: f64,
}

impl CostBreakdown {
    pub fn as_array(&self) -> [f64; 3] {
        [self.supply, self.social, self.economic]
    }
}

// ==========================================
// Solution - 单候选求解结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub candidate: TimingCandidate,
    pub status: SolveStatus,
    pub allocation: Allocation,
    /// 加权（归一化）目标值
    pub objective: f64,
    pub breakdown: CostBreakdown,
    pub doses: DoseCounts,
}

impl Solution {
    pub fn is_feasible(&self) -> bool {
        self.status.is_feasible()
    }

    /// 择优比较：目标值小者优先；目标值相同则枚举序号小者优先
    pub fn is_better_than(&self, other: &Solution) -> bool {
        match self.objective.partial_cmp(&other.objective) {
            Some(std::cmp::Ordering::Less) => true,
            Some(std::cmp::Ordering::Greater) => false,
            _ => self.candidate.index < other.candidate.index,
        }
    }
}
