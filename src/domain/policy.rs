// ==========================================
// 疫苗分配优化系统 - 分配策略（模型约束选项）
// ==========================================
// 职责: 最低覆盖率、覆盖率上限、最小剂次间隔及可选的公平性约束
// ==========================================

use crate::domain::types::{GroupId, NUM_GROUPS};
use crate::domain::error::{check_range, InvalidParameterError};
use serde::{Deserialize, Serialize};

/// 分配策略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationPolicy {
    /// 第一剂最低覆盖率 floor1_g
    pub dose1_floors: [f64; NUM_GROUPS],
    /// 第二剂最低覆盖率 floor2_g
    pub dose2_floors: [f64; NUM_GROUPS],
    /// 覆盖率上限（U1/U2 共用）
    pub coverage_cap: f64,
    /// 最小临床剂次间隔（天）
    pub min_dose_interval_days: u32,
    /// 单个生产商占总产量的比例区间（仅在生产商 >= 2 时生效）
    pub producer_share_bounds: Option<(f64, f64)>,
    /// 每组剂量占总剂量的最低比例
    pub min_group_dose_share: Option<f64>,
    /// 两组 (U1+U2) 之差的上限
    pub max_coverage_gap: Option<f64>,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            dose1_floors: [0.15, 0.10],
            dose2_floors: [0.10, 0.05],
            coverage_cap: 1.0,
            min_dose_interval_days: 14,
            producer_share_bounds: Some((0.10, 0.90)),
            min_group_dose_share: None,
            max_coverage_gap: None,
        }
    }
}

impl AllocationPolicy {
    pub fn dose1_floor(&self, group: GroupId) -> f64 {
        self.dose1_floors[group.index()]
    }

    pub fn dose2_floor(&self, group: GroupId) -> f64 {
        self.dose2_floors[group.index()]
    }

    pub fn validate(&self) -> Result<(), InvalidParameterError> {
        check_range("coverage_cap", self.coverage_cap, 0.0, 1.0)?;
        for group in GroupId::ALL {
            let i = group.index();
            check_range(
                &format!("dose1_floors[{}]", i),
                self.dose1_floors[i],
                0.0,
                self.coverage_cap,
            )?;
            check_range(
                &format!("dose2_floors[{}]", i),
                self.dose2_floors[i],
                0.0,
                self.coverage_cap,
            )?;
        }
        if let Some((min, max)) = self.producer_share_bounds {
            check_range("producer_share_bounds.min", min, 0.0, 1.0)?;
            check_range("producer_share_bounds.max", max, min, 1.0)?;
        }
        if let Some(share) = self.min_group_dose_share {
            check_range("min_group_dose_share", share, 0.0, 1.0 / NUM_GROUPS as f64)?;
        }
        if let Some(gap) = self.max_coverage_gap {
            check_range("max_coverage_gap", gap, 0.0, 2.0)?;
        }
        Ok(())
    }
}
