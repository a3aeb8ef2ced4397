// ==========================================
// 疫苗分配优化系统 - 接种时机领域模型
// ==========================================
// TimingCandidate: 一组具体时机（每组第一剂开始日 + 剂次间隔）
// TimingGridConfig: 候选网格配置（与 JSON 配置文件字段一一对应）
// ==========================================

use crate::domain::types::{GroupId, NUM_GROUPS};
use crate::domain::error::InvalidParameterError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 单分组时机
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupTiming {
    /// 第一剂开始日 τ1
    pub tau1: u32,
    /// 剂次间隔 gap
    pub gap: u32,
}

impl GroupTiming {
    pub fn new(tau1: u32, gap: u32) -> Self {
        Self { tau1, gap }
    }

    /// 第二剂开始日 τ2 = τ1 + gap
    pub fn tau2(&self) -> u32 {
        self.tau1.saturating_add(self.gap)
    }
}

// ==========================================
// TimingCandidate - 时机候选（枚举后不可变）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimingCandidate {
    /// 枚举序号（用于确定性平局裁决：序号小者优先）
    pub index: usize,
    pub groups: [GroupTiming; NUM_GROUPS],
}

impl TimingCandidate {
    pub fn new(index: usize, groups: [GroupTiming; NUM_GROUPS]) -> Self {
        Self { index, groups }
    }

    pub fn group(&self, group: GroupId) -> GroupTiming {
        self.groups[group.index()]
    }

    pub fn tau1(&self, group: GroupId) -> u32 {
        self.group(group).tau1
    }

    pub fn tau2(&self, group: GroupId) -> u32 {
        self.group(group).tau2()
    }

    pub fn gap(&self, group: GroupId) -> u32 {
        self.group(group).gap
    }

    /// 所有分组中最晚的第二剂开始日
    pub fn latest_tau2(&self) -> u32 {
        self.groups.iter().map(|g| g.tau2()).max().unwrap_or(0)
    }
}

impl fmt::Display for TimingCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} τ1=({},{}) gap=({},{})",
            self.index, self.groups[0].tau1, self.groups[1].tau1, self.groups[0].gap, self.groups[1].gap
        )
    }
}

// ==========================================
// FixedTiming - 关闭搜索时使用的固定时机
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedTiming {
    pub groups: [GroupTiming; NUM_GROUPS],
}

impl Default for FixedTiming {
    fn default() -> Self {
        // 第一剂分别从第 30 / 35 天开始，间隔 45 天（第二剂 75 / 80 天）
        Self {
            groups: [GroupTiming::new(30, 45), GroupTiming::new(35, 45)],
        }
    }
}

impl FixedTiming {
    pub fn candidate(&self) -> TimingCandidate {
        TimingCandidate::new(0, self.groups)
    }
}

/// 单次扫描允许的候选数量上限
pub const MAX_GRID_CANDIDATES: usize = 1_000_000;

// ==========================================
// TimingGridConfig - 网格配置
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingGridConfig {
    pub tau1_group1_min: u32,
    pub tau1_group1_max: u32,
    pub tau1_group2_min: u32,
    pub tau1_group2_max: u32,
    pub gap_group1_min: u32,
    pub gap_group1_max: u32,
    pub gap_group2_min: u32,
    pub gap_group2_max: u32,
    pub time_step: u32,
}

impl Default for TimingGridConfig {
    fn default() -> Self {
        Self {
            tau1_group1_min: 30,
            tau1_group1_max: 50,
            tau1_group2_min: 30,
            tau1_group2_max: 50,
            gap_group1_min: 45,
            gap_group1_max: 75,
            gap_group2_min: 45,
            gap_group2_max: 75,
            time_step: 5,
        }
    }
}

impl TimingGridConfig {
    /// 单点网格（所有区间退化为一个值）
    pub fn single(groups: [GroupTiming; NUM_GROUPS]) -> Self {
        Self {
            tau1_group1_min: groups[0].tau1,
            tau1_group1_max: groups[0].tau1,
            tau1_group2_min: groups[1].tau1,
            tau1_group2_max: groups[1].tau1,
            gap_group1_min: groups[0].gap,
            gap_group1_max: groups[0].gap,
            gap_group2_min: groups[1].gap,
            gap_group2_max: groups[1].gap,
            time_step: 1,
        }
    }

    /// 以 (字段名, min, max) 形式列出四个区间，顺序即枚举的嵌套顺序
    pub fn ranges(&self) -> [(&'static str, u32, u32); 4] {
        [
            ("tau1_group1", self.tau1_group1_min, self.tau1_group1_max),
            ("tau1_group2", self.tau1_group2_min, self.tau1_group2_max),
            ("gap_group1", self.gap_group1_min, self.gap_group1_max),
            ("gap_group2", self.gap_group2_min, self.gap_group2_max),
        ]
    }

    /// 完整网格的候选数量（各维取值个数之积）
    pub fn candidate_count(&self) -> u128 {
        let step = self.time_step.max(1) as u128;
        self.ranges()
            .iter()
            .map(|(_, min, max)| (max.saturating_sub(*min) as u128) / step + 1)
            .product()
    }

    /// 校验: time_step > 0，每个区间 min <= max，候选数量不超过 MAX_GRID_CANDIDATES
    pub fn validate(&self) -> Result<(), InvalidParameterError> {
        if self.time_step == 0 {
            return Err(InvalidParameterError::OutOfRange {
                field: "time_step".to_string(),
                value: 0.0,
                min: 1.0,
                max: u32::MAX as f64,
            });
        }
        for (field, min, max) in self.ranges() {
            if min > max {
                return Err(InvalidParameterError::InvertedBounds {
                    field: field.to_string(),
                    min,
                    max,
                });
            }
        }
        let size = self.candidate_count();
        if size > MAX_GRID_CANDIDATES as u128 {
            return Err(InvalidParameterError::GridTooLarge {
                size,
                limit: MAX_GRID_CANDIDATES,
            });
        }
        Ok(())
    }
}
