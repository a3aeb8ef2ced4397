// ==========================================
// 疫苗分配优化系统 - 时机网格枚举器
// ==========================================
// 职责: 将 min/max/step 展开为有序、可重复遍历的候选序列
// 顺序: (τ1_g1, τ1_g2, gap_g1, gap_g2) 字典序，最后一维变化最快
// 候选 index = 在完整网格中的序号，过滤后保持不变（用于平局裁决）
// ==========================================

use crate::domain::timing::{FixedTiming, GroupTiming, TimingCandidate, TimingGridConfig};
use crate::engine::error::InvalidParameterError;
use tracing::debug;

const AXES: usize = 4;

// ==========================================
// TimingGrid - 候选集合
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct TimingGrid {
    /// [τ1_g1, τ1_g2, gap_g1, gap_g2] 各维取值
    axes: [Vec<u32>; AXES],
    /// 过滤后保留的完整网格序号；None 表示不过滤
    retained: Option<Vec<usize>>,
}

impl TimingGrid {
    fn from_axes(axes: [Vec<u32>; AXES]) -> Self {
        Self { axes, retained: None }
    }

    /// 固定时机：只有一个候选
    pub fn fixed(timing: &FixedTiming) -> Self {
        let [g1, g2] = timing.groups;
        Self::from_axes([vec![g1.tau1], vec![g2.tau1], vec![g1.gap], vec![g2.gap]])
    }

    /// 完整网格大小（不计过滤）
    pub fn full_len(&self) -> usize {
        self.axes.iter().map(|a| a.len()).product()
    }

    pub fn len(&self) -> usize {
        match &self.retained {
            Some(indices) => indices.len(),
            None => self.full_len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按完整网格序号取候选（混合进制解码）
    pub fn candidate_at(&self, index: usize) -> Option<TimingCandidate> {
        if index >= self.full_len() {
            return None;
        }
        let mut digits = [0usize; AXES];
        let mut rest = index;
        for axis in (0..AXES).rev() {
            let radix = self.axes[axis].len();
            digits[axis] = rest % radix;
            rest /= radix;
        }
        let value = |axis: usize| self.axes[axis][digits[axis]];
        Some(TimingCandidate::new(
            index,
            [
                GroupTiming::new(value(0), value(2)),
                GroupTiming::new(value(1), value(3)),
            ],
        ))
    }

    /// 丢弃 τ2 超过数据最后一天的候选
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        let retained: Vec<usize> = self
            .iter()
            .filter(|c| c.latest_tau2() as usize <= horizon)
            .map(|c| c.index)
            .collect();
        let dropped = self.len() - retained.len();
        if dropped > 0 {
            debug!(dropped, horizon, "丢弃超出疫情数据范围的候选");
        }
        self.retained = Some(retained);
        self
    }

    /// 每次调用都从头开始
    pub fn iter(&self) -> TimingGridIter<'_> {
        TimingGridIter {
            grid: self,
            position: 0,
        }
    }

    pub fn to_vec(&self) -> Vec<TimingCandidate> {
        self.iter().collect()
    }
}

impl<'a> IntoIterator for &'a TimingGrid {
    type Item = TimingCandidate;
    type IntoIter = TimingGridIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct TimingGridIter<'a> {
    grid: &'a TimingGrid,
    position: usize,
}

impl Iterator for TimingGridIter<'_> {
    type Item = TimingCandidate;

    fn next(&mut self) -> Option<Self::Item> {
        let index = match &self.grid.retained {
            Some(indices) => *indices.get(self.position)?,
            None => self.position,
        };
        let candidate = self.grid.candidate_at(index)?;
        self.position += 1;
        Some(candidate)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.grid.len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TimingGridIter<'_> {}

// ==========================================
// TimingGridEnumerator
// ==========================================
pub struct TimingGridEnumerator;

impl TimingGridEnumerator {
    /// 校验配置并展开网格
    pub fn enumerate(config: &TimingGridConfig) -> Result<TimingGrid, InvalidParameterError> {
        config.validate()?;
        let ranges = config.ranges();
        let axis = |k: usize| -> Vec<u32> {
            let (_, min, max) = ranges[k];
            (min..=max).step_by(config.time_step as usize).collect()
        };
        let grid = TimingGrid::from_axes([axis(0), axis(1), axis(2), axis(3)]);
        debug!(candidates = grid.len(), step = config.time_step, "时机网格展开完成");
        Ok(grid)
    }

    /// 启用搜索时展开网格，否则使用固定时机
    pub fn resolve(
        config: Option<&TimingGridConfig>,
        fixed: &FixedTiming,
    ) -> Result<TimingGrid, InvalidParameterError> {
        match config {
            Some(config) => Self::enumerate(config),
            None => Ok(TimingGrid::fixed(fixed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::GroupId;

    fn small_config() -> TimingGridConfig {
        TimingGridConfig {
            tau1_group1_min: 10,
            tau1_group1_max: 20,
            tau1_group2_min: 10,
            tau1_group2_max: 15,
            gap_group1_min: 14,
            gap_group1_max: 14,
            gap_group2_min: 14,
            gap_group2_max: 24,
            time_step: 5,
        }
    }

    #[test]
    fn test_grid_size_and_order() {
        let grid = TimingGridEnumerator::enumerate(&small_config()).unwrap();
        // 3 × 2 × 1 × 3
        assert_eq!(grid.len(), 18);
        assert_eq!(grid.iter().len(), 18);

        let all = grid.to_vec();
        assert_eq!(all[0].tau1(GroupId::Group1), 10);
        assert_eq!(all[0].gap(GroupId::Group2), 14);
        assert_eq!(all[1].gap(GroupId::Group2), 19);
        assert_eq!(all[3].tau1(GroupId::Group2), 15);
        assert_eq!(all[17].tau1(GroupId::Group1), 20);
        assert!(all.iter().enumerate().all(|(i, c)| c.index == i));
    }

    #[test]
    fn test_enumeration_is_deterministic_and_restartable() {
        let a = TimingGridEnumerator::enumerate(&small_config()).unwrap();
        let b = TimingGridEnumerator::enumerate(&small_config()).unwrap();
        assert_eq!(a.to_vec(), b.to_vec());
        assert_eq!(a.to_vec(), a.iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_inverted_bounds_fail() {
        let config = TimingGridConfig {
            tau1_group1_min: 40,
            tau1_group1_max: 30,
            ..small_config()
        };
        assert!(matches!(
            TimingGridEnumerator::enumerate(&config),
            Err(InvalidParameterError::InvertedBounds { .. })
        ));
    }

    #[test]
    fn test_full_u32_range_rejected_before_expansion() {
        let config = TimingGridConfig {
            tau1_group1_min: 0,
            tau1_group1_max: u32::MAX,
            time_step: 1,
            ..small_config()
        };
        assert!(matches!(
            TimingGridEnumerator::enumerate(&config),
            Err(InvalidParameterError::GridTooLarge { .. })
        ));
    }

    #[test]
    fn test_default_grid() {
        let grid = TimingGridEnumerator::enumerate(&TimingGridConfig::default()).unwrap();
        // τ1: 30..=50 步长 5 -> 5 个；gap: 45..=75 -> 7 个
        assert_eq!(grid.len(), 5 * 5 * 7 * 7);
    }

    #[test]
    fn test_fixed_timing_single_candidate() {
        let grid = TimingGridEnumerator::resolve(None, &FixedTiming::default()).unwrap();
        let all = grid.to_vec();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], FixedTiming::default().candidate());
    }

    #[test]
    fn test_horizon_filter_keeps_original_index() {
        let grid = TimingGridEnumerator::enumerate(&small_config()).unwrap().with_horizon(36);
        let all = grid.to_vec();
        assert!(all.iter().all(|c| c.latest_tau2() <= 36));
        assert!(all.len() < grid.full_len());
        assert_eq!(grid.iter().len(), all.len());
        // 第一个候选 τ2=(24,24) 保留，index 不变
        assert_eq!(all[0].index, 0);
    }
}
