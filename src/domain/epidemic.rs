// ==========================================
// 疫苗分配优化系统 - 疫情快照领域模型
// ==========================================
// 职责: 按时间步、分组保存仓室规模序列 (S/I/Q/V1/V2/R)
// 红线: 加载完成后只读，引擎层只通过访问器读取
// ==========================================

use crate::domain::types::{Compartment, GroupId, NUM_GROUPS};
use crate::domain::error::SnapshotError;
use serde::{Deserialize, Serialize};

/// 守恒律允许的相对漂移（超过则告警）
pub const CONSERVATION_TOLERANCE: f64 = 1e-3;

// ==========================================
// CompartmentSizes - 单时间步单分组的仓室规模
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CompartmentSizes {
    pub susceptible: f64,
    pub infected: f64,
    pub quarantined: f64,
    pub vaccinated1: f64,
    pub vaccinated2: f64,
    pub recovered: f64,
}

impl CompartmentSizes {
    pub fn get(&self, compartment: Compartment) -> f64 {
        match compartment {
            Compartment::Susceptible => self.susceptible,
            Compartment::Infected => self.infected,
            Compartment::Quarantined => self.quarantined,
            Compartment::Vaccinated1 => self.vaccinated1,
            Compartment::Vaccinated2 => self.vaccinated2,
            Compartment::Recovered => self.recovered,
        }
    }

    /// 分组总人口
    pub fn total(&self) -> f64 {
        Compartment::ALL.iter().map(|c| self.get(*c)).sum()
    }
}

/// 输入的一行：时间 + 两组仓室
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpidemicRow {
    pub time: f64,
    pub groups: [CompartmentSizes; NUM_GROUPS],
}

// ==========================================
// GroupSeries - 单分组的列式时间序列（供绘图/报表读取）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSeries {
    pub susceptible: Vec<f64>,
    pub infected: Vec<f64>,
    pub quarantined: Vec<f64>,
    pub vaccinated1: Vec<f64>,
    pub vaccinated2: Vec<f64>,
    pub recovered: Vec<f64>,
}

impl GroupSeries {
    pub fn column(&self, compartment: Compartment) -> &[f64] {
        match compartment {
            Compartment::Susceptible => &self.susceptible,
            Compartment::Infected => &self.infected,
            Compartment::Quarantined => &self.quarantined,
            Compartment::Vaccinated1 => &self.vaccinated1,
            Compartment::Vaccinated2 => &self.vaccinated2,
            Compartment::Recovered => &self.recovered,
        }
    }

    fn push(&mut self, sizes: &CompartmentSizes) {
        self.susceptible.push(sizes.susceptible);
        self.infected.push(sizes.infected);
        self.quarantined.push(sizes.quarantined);
        self.vaccinated1.push(sizes.vaccinated1);
        self.vaccinated2.push(sizes.vaccinated2);
        self.recovered.push(sizes.recovered);
    }

    fn total_at(&self, day: usize) -> f64 {
        Compartment::ALL
            .iter()
            .map(|c| self.column(*c).get(day).copied().unwrap_or(0.0))
            .sum()
    }
}

// ==========================================
// EpidemicSnapshot - 疫情轨迹快照
// ==========================================
// 天数下标 = 行序号（第 0 行为第 0 天），Time 列只用于校验与展示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpidemicSnapshot {
    times: Vec<f64>,
    series: [GroupSeries; NUM_GROUPS],
}

impl EpidemicSnapshot {
    /// 从行数据构造快照
    ///
    /// # 校验
    /// - 至少一行
    /// - Time 严格递增
    /// - 所有仓室值有限且非负
    pub fn from_rows(rows: Vec<EpidemicRow>) -> Result<Self, SnapshotError> {
        if rows.is_empty() {
            return Err(SnapshotError::EmptyData);
        }

        let mut times = Vec::with_capacity(rows.len());
        let mut series: [GroupSeries; NUM_GROUPS] = Default::default();

        for (row_idx, row) in rows.iter().enumerate() {
            if !row.time.is_finite() {
                return Err(SnapshotError::InvalidValue {
                    row: row_idx + 1,
                    column: "Time".to_string(),
                    value: row.time,
                });
            }
            if let Some(prev) = times.last() {
                if row.time <= *prev {
                    return Err(SnapshotError::NonIncreasingTime {
                        row: row_idx + 1,
                        previous: *prev,
                        current: row.time,
                    });
                }
            }
            times.push(row.time);

            for group in GroupId::ALL {
                let sizes = &row.groups[group.index()];
                for compartment in Compartment::ALL {
                    let value = sizes.get(compartment);
                    if !value.is_finite() || value < 0.0 {
                        return Err(SnapshotError::InvalidValue {
                            row: row_idx + 1,
                            column: compartment.column_name(group),
                            value,
                        });
                    }
                }
                series[group.index()].push(sizes);
            }
        }

        Ok(Self { times, series })
    }

    /// 时间步数量
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// 最后一天的下标（疫情结束时刻）
    pub fn horizon(&self) -> usize {
        self.len().saturating_sub(1)
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// 分组完整序列（绘图用）
    pub fn series(&self, group: GroupId) -> &GroupSeries {
        &self.series[group.index()]
    }

    pub fn compartment_at(&self, group: GroupId, compartment: Compartment, day: usize) -> Option<f64> {
        self.series(group).column(compartment).get(day).copied()
    }

    /// 第 day 天的易感人数
    pub fn susceptible_at(&self, group: GroupId, day: usize) -> Option<f64> {
        self.compartment_at(group, Compartment::Susceptible, day)
    }

    /// 区间 [from, to) 内的人日累计；超出范围的部分按 0 处理
    pub fn window_sum(&self, group: GroupId, compartment: Compartment, from: usize, to: usize) -> f64 {
        let column = self.series(group).column(compartment);
        let end = to.min(column.len());
        if from >= end {
            return 0.0;
        }
        column[from..end].iter().sum()
    }

    /// 分组人口（第 0 天各仓室之和）
    pub fn population(&self, group: GroupId) -> f64 {
        self.series(group).total_at(0)
    }

    /// 守恒律漂移：各时间步总人口相对第 0 天的最大相对偏差
    pub fn conservation_drift(&self, group: GroupId) -> f64 {
        let series = self.series(group);
        let base = series.total_at(0);
        if base <= 0.0 {
            return 0.0;
        }
        (0..self.len())
            .map(|day| ((series.total_at(day) - base) / base).abs())
            .fold(0.0, f64::max)
    }

    /// 是否满足守恒律（容差 CONSERVATION_TOLERANCE）
    pub fn is_conserved(&self) -> bool {
        GroupId::ALL
            .iter()
            .all(|g| self.conservation_drift(*g) <= CONSERVATION_TOLERANCE)
    }
}
