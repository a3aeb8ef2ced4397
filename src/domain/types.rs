// ==========================================
// 疫苗分配优化系统 - 领域类型定义
// ==========================================
// 人群分组、仓室、剂次、求解状态等基础枚举
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 人群分组数量（固定两组：高龄人群 / 经营者人群）
pub const NUM_GROUPS: usize = 2;

// ==========================================
// 人群分组 (Population Group)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupId {
    Group1, // 60 岁以上人群
    Group2, // 经营者人群
}

impl GroupId {
    pub const ALL: [GroupId; NUM_GROUPS] = [GroupId::Group1, GroupId::Group2];

    /// 数组下标（0 起）
    pub fn index(self) -> usize {
        match self {
            GroupId::Group1 => 0,
            GroupId::Group2 => 1,
        }
    }

    /// 输入表格中的列后缀（1 / 2）
    pub fn number(self) -> usize {
        self.index() + 1
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        GroupId::ALL.get(idx).copied()
    }

    pub fn title(self) -> &'static str {
        match self {
            GroupId::Group1 => "60岁以上人群",
            GroupId::Group2 => "经营者人群",
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group{}", self.number())
    }
}

// ==========================================
// 仓室 (Compartment)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compartment {
    Susceptible,  // S
    Infected,     // I
    Quarantined,  // Q
    Vaccinated1,  // V1 仅完成第一剂
    Vaccinated2,  // V2 完成两剂
    Recovered,    // R
}

impl Compartment {
    pub const ALL: [Compartment; 6] = [
        Compartment::Susceptible,
        Compartment::Infected,
        Compartment::Quarantined,
        Compartment::Vaccinated1,
        Compartment::Vaccinated2,
        Compartment::Recovered,
    ];

    /// 输入表格列名
    ///
    /// 疫苗列的命名为 `V{剂次}{组号}`（V11 / V21 / V12 / V22），
    /// 其余列为 `{仓室}{组号}`。
    pub fn column_name(self, group: GroupId) -> String {
        let n = group.number();
        match self {
            Compartment::Susceptible => format!("S{}", n),
            Compartment::Infected => format!("I{}", n),
            Compartment::Quarantined => format!("Q{}", n),
            Compartment::Vaccinated1 => format!("V1{}", n),
            Compartment::Vaccinated2 => format!("V2{}", n),
            Compartment::Recovered => format!("R{}", n),
        }
    }
}

impl fmt::Display for Compartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compartment::Susceptible => write!(f, "S"),
            Compartment::Infected => write!(f, "I"),
            Compartment::Quarantined => write!(f, "Q"),
            Compartment::Vaccinated1 => write!(f, "V1"),
            Compartment::Vaccinated2 => write!(f, "V2"),
            Compartment::Recovered => write!(f, "R"),
        }
    }
}

// ==========================================
// 剂次 (Dose)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dose {
    First,
    Second,
}

impl fmt::Display for Dose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dose::First => write!(f, "DOSE1"),
            Dose::Second => write!(f, "DOSE2"),
        }
    }
}

// ==========================================
// 求解状态 (Solve Status)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    Error,
}

impl SolveStatus {
    /// 只有最优解参与全局择优
    pub fn is_feasible(self) -> bool {
        self == SolveStatus::Optimal
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "OPTIMAL"),
            SolveStatus::Infeasible => write!(f, "INFEASIBLE"),
            SolveStatus::Unbounded => write!(f, "UNBOUNDED"),
            SolveStatus::Error => write!(f, "ERROR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names_follow_input_layout() {
        assert_eq!(Compartment::Susceptible.column_name(GroupId::Group1), "S1");
        assert_eq!(Compartment::Vaccinated1.column_name(GroupId::Group1), "V11");
        assert_eq!(Compartment::Vaccinated2.column_name(GroupId::Group1), "V21");
        assert_eq!(Compartment::Vaccinated1.column_name(GroupId::Group2), "V12");
        assert_eq!(Compartment::Vaccinated2.column_name(GroupId::Group2), "V22");
        assert_eq!(Compartment::Recovered.column_name(GroupId::Group2), "R2");
    }

    #[test]
    fn test_group_index_roundtrip() {
        for g in GroupId::ALL {
            assert_eq!(GroupId::from_index(g.index()), Some(g));
        }
        assert_eq!(GroupId::from_index(2), None);
        assert_eq!(GroupId::Group2.to_string(), "group2");
    }

    #[test]
    fn test_only_optimal_is_feasible() {
        assert!(SolveStatus::Optimal.is_feasible());
        assert!(!SolveStatus::Infeasible.is_feasible());
        assert!(!SolveStatus::Unbounded.is_feasible());
        assert!(!SolveStatus::Error.is_feasible());
    }
}
