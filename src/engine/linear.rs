// ==========================================
// 疫苗分配优化系统 - 线性表达式
// ==========================================
// 决策变量与线性表达式的纯数据表示
// 目标函数、约束、成本分量共用同一套表达式，保证报表值与求解目标一致
// ==========================================

use crate::domain::allocation::Allocation;
use crate::domain::types::GroupId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 决策变量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Var {
    /// U1_g
    Dose1Coverage(GroupId),
    /// U2_g
    Dose2Coverage(GroupId),
    /// x_p
    Production(usize),
}

impl Var {
    /// 在给定分配方案下的取值
    pub fn value_in(&self, allocation: &Allocation) -> f64 {
        match self {
            Var::Dose1Coverage(g) => allocation.u1(*g),
            Var::Dose2Coverage(g) => allocation.u2(*g),
            Var::Production(p) => allocation.production_units.get(*p).copied().unwrap_or(0.0),
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Var::Dose1Coverage(g) => write!(f, "U1_{}", g.number()),
            Var::Dose2Coverage(g) => write!(f, "U2_{}", g.number()),
            Var::Production(p) => write!(f, "x_{}", p + 1),
        }
    }
}

/// 线性表达式: constant + Σ coef·var
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LinearExpr {
    pub constant: f64,
    pub terms: Vec<(Var, f64)>,
}

impl LinearExpr {
    pub fn constant(value: f64) -> Self {
        Self {
            constant: value,
            terms: Vec::new(),
        }
    }

    pub fn var(var: Var) -> Self {
        Self::term(var, 1.0)
    }

    pub fn term(var: Var, coef: f64) -> Self {
        Self {
            constant: 0.0,
            terms: vec![(var, coef)],
        }
    }

    pub fn add_constant(&mut self, value: f64) -> &mut Self {
        self.constant += value;
        self
    }

    pub fn add_term(&mut self, var: Var, coef: f64) -> &mut Self {
        if coef != 0.0 {
            self.terms.push((var, coef));
        }
        self
    }

    /// self += k·other
    pub fn add_scaled(&mut self, other: &LinearExpr, k: f64) -> &mut Self {
        self.constant += k * other.constant;
        for (var, coef) in &other.terms {
            self.add_term(*var, k * coef);
        }
        self
    }

    pub fn scaled(&self, k: f64) -> LinearExpr {
        let mut out = LinearExpr::default();
        out.add_scaled(self, k);
        out
    }

    /// self - other
    pub fn minus(&self, other: &LinearExpr) -> LinearExpr {
        let mut out = self.clone();
        out.add_scaled(other, -1.0);
        out
    }

    /// 合并同类项（按变量排序，系数为 0 的项剔除）
    pub fn simplified(&self) -> LinearExpr {
        let mut terms: Vec<(Var, f64)> = Vec::new();
        let mut sorted = self.terms.clone();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        for (var, coef) in sorted {
            match terms.last_mut() {
                Some((last, acc)) if *last == var => *acc += coef,
                _ => terms.push((var, coef)),
            }
        }
        terms.retain(|(_, c)| *c != 0.0);
        LinearExpr {
            constant: self.constant,
            terms,
        }
    }

    pub fn coefficient(&self, var: Var) -> f64 {
        self.terms
            .iter()
            .filter(|(v, _)| *v == var)
            .map(|(_, c)| *c)
            .sum()
    }

    /// 代入分配方案求值
    pub fn evaluate(&self, allocation: &Allocation) -> f64 {
        self.constant
            + self
                .terms
                .iter()
                .map(|(var, coef)| coef * var.value_in(allocation))
                .sum::<f64>()
    }
}
