// ==========================================
// 疫苗分配优化系统 - 分配模型构建器
// ==========================================
// 职责: 对单个候选时机构造线性规划模型（不求解）
// 变量: U1_g, U2_g ∈ [0, cap]; x_p ∈ [0, L]
// 约束:
// 1) Σx_p ≤ L；Σ(dose1_g + dose2_g) ≤ Σx_p
// 2) U1_g ≥ floor1_g；U2_g ≥ floor2_g
// 3) U2_g ≤ U1_g（第二剂接种者不超过第一剂接种者）
// 4) 生产商份额、分组剂量份额、分组覆盖率差（按策略可选）
// 拒绝: gap_g < 最小剂次间隔；τ2 超出数据范围
// 红线: 纯函数，无 I/O，结果可跨线程共享
// ==========================================

use crate::domain::allocation::Allocation;
use crate::domain::epidemic::EpidemicSnapshot;
use crate::domain::policy::AllocationPolicy;
use crate::domain::timing::TimingCandidate;
use crate::domain::types::GroupId;
use crate::engine::cost_model::{CandidateTerms, CostModel};
use crate::engine::error::InvalidParameterError;
use crate::engine::linear::{LinearExpr, Var};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 约束方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintSense {
    LessEq,
    GreaterEq,
}

impl fmt::Display for ConstraintSense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintSense::LessEq => write!(f, "<="),
            ConstraintSense::GreaterEq => write!(f, ">="),
        }
    }
}

/// 命名约束: expr (sense) rhs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConstraint {
    pub name: String,
    pub expr: LinearExpr,
    pub sense: ConstraintSense,
    pub rhs: f64,
}

impl ModelConstraint {
    fn new(name: impl Into<String>, expr: LinearExpr, sense: ConstraintSense, rhs: f64) -> Self {
        Self {
            name: name.into(),
            expr: expr.simplified(),
            sense,
            rhs,
        }
    }

    /// 在容差内是否满足
    pub fn is_satisfied_by(&self, allocation: &Allocation, tolerance: f64) -> bool {
        let lhs = self.expr.evaluate(allocation);
        match self.sense {
            ConstraintSense::LessEq => lhs <= self.rhs + tolerance,
            ConstraintSense::GreaterEq => lhs >= self.rhs - tolerance,
        }
    }
}

/// 变量及其上下界
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub var: Var,
    pub lower: f64,
    pub upper: f64,
}

// ==========================================
// AllocationModel - 待求解模型（纯数据）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationModel {
    pub candidate: TimingCandidate,
    pub terms: CandidateTerms,
    pub num_producers: usize,
    pub variables: Vec<VariableSpec>,
    /// 最小化目标
    pub objective: LinearExpr,
    pub constraints: Vec<ModelConstraint>,
}

impl AllocationModel {
    /// 违反的约束名（变量上下界一并检查）
    pub fn violations(&self, allocation: &Allocation, tolerance: f64) -> Vec<String> {
        let mut violated: Vec<String> = self
            .variables
            .iter()
            .filter(|spec| {
                let v = spec.var.value_in(allocation);
                v < spec.lower - tolerance || v > spec.upper + tolerance
            })
            .map(|spec| format!("bounds[{}]", spec.var))
            .collect();
        violated.extend(
            self.constraints
                .iter()
                .filter(|c| !c.is_satisfied_by(allocation, tolerance))
                .map(|c| c.name.clone()),
        );
        violated
    }

    pub fn constraint(&self, name: &str) -> Option<&ModelConstraint> {
        self.constraints.iter().find(|c| c.name == name)
    }
}

// ==========================================
// AllocationModelBuilder
// ==========================================
pub struct AllocationModelBuilder<'a> {
    snapshot: &'a EpidemicSnapshot,
    cost_model: &'a CostModel,
    policy: &'a AllocationPolicy,
}

impl<'a> AllocationModelBuilder<'a> {
    pub fn new(snapshot: &'a EpidemicSnapshot, cost_model: &'a CostModel, policy: &'a AllocationPolicy) -> Self {
        Self {
            snapshot,
            cost_model,
            policy,
        }
    }

    /// 构造单个候选的模型
    pub fn build(&self, candidate: &TimingCandidate) -> Result<AllocationModel, InvalidParameterError> {
        self.check_dose_interval(candidate)?;
        let terms = CandidateTerms::derive(self.snapshot, candidate)?;

        let cost_model = self.cost_model;
        let policy = self.policy;
        let capacity = cost_model.parameters().production_capacity;
        let num_producers = cost_model.num_producers();

        // ===== 变量 =====
        let mut variables = Vec::with_capacity(2 * GroupId::ALL.len() + num_producers);
        for group in GroupId::ALL {
            variables.push(VariableSpec {
                var: Var::Dose1Coverage(group),
                lower: 0.0,
                upper: policy.coverage_cap,
            });
            variables.push(VariableSpec {
                var: Var::Dose2Coverage(group),
                lower: 0.0,
                upper: policy.coverage_cap,
            });
        }
        for p in 0..num_producers {
            variables.push(VariableSpec {
                var: Var::Production(p),
                lower: 0.0,
                upper: capacity,
            });
        }

        // ===== 约束 =====
        let total_production = cost_model.total_production_expr();
        let total_doses = cost_model.total_doses_expr(&terms);
        let mut constraints = vec![
            ModelConstraint::new(
                "production_capacity",
                total_production.clone(),
                ConstraintSense::LessEq,
                capacity,
            ),
            ModelConstraint::new(
                "dose_supply",
                total_doses.minus(&total_production),
                ConstraintSense::LessEq,
                0.0,
            ),
        ];

        for group in GroupId::ALL {
            constraints.push(ModelConstraint::new(
                format!("dose1_floor_{}", group),
                LinearExpr::var(Var::Dose1Coverage(group)),
                ConstraintSense::GreaterEq,
                policy.dose1_floor(group),
            ));
            constraints.push(ModelConstraint::new(
                format!("dose2_floor_{}", group),
                LinearExpr::var(Var::Dose2Coverage(group)),
                ConstraintSense::GreaterEq,
                policy.dose2_floor(group),
            ));
            constraints.push(ModelConstraint::new(
                format!("dose2_order_{}", group),
                LinearExpr::var(Var::Dose2Coverage(group)).minus(&LinearExpr::var(Var::Dose1Coverage(group))),
                ConstraintSense::LessEq,
                0.0,
            ));
        }

        if let Some((min_share, max_share)) = policy.producer_share_bounds {
            if num_producers >= 2 {
                for p in 0..num_producers {
                    let unit = LinearExpr::var(Var::Production(p));
                    constraints.push(ModelConstraint::new(
                        format!("producer_share_min_{}", p + 1),
                        unit.minus(&total_production.scaled(min_share)),
                        ConstraintSense::GreaterEq,
                        0.0,
                    ));
                    constraints.push(ModelConstraint::new(
                        format!("producer_share_max_{}", p + 1),
                        unit.minus(&total_production.scaled(max_share)),
                        ConstraintSense::LessEq,
                        0.0,
                    ));
                }
            }
        }

        if let Some(share) = policy.min_group_dose_share {
            for group in GroupId::ALL {
                constraints.push(ModelConstraint::new(
                    format!("group_dose_share_{}", group),
                    cost_model
                        .group_doses_expr(&terms, group)
                        .minus(&total_doses.scaled(share)),
                    ConstraintSense::GreaterEq,
                    0.0,
                ));
            }
        }

        if let Some(max_gap) = policy.max_coverage_gap {
            let coverage = |group: GroupId| {
                let mut expr = LinearExpr::var(Var::Dose1Coverage(group));
                expr.add_term(Var::Dose2Coverage(group), 1.0);
                expr
            };
            let diff = coverage(GroupId::Group1).minus(&coverage(GroupId::Group2));
            constraints.push(ModelConstraint::new(
                "coverage_gap_upper",
                diff.clone(),
                ConstraintSense::LessEq,
                max_gap,
            ));
            constraints.push(ModelConstraint::new(
                "coverage_gap_lower",
                diff,
                ConstraintSense::GreaterEq,
                -max_gap,
            ));
        }

        Ok(AllocationModel {
            candidate: *candidate,
            objective: cost_model.objective_expr(&terms),
            terms,
            num_producers,
            variables,
            constraints,
        })
    }

    fn check_dose_interval(&self, candidate: &TimingCandidate) -> Result<(), InvalidParameterError> {
        let min_interval = self.policy.min_dose_interval_days;
        for group in GroupId::ALL {
            let gap = candidate.gap(group);
            if gap < min_interval {
                return Err(InvalidParameterError::InvalidCandidate {
                    candidate: candidate.to_string(),
                    reason: format!("{} 的剂次间隔 {} 天小于最小间隔 {} 天", group, gap, min_interval),
                });
            }
        }
        Ok(())
    }
}
