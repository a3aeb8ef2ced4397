// ==========================================
// 疫苗分配优化系统 - 成本模型
// ==========================================
// 职责: 由 (快照, 候选时机) 推导常数项，构造 Z1/Z2/Z3 线性表达式
// 公式:
//   dose1_g = U1_g·S_g(τ1_g)          dose2_g = U2_g·S_g(τ1_g)
//   U2_g 与 U1_g 同一基数，约束 U2_g ≤ U1_g（第二剂接种者是第一剂接种者的子集）
//   Z1 = Σ_p P_p·x_p + CV1·Σ dose1 + CV2·Σ dose2
//   Z2 = Σ_g SC_g·[I_pre + I_mid·(1 - e1·U1_g) + I_post·(1 - e2·U2_g)]
//   Z3 = Σ_g Cq_g·[Q_pre + Q_mid·(1 - e1·U1_g) + Q_post·(1 - e2·U2_g)]
//   目标 = w1·Z1/N1 + w2·Z2/N2 + w3·Z3/N3
// 窗口: pre=[0,τ1) mid=[τ1,τ2) post=[τ2,末日]
// ==========================================

use crate::domain::allocation::{Allocation, CostBreakdown, DoseCounts};
use crate::domain::cost::{CostParameters, ObjectiveWeights};
use crate::domain::epidemic::EpidemicSnapshot;
use crate::domain::timing::TimingCandidate;
use crate::domain::types::{Compartment, GroupId, NUM_GROUPS};
use crate::engine::error::InvalidParameterError;
use crate::engine::linear::{LinearExpr, Var};
use serde::{Deserialize, Serialize};

/// 三个时间窗口内的人日累计
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindowSums {
    pub pre: f64,
    pub mid: f64,
    pub post: f64,
}

impl WindowSums {
    fn from_snapshot(
        snapshot: &EpidemicSnapshot,
        group: GroupId,
        compartment: Compartment,
        tau1: usize,
        tau2: usize,
    ) -> Self {
        Self {
            pre: snapshot.window_sum(group, compartment, 0, tau1),
            mid: snapshot.window_sum(group, compartment, tau1, tau2),
            post: snapshot.window_sum(group, compartment, tau2, snapshot.len()),
        }
    }

    pub fn total(&self) -> f64 {
        self.pre + self.mid + self.post
    }
}

/// 单组的候选常数项
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupTerms {
    /// S_g(τ1_g)：两剂覆盖率共同的基数
    pub susceptible_at_tau1: f64,
    pub infected: WindowSums,
    pub quarantined: WindowSums,
}

// ==========================================
// CandidateTerms - 候选相关常数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTerms {
    pub candidate: TimingCandidate,
    pub groups: [GroupTerms; NUM_GROUPS],
}

impl CandidateTerms {
    /// 从快照推导；τ2 超出数据范围的候选被拒绝
    pub fn derive(
        snapshot: &EpidemicSnapshot,
        candidate: &TimingCandidate,
    ) -> Result<Self, InvalidParameterError> {
        let horizon = snapshot.horizon();
        let mut groups = [GroupTerms::default(); NUM_GROUPS];

        for group in GroupId::ALL {
            let tau1 = candidate.tau1(group) as usize;
            let tau2 = candidate.tau2(group) as usize;
            if tau2 > horizon {
                return Err(InvalidParameterError::InvalidCandidate {
                    candidate: candidate.to_string(),
                    reason: format!(
                        "{} 的第二剂时间 τ2={} 超出疫情数据范围 (最后一天 {})",
                        group, tau2, horizon
                    ),
                });
            }

            groups[group.index()] = GroupTerms {
                susceptible_at_tau1: snapshot.susceptible_at(group, tau1).unwrap_or(0.0),
                infected: WindowSums::from_snapshot(snapshot, group, Compartment::Infected, tau1, tau2),
                quarantined: WindowSums::from_snapshot(snapshot, group, Compartment::Quarantined, tau1, tau2),
            };
        }

        Ok(Self {
            candidate: *candidate,
            groups,
        })
    }

    pub fn group(&self, group: GroupId) -> &GroupTerms {
        &self.groups[group.index()]
    }
}

// ==========================================
// CostModel - 成本系数 + 目标权重
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct CostModel {
    parameters: CostParameters,
    weights: ObjectiveWeights,
}

impl CostModel {
    /// 构造并校验，构造后不可修改
    pub fn new(parameters: CostParameters, weights: ObjectiveWeights) -> Result<Self, InvalidParameterError> {
        parameters.validate()?;
        weights.validate()?;
        Ok(Self { parameters, weights })
    }

    /// 同一组成本参数换一套权重（对比运行）
    pub fn with_weights(&self, weights: ObjectiveWeights) -> Result<Self, InvalidParameterError> {
        Self::new(self.parameters.clone(), weights)
    }

    pub fn parameters(&self) -> &CostParameters {
        &self.parameters
    }

    pub fn weights(&self) -> &ObjectiveWeights {
        &self.weights
    }

    pub fn num_producers(&self) -> usize {
        self.parameters.num_producers()
    }

    // ===== 剂量表达式 =====

    pub fn dose1_expr(&self, terms: &CandidateTerms, group: GroupId) -> LinearExpr {
        LinearExpr::term(Var::Dose1Coverage(group), terms.group(group).susceptible_at_tau1)
    }

    /// 第二剂从第一剂的接种人群中产生，与 dose1 共用 S_g(τ1_g)
    pub fn dose2_expr(&self, terms: &CandidateTerms, group: GroupId) -> LinearExpr {
        LinearExpr::term(Var::Dose2Coverage(group), terms.group(group).susceptible_at_tau1)
    }

    /// 单组总剂量 dose1_g + dose2_g
    pub fn group_doses_expr(&self, terms: &CandidateTerms, group: GroupId) -> LinearExpr {
        let mut expr = self.dose1_expr(terms, group);
        expr.add_scaled(&self.dose2_expr(terms, group), 1.0);
        expr
    }

    /// 两组总剂量
    pub fn total_doses_expr(&self, terms: &CandidateTerms) -> LinearExpr {
        let mut expr = LinearExpr::default();
        for group in GroupId::ALL {
            expr.add_scaled(&self.group_doses_expr(terms, group), 1.0);
        }
        expr
    }

    /// 总产量 Σx_p
    pub fn total_production_expr(&self) -> LinearExpr {
        let mut expr = LinearExpr::default();
        for p in 0..self.num_producers() {
            expr.add_term(Var::Production(p), 1.0);
        }
        expr
    }

    // ===== 成本分量 =====

    /// Z1 供应成本
    pub fn supply_cost_expr(&self, terms: &CandidateTerms) -> LinearExpr {
        let params = &self.parameters;
        let mut expr = LinearExpr::default();
        for (p, unit_cost) in params.producer_unit_costs.iter().enumerate() {
            expr.add_term(Var::Production(p), *unit_cost);
        }
        for group in GroupId::ALL {
            expr.add_scaled(&self.dose1_expr(terms, group), params.dose1_fixed_cost);
            expr.add_scaled(&self.dose2_expr(terms, group), params.dose2_fixed_cost);
        }
        expr
    }

    /// Z2 社会成本（感染人日）
    pub fn social_cost_expr(&self, terms: &CandidateTerms) -> LinearExpr {
        let mut expr = LinearExpr::default();
        for group in GroupId::ALL {
            let coef = self.parameters.social_costs[group.index()];
            expr.add_scaled(&self.exposure_expr(&terms.group(group).infected, group), coef);
        }
        expr
    }

    /// Z3 经济成本（隔离/停工人日）
    pub fn economic_cost_expr(&self, terms: &CandidateTerms) -> LinearExpr {
        let mut expr = LinearExpr::default();
        for group in GroupId::ALL {
            let coef = self.parameters.closure_costs[group.index()];
            expr.add_scaled(&self.exposure_expr(&terms.group(group).quarantined, group), coef);
        }
        expr
    }

    /// pre + mid·(1 - e1·U1) + post·(1 - e2·U2)
    fn exposure_expr(&self, window: &WindowSums, group: GroupId) -> LinearExpr {
        let mut expr = LinearExpr::constant(window.total());
        expr.add_term(Var::Dose1Coverage(group), -self.parameters.dose1_efficacy * window.mid)
            .add_term(Var::Dose2Coverage(group), -self.parameters.dose2_efficacy * window.post);
        expr
    }

    pub fn component_exprs(&self, terms: &CandidateTerms) -> [LinearExpr; 3] {
        [
            self.supply_cost_expr(terms),
            self.social_cost_expr(terms),
            self.economic_cost_expr(terms),
        ]
    }

    /// 加权、归一化后的目标函数（合并同类项）
    pub fn objective_expr(&self, terms: &CandidateTerms) -> LinearExpr {
        let mut expr = LinearExpr::default();
        let factors = self.component_factors();
        for (component, factor) in self.component_exprs(terms).iter().zip(factors.iter()) {
            expr.add_scaled(component, *factor);
        }
        expr.simplified()
    }

    /// w_i / N_i
    fn component_factors(&self) -> [f64; 3] {
        let w = self.weights.as_array();
        let n = self.parameters.normalization;
        [w[0] / n[0], w[1] / n[1], w[2] / n[2]]
    }

    // ===== 代入求值 =====

    pub fn evaluate_components(&self, allocation: &Allocation, terms: &CandidateTerms) -> CostBreakdown {
        let [z1, z2, z3] = self.component_exprs(terms);
        CostBreakdown {
            supply: z1.evaluate(allocation),
            social: z2.evaluate(allocation),
            economic: z3.evaluate(allocation),
        }
    }

    /// 由分量计算加权目标值
    pub fn weighted(&self, breakdown: &CostBreakdown) -> f64 {
        let factors = self.component_factors();
        breakdown
            .as_array()
            .iter()
            .zip(factors.iter())
            .map(|(z, f)| z * f)
            .sum()
    }

    pub fn weighted_objective(&self, allocation: &Allocation, terms: &CandidateTerms) -> f64 {
        self.weighted(&self.evaluate_components(allocation, terms))
    }

    pub fn dose_counts(&self, allocation: &Allocation, terms: &CandidateTerms) -> DoseCounts {
        let mut doses = DoseCounts::default();
        for group in GroupId::ALL {
            doses.dose1[group.index()] = self.dose1_expr(terms, group).evaluate(allocation);
            doses.dose2[group.index()] = self.dose2_expr(terms, group).evaluate(allocation);
        }
        doses
    }
}
