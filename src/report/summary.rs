// ==========================================
// 疫苗分配优化系统 - 结果报告
// ==========================================
// 职责: 最优解 -> 结构化报告（JSON 导出 + 控制台摘要）
// 内容: 最优时机、覆盖率、各生产商产量、目标值及分量、
//       产能利用率、可行候选占比、公平性指标
// ==========================================

use crate::domain::allocation::{CostBreakdown, Solution};
use crate::domain::capacity::{CapacityConstraint, ProductionPool};
use crate::domain::cost::{CostParameters, ObjectiveWeights};
use crate::domain::epidemic::EpidemicSnapshot;
use crate::domain::types::{GroupId, NUM_GROUPS};
use crate::engine::evaluator::{CandidateRecord, SweepOutcome, SweepSummary};
use crate::engine::orchestrator::WeightRun;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupTimingReport {
    pub tau1: u32,
    pub tau2: u32,
    pub gap: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingReport {
    pub group1: GroupTimingReport,
    pub group2: GroupTimingReport,
    pub candidate_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveComponents {
    /// Z1 供应成本
    pub supply_cost: f64,
    /// Z2 社会成本
    pub social_cost: f64,
    /// Z3 经济成本
    pub economic_cost: f64,
    /// w_i·Z_i/N_i
    pub weighted_supply: f64,
    pub weighted_social: f64,
    pub weighted_economic: f64,
}

impl ObjectiveComponents {
    fn from_breakdown(breakdown: &CostBreakdown, weights: &ObjectiveWeights, params: &CostParameters) -> Self {
        let w = weights.as_array();
        let n = params.normalization;
        Self {
            supply_cost: breakdown.supply,
            social_cost: breakdown.social,
            economic_cost: breakdown.economic,
            weighted_supply: w[0] * breakdown.supply / n[0],
            weighted_social: w[1] * breakdown.social / n[1],
            weighted_economic: w[2] * breakdown.economic / n[2],
        }
    }

    pub fn weighted_total(&self) -> f64 {
        self.weighted_supply + self.weighted_social + self.weighted_economic
    }
}

/// 单组分配结果（覆盖率以百分比表示）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupAllocationReport {
    pub dose1_coverage_pct: f64,
    pub dose2_coverage_pct: f64,
    pub dose1_count: f64,
    pub dose2_count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerReport {
    pub producer: usize,
    pub units: f64,
    pub unit_cost: f64,
    /// 占总供应成本（不含固定接种成本）的比例
    pub cost_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationReport {
    pub group1: GroupAllocationReport,
    pub group2: GroupAllocationReport,
    pub producers: Vec<ProducerReport>,
    pub total_doses: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityReport {
    pub limit_units: f64,
    pub used_units: f64,
    pub remaining_units: f64,
    pub utilization_ratio: f64,
}

/// 公平性指标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityMetrics {
    /// |U1_1 - U1_2|
    pub equity_diff_dose1: f64,
    /// |U2_1 - U2_2|
    pub equity_diff_dose2: f64,
    /// 组 1 人口占比
    pub population_ratio_group1: f64,
    /// 组 1 第一剂剂量占比
    pub allocation_ratio_dose1: f64,
    /// min(剂量占比 / 人口占比, 1)
    pub population_effectiveness: f64,
}

impl EquityMetrics {
    pub fn compute(solution: &Solution, snapshot: &EpidemicSnapshot) -> Self {
        let allocation = &solution.allocation;
        let pop1 = snapshot.population(GroupId::Group1);
        let pop_total = pop1 + snapshot.population(GroupId::Group2);
        let population_ratio_group1 = ratio(pop1, pop_total);
        let allocation_ratio_dose1 = ratio(solution.doses.dose1[0], solution.doses.total_dose1());
        let population_effectiveness = if population_ratio_group1 > 0.0 {
            (allocation_ratio_dose1 / population_ratio_group1).min(1.0)
        } else {
            0.0
        };

        Self {
            equity_diff_dose1: (allocation.u1(GroupId::Group1) - allocation.u1(GroupId::Group2)).abs(),
            equity_diff_dose2: (allocation.u2(GroupId::Group1) - allocation.u2(GroupId::Group2)).abs(),
            population_ratio_group1,
            allocation_ratio_dose1,
            population_effectiveness,
        }
    }
}

fn ratio(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        part / total
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    pub search_enabled: bool,
    pub total_candidates: usize,
    pub evaluated: usize,
    pub feasible: usize,
    pub infeasible: usize,
    pub unbounded: usize,
    pub solver_errors: usize,
    pub rejected: usize,
    pub feasible_ratio: f64,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl SearchReport {
    pub fn from_summary(summary: &SweepSummary, search_enabled: bool) -> Self {
        Self {
            search_enabled,
            total_candidates: summary.total,
            evaluated: summary.evaluated,
            feasible: summary.optimal,
            infeasible: summary.infeasible,
            unbounded: summary.unbounded,
            solver_errors: summary.solver_errors,
            rejected: summary.rejected,
            feasible_ratio: summary.feasible_ratio(),
            cancelled: summary.cancelled,
            elapsed_ms: summary.elapsed_ms,
        }
    }
}

// ==========================================
// OptimizationReport - 单次运行报告
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub run_id: String,
    pub generated_at: DateTime<Local>,
    pub weights: ObjectiveWeights,
    pub optimal_timing: TimingReport,
    pub optimal_cost: f64,
    pub objective_components: ObjectiveComponents,
    pub allocation_results: AllocationReport,
    pub capacity: CapacityReport,
    pub equity_metrics: EquityMetrics,
    pub search: SearchReport,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timing_trace: Vec<CandidateRecord>,
}

impl OptimizationReport {
    pub fn build(
        outcome: &SweepOutcome,
        weights: &ObjectiveWeights,
        parameters: &CostParameters,
        snapshot: &EpidemicSnapshot,
        search_enabled: bool,
    ) -> Self {
        let best = &outcome.best;
        let candidate = &best.candidate;
        let timing = |g: GroupId| GroupTimingReport {
            tau1: candidate.tau1(g),
            tau2: candidate.tau2(g),
            gap: candidate.gap(g),
        };

        let group_report = |g: GroupId| GroupAllocationReport {
            dose1_coverage_pct: best.allocation.u1(g) * 100.0,
            dose2_coverage_pct: best.allocation.u2(g) * 100.0,
            dose1_count: best.doses.dose1[g.index()],
            dose2_count: best.doses.dose2[g.index()],
        };

        let production_cost: f64 = best
            .allocation
            .production_units
            .iter()
            .zip(parameters.producer_unit_costs.iter())
            .map(|(x, p)| x * p)
            .sum();
        let producers = best
            .allocation
            .production_units
            .iter()
            .zip(parameters.producer_unit_costs.iter())
            .enumerate()
            .map(|(p, (units, unit_cost))| ProducerReport {
                producer: p + 1,
                units: *units,
                unit_cost: *unit_cost,
                cost_share: ratio(units * unit_cost, production_cost),
            })
            .collect();

        let pool = ProductionPool::with_used(parameters.production_capacity, best.allocation.total_production());

        Self {
            run_id: Uuid::new_v4().to_string(),
            generated_at: Local::now(),
            weights: weights.clone(),
            optimal_timing: TimingReport {
                group1: timing(GroupId::Group1),
                group2: timing(GroupId::Group2),
                candidate_index: candidate.index,
            },
            optimal_cost: best.objective,
            objective_components: ObjectiveComponents::from_breakdown(&best.breakdown, weights, parameters),
            allocation_results: AllocationReport {
                group1: group_report(GroupId::Group1),
                group2: group_report(GroupId::Group2),
                producers,
                total_doses: best.doses.total(),
            },
            capacity: CapacityReport {
                limit_units: pool.limit_units,
                used_units: pool.used_units,
                remaining_units: pool.remaining_units(),
                utilization_ratio: pool.utilization_ratio(),
            },
            equity_metrics: EquityMetrics::compute(best, snapshot),
            search: SearchReport::from_summary(&outcome.summary, search_enabled),
            timing_trace: outcome.summary.trace.clone(),
        }
    }

    /// 控制台摘要
    pub fn render_console(&self) -> String {
        let mut out = String::new();
        let t = &self.optimal_timing;
        let a = &self.allocation_results;
        let c = &self.objective_components;
        let _ = writeln!(out, "==================================================");
        let _ = writeln!(out, "疫苗分配优化结果  run_id={}", self.run_id);
        let _ = writeln!(
            out,
            "权重: {} (w1={:.2}, w2={:.2}, w3={:.2})",
            self.weights.name, self.weights.w1, self.weights.w2, self.weights.w3
        );
        let _ = writeln!(out, "--------------------------------------------------");
        for (title, g) in [("组 1", &t.group1), ("组 2", &t.group2)] {
            let _ = writeln!(out, "{}: 第一剂 第 {} 天，第二剂 第 {} 天 (间隔 {} 天)", title, g.tau1, g.tau2, g.gap);
        }
        for (title, g) in [("组 1", &a.group1), ("组 2", &a.group2)] {
            let _ = writeln!(
                out,
                "{}: 第一剂覆盖率 {:.2}% ({:.0} 剂)，第二剂覆盖率 {:.2}% ({:.0} 剂)",
                title, g.dose1_coverage_pct, g.dose1_count, g.dose2_coverage_pct, g.dose2_count
            );
        }
        for p in &a.producers {
            let _ = writeln!(out, "生产商 {}: {:.0} 剂 (成本占比 {:.1}%)", p.producer, p.units, p.cost_share * 100.0);
        }
        let _ = writeln!(out, "--------------------------------------------------");
        let _ = writeln!(out, "加权目标值: {:.6}", self.optimal_cost);
        let _ = writeln!(
            out,
            "Z1 供应成本 {:.2} / Z2 社会成本 {:.2} / Z3 经济成本 {:.2}",
            c.supply_cost, c.social_cost, c.economic_cost
        );
        let _ = writeln!(
            out,
            "产能利用率: {:.1}% ({:.0}/{:.0})",
            self.capacity.utilization_ratio * 100.0,
            self.capacity.used_units,
            self.capacity.limit_units
        );
        let _ = writeln!(
            out,
            "可行候选: {}/{} ({:.1}%){}",
            self.search.feasible,
            self.search.total_candidates,
            self.search.feasible_ratio * 100.0,
            if self.search.cancelled { "，扫描被中止" } else { "" }
        );
        let _ = writeln!(
            out,
            "公平性: 第一剂覆盖率差 {:.3}，第二剂覆盖率差 {:.3}，人口有效性 {:.3}",
            self.equity_metrics.equity_diff_dose1,
            self.equity_metrics.equity_diff_dose2,
            self.equity_metrics.population_effectiveness
        );
        out
    }
}

// ==========================================
// ComparisonReport - 多权重对比
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub weights: ObjectiveWeights,
    pub feasible: bool,
    pub optimal_timing: Option<TimingReport>,
    pub optimal_cost: Option<f64>,
    pub objective_components: Option<ObjectiveComponents>,
    /// [U1_1, U1_2, U2_1, U2_2]（百分比）
    pub coverage_pct: Option<[f64; 2 * NUM_GROUPS]>,
    pub feasible_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub run_id: String,
    pub generated_at: DateTime<Local>,
    pub entries: Vec<ComparisonEntry>,
}

impl ComparisonReport {
    pub fn build(runs: &[WeightRun], parameters: &CostParameters, snapshot: &EpidemicSnapshot) -> Self {
        let entries = runs
            .iter()
            .map(|run| match &run.result {
                Ok(outcome) => {
                    let report = OptimizationReport::build(outcome, &run.weights, parameters, snapshot, true);
                    let u = &outcome.best.allocation;
                    ComparisonEntry {
                        weights: run.weights.clone(),
                        feasible: true,
                        optimal_timing: Some(report.optimal_timing),
                        optimal_cost: Some(report.optimal_cost),
                        objective_components: Some(report.objective_components),
                        coverage_pct: Some([
                            u.dose1_coverage[0] * 100.0,
                            u.dose1_coverage[1] * 100.0,
                            u.dose2_coverage[0] * 100.0,
                            u.dose2_coverage[1] * 100.0,
                        ]),
                        feasible_ratio: outcome.summary.feasible_ratio(),
                    }
                }
                Err(e) => ComparisonEntry {
                    weights: run.weights.clone(),
                    feasible: false,
                    optimal_timing: None,
                    optimal_cost: None,
                    objective_components: None,
                    coverage_pct: None,
                    feasible_ratio: e.summary.feasible_ratio(),
                },
            })
            .collect();

        Self {
            run_id: Uuid::new_v4().to_string(),
            generated_at: Local::now(),
            entries,
        }
    }

    pub fn render_console(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "==================================================");
        let _ = writeln!(out, "权重对比 ({} 套)", self.entries.len());
        for e in &self.entries {
            match (&e.optimal_timing, e.optimal_cost) {
                (Some(t), Some(cost)) => {
                    let _ = writeln!(
                        out,
                        "{:<22} 目标值 {:.6}  τ1=({},{}) τ2=({},{})",
                        e.weights.name, cost, t.group1.tau1, t.group2.tau1, t.group1.tau2, t.group2.tau2
                    );
                }
                _ => {
                    let _ = writeln!(out, "{:<22} 无可行解", e.weights.name);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::allocation::{Allocation, DoseCounts};
    use crate::domain::epidemic::{CompartmentSizes, EpidemicRow};
    use crate::domain::timing::{GroupTiming, TimingCandidate};
    use crate::domain::types::SolveStatus;

    fn snapshot() -> EpidemicSnapshot {
        let g1 = CompartmentSizes {
            susceptible: 600.0,
            recovered: 0.0,
            ..Default::default()
        };
        let g2 = CompartmentSizes {
            susceptible: 400.0,
            ..Default::default()
        };
        EpidemicSnapshot::from_rows(vec![EpidemicRow {
            time: 0.0,
            groups: [g1, g2],
        }])
        .unwrap()
    }

    fn outcome() -> SweepOutcome {
        SweepOutcome {
            best: Solution {
                candidate: TimingCandidate::new(7, [GroupTiming::new(10, 14), GroupTiming::new(12, 20)]),
                status: SolveStatus::Optimal,
                allocation: Allocation {
                    dose1_coverage: [0.5, 0.2],
                    dose2_coverage: [0.1, 0.1],
                    production_units: vec![300.0, 900.0],
                },
                objective: 1.25,
                breakdown: CostBreakdown {
                    supply: 5000.0,
                    social: 400000.0,
                    economic: 1.0e7,
                },
                doses: DoseCounts {
                    dose1: [300.0, 100.0],
                    dose2: [20.0, 10.0],
                },
            },
            summary: SweepSummary {
                total: 10,
                evaluated: 10,
                optimal: 4,
                infeasible: 6,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_report_fields() {
        let params = CostParameters::default();
        let weights = ObjectiveWeights::balanced();
        let report = OptimizationReport::build(&outcome(), &weights, &params, &snapshot(), true);

        assert_eq!(report.optimal_timing.group2.tau2, 32);
        assert_eq!(report.optimal_timing.candidate_index, 7);
        assert!((report.allocation_results.group1.dose1_coverage_pct - 50.0).abs() < 1e-9);
        assert!((report.capacity.utilization_ratio - 0.4).abs() < 1e-9);
        assert!((report.search.feasible_ratio - 0.4).abs() < 1e-9);
        // 分量恰为归一化除数时，加权值即为权重
        assert!((report.objective_components.weighted_total() - 1.0).abs() < 1e-9);
        let shares: f64 = report.allocation_results.producers.iter().map(|p| p.cost_share).sum();
        assert!((shares - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_equity_metrics() {
        let out = outcome();
        let equity = EquityMetrics::compute(&out.best, &snapshot());
        assert!((equity.equity_diff_dose1 - 0.3).abs() < 1e-9);
        assert!(equity.equity_diff_dose2.abs() < 1e-9);
        assert!((equity.population_ratio_group1 - 0.6).abs() < 1e-9);
        assert!((equity.allocation_ratio_dose1 - 0.75).abs() < 1e-9);
        assert_eq!(equity.population_effectiveness, 1.0);
    }

    #[test]
    fn test_json_keys() {
        let params = CostParameters::default();
        let report = OptimizationReport::build(&outcome(), &ObjectiveWeights::balanced(), &params, &snapshot(), false);
        let value = serde_json::to_value(&report).unwrap();
        for key in [
            "optimal_timing",
            "optimal_cost",
            "objective_components",
            "weights",
            "allocation_results",
            "equity_metrics",
        ] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
        assert!(value.get("timing_trace").is_none());
        assert!(report.render_console().contains("可行候选: 4/10"));
    }
}
