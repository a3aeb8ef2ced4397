// ==========================================
// 疫苗分配优化系统 - 引擎编排器
// ==========================================
// 用途: 协调 成本模型 -> 时机网格 -> 候选评估 的执行顺序
// 支持: 单权重运行 / 多权重对比运行
// ==========================================

use crate::domain::cost::{CostParameters, ObjectiveWeights};
use crate::domain::epidemic::EpidemicSnapshot;
use crate::domain::policy::AllocationPolicy;
use crate::domain::timing::{FixedTiming, TimingGridConfig};
use crate::engine::cost_model::CostModel;
use crate::engine::error::{EngineResult, InvalidParameterError, NoFeasibleSolutionError};
use crate::engine::evaluator::{CancellationToken, CandidateEvaluator, EvaluatorOptions, SweepOutcome};
use crate::engine::events::{NoOpProgress, SweepProgress};
use crate::engine::timing_grid::{TimingGrid, TimingGridEnumerator};
use crate::engine::EngineError;
use std::sync::Arc;
use tracing::{info, warn};

// ==========================================
// WeightRun - 对比运行中单套权重的结果
// ==========================================
#[derive(Debug, Clone)]
pub struct WeightRun {
    pub weights: ObjectiveWeights,
    pub result: Result<SweepOutcome, NoFeasibleSolutionError>,
}

impl WeightRun {
    pub fn is_feasible(&self) -> bool {
        self.result.is_ok()
    }
}

// ==========================================
// AllocationOrchestrator - 引擎编排器
// ==========================================
pub struct AllocationOrchestrator {
    snapshot: Arc<EpidemicSnapshot>,
    parameters: CostParameters,
    policy: Arc<AllocationPolicy>,
    options: EvaluatorOptions,
    progress: Arc<dyn SweepProgress>,
    cancellation: CancellationToken,
}

impl AllocationOrchestrator {
    /// 创建编排器（参数与策略在扫描开始前校验）
    pub fn new(
        snapshot: Arc<EpidemicSnapshot>,
        parameters: CostParameters,
        policy: AllocationPolicy,
    ) -> Result<Self, InvalidParameterError> {
        parameters.validate()?;
        policy.validate()?;
        Ok(Self {
            snapshot,
            parameters,
            policy: Arc::new(policy),
            options: EvaluatorOptions::default(),
            progress: Arc::new(NoOpProgress),
            cancellation: CancellationToken::new(),
        })
    }

    pub fn with_options(mut self, options: EvaluatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn SweepProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn snapshot(&self) -> &EpidemicSnapshot {
        &self.snapshot
    }

    pub fn parameters(&self) -> &CostParameters {
        &self.parameters
    }

    pub fn policy(&self) -> &AllocationPolicy {
        &self.policy
    }

    /// 生成候选网格
    ///
    /// # 参数
    /// - grid_config: None 表示不搜索，使用固定时机
    /// - clip_to_horizon: 丢弃 τ2 超出数据范围的候选（否则这些候选计为被拒）
    pub fn prepare_grid(
        &self,
        grid_config: Option<&TimingGridConfig>,
        fixed: &FixedTiming,
        clip_to_horizon: bool,
    ) -> Result<TimingGrid, InvalidParameterError> {
        let grid = TimingGridEnumerator::resolve(grid_config, fixed)?;
        Ok(if clip_to_horizon {
            grid.with_horizon(self.snapshot.horizon())
        } else {
            grid
        })
    }

    /// 构造指定权重的评估器
    pub fn evaluator(&self, weights: ObjectiveWeights) -> Result<CandidateEvaluator, InvalidParameterError> {
        let cost_model = CostModel::new(self.parameters.clone(), weights)?;
        Ok(CandidateEvaluator::new(
            Arc::clone(&self.snapshot),
            Arc::new(cost_model),
            Arc::clone(&self.policy),
        )
        .with_options(self.options.clone())
        .with_progress(Arc::clone(&self.progress))
        .with_cancellation(self.cancellation.clone()))
    }

    /// 单权重运行（workers > 1 时并行扫描）
    pub async fn run(&self, weights: ObjectiveWeights, grid: &TimingGrid) -> EngineResult<SweepOutcome> {
        info!(
            weights = %weights.name,
            w1 = weights.w1,
            w2 = weights.w2,
            w3 = weights.w3,
            candidates = grid.len(),
            "开始优化"
        );
        let evaluator = self.evaluator(weights)?;
        if self.options.workers > 1 {
            evaluator.evaluate_parallel(grid).await
        } else {
            evaluator.evaluate(grid)
        }
    }

    /// 多权重对比运行：逐套权重完整扫描；某套无可行解不影响其他权重
    pub async fn compare(&self, weight_sets: &[ObjectiveWeights], grid: &TimingGrid) -> EngineResult<Vec<WeightRun>> {
        let mut runs = Vec::with_capacity(weight_sets.len());
        for weights in weight_sets {
            if self.cancellation.is_cancelled() {
                warn!(remaining = weight_sets.len() - runs.len(), "对比运行已取消");
                break;
            }
            let result = match self.run(weights.clone(), grid).await {
                Ok(outcome) => Ok(outcome),
                Err(EngineError::NoFeasibleSolution(e)) => {
                    warn!(weights = %weights.name, "该权重下无可行解");
                    Err(e)
                }
                Err(other) => return Err(other),
            };
            runs.push(WeightRun {
                weights: weights.clone(),
                result,
            });
        }
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::epidemic::{CompartmentSizes, EpidemicRow};

    fn snapshot(days: usize) -> Arc<EpidemicSnapshot> {
        let sizes = CompartmentSizes {
            susceptible: 1000.0,
            infected: 20.0,
            quarantined: 5.0,
            vaccinated1: 200.0,
            vaccinated2: 0.0,
            recovered: 0.0,
        };
        let rows = (0..days)
            .map(|d| EpidemicRow {
                time: d as f64,
                groups: [sizes, sizes],
            })
            .collect();
        Arc::new(EpidemicSnapshot::from_rows(rows).unwrap())
    }

    #[test]
    fn test_invalid_policy_rejected_before_sweep() {
        let policy = AllocationPolicy {
            coverage_cap: 1.5,
            ..Default::default()
        };
        let result = AllocationOrchestrator::new(snapshot(10), CostParameters::default(), policy);
        assert!(result.is_err());
    }

    #[test]
    fn test_prepare_grid_clips_to_horizon() {
        let orchestrator =
            AllocationOrchestrator::new(snapshot(100), CostParameters::default(), AllocationPolicy::default())
                .unwrap();
        let config = TimingGridConfig::default();
        let full = orchestrator.prepare_grid(Some(&config), &FixedTiming::default(), false).unwrap();
        let clipped = orchestrator.prepare_grid(Some(&config), &FixedTiming::default(), true).unwrap();
        assert_eq!(full.len(), 1225);
        assert!(clipped.len() < full.len());
        assert!(clipped.iter().all(|c| c.latest_tau2() <= 99));
    }

    #[tokio::test]
    async fn test_run_fixed_timing() {
        let orchestrator =
            AllocationOrchestrator::new(snapshot(120), CostParameters::default(), AllocationPolicy::default())
                .unwrap()
                .with_options(EvaluatorOptions {
                    workers: 1,
                    ..Default::default()
                });
        let grid = orchestrator.prepare_grid(None, &FixedTiming::default(), false).unwrap();
        let outcome = orchestrator.run(ObjectiveWeights::balanced(), &grid).await.unwrap();
        assert_eq!(outcome.summary.total, 1);
        assert_eq!(outcome.best.candidate, FixedTiming::default().candidate());
    }
}
