// ==========================================
// 疫苗分配优化系统 - 优化 API
// ==========================================
// 职责: 加载数据 -> 生成候选 -> 扫描选优 -> 报告导出
// 说明: 外层（CLI / 调用方）只与本 API 交互，引擎层不感知文件与交互
// ==========================================

use crate::api::error::ApiResult;
use crate::config::run_config::RunConfig;
use crate::domain::cost::ObjectiveWeights;
use crate::domain::epidemic::EpidemicSnapshot;
use crate::engine::evaluator::CancellationToken;
use crate::engine::events::{NoOpProgress, SweepProgress};
use crate::engine::orchestrator::AllocationOrchestrator;
use crate::engine::timing_grid::TimingGrid;
use crate::importer::epidemic_loader::EpidemicSnapshotStore;
use crate::perf::PerfGuard;
use crate::report::summary::{ComparisonReport, OptimizationReport};
use crate::report::writer::ReportWriter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// 一次完整运行的产出
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    pub report: OptimizationReport,
    pub comparison: Option<ComparisonReport>,
    /// 已导出的文件
    pub written: Vec<PathBuf>,
}

// ==========================================
// OptimizationApi
// ==========================================
pub struct OptimizationApi {
    config: RunConfig,
    progress: Arc<dyn SweepProgress>,
    cancellation: CancellationToken,
}

impl OptimizationApi {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            progress: Arc::new(NoOpProgress),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn SweepProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// 取消令牌（可交给 Ctrl-C 处理器）
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// 从配置中的数据文件加载快照
    pub fn load_snapshot(&self) -> ApiResult<Arc<EpidemicSnapshot>> {
        Ok(Arc::new(EpidemicSnapshotStore::load(&self.config.data_path)?))
    }

    fn orchestrator(&self, snapshot: Arc<EpidemicSnapshot>) -> ApiResult<AllocationOrchestrator> {
        Ok(AllocationOrchestrator::new(
            snapshot,
            self.config.cost_parameters.clone(),
            self.config.policy.clone(),
        )?
        .with_options(self.config.evaluator.clone())
        .with_progress(Arc::clone(&self.progress))
        .with_cancellation(self.cancellation.clone()))
    }

    fn grid(&self, orchestrator: &AllocationOrchestrator) -> ApiResult<TimingGrid> {
        Ok(orchestrator.prepare_grid(
            self.config.timing_grid.as_ref(),
            &self.config.fixed_timing,
            self.config.clip_to_horizon,
        )?)
    }

    /// 主权重下的最优解
    #[instrument(skip_all, fields(weights = %self.config.weights.name))]
    pub async fn optimize(&self, snapshot: Arc<EpidemicSnapshot>) -> ApiResult<OptimizationReport> {
        let _perf = PerfGuard::new("optimize");
        let orchestrator = self.orchestrator(Arc::clone(&snapshot))?;
        let grid = self.grid(&orchestrator)?;
        let outcome = orchestrator.run(self.config.weights.clone(), &grid).await?;
        Ok(OptimizationReport::build(
            &outcome,
            &self.config.weights,
            &self.config.cost_parameters,
            &snapshot,
            self.config.search_enabled(),
        ))
    }

    /// 多权重对比
    #[instrument(skip_all, fields(count = weight_sets.len()))]
    pub async fn compare_weights(
        &self,
        snapshot: Arc<EpidemicSnapshot>,
        weight_sets: &[ObjectiveWeights],
    ) -> ApiResult<ComparisonReport> {
        let _perf = PerfGuard::new("compare_weights");
        let orchestrator = self.orchestrator(Arc::clone(&snapshot))?;
        let grid = self.grid(&orchestrator)?;
        let runs = orchestrator.compare(weight_sets, &grid).await?;
        Ok(ComparisonReport::build(&runs, &self.config.cost_parameters, &snapshot))
    }

    /// 完整运行：加载、优化、（可选）对比、（可选）导出
    pub async fn run(&self) -> ApiResult<RunArtifacts> {
        let snapshot = self.load_snapshot()?;
        let report = self.optimize(Arc::clone(&snapshot)).await?;

        let comparison = match &self.config.comparison_weights {
            Some(sets) if !sets.is_empty() => Some(self.compare_weights(Arc::clone(&snapshot), sets).await?),
            _ => None,
        };

        let mut written = Vec::new();
        if let Some(dir) = &self.config.output_dir {
            let writer = ReportWriter::new(dir);
            written.push(writer.write_results(&report)?);
            if let Some(comparison) = &comparison {
                written.push(writer.write_comparison(comparison)?);
            }
        }

        info!(
            run_id = %report.run_id,
            objective = report.optimal_cost,
            files = written.len(),
            "运行完成"
        );
        Ok(RunArtifacts {
            report,
            comparison,
            written,
        })
    }
}

