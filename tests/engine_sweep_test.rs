// ==========================================
// 引擎扫描集成测试
// ==========================================
// 职责: 验证 模型构建 -> 求解 -> 择优 的完整链路
// 场景: 固定时机求解 / 无可行解 / 易感耗尽 / 剂次顺序 / 产能单调性 / 并行一致性 / 取消 / 求解错误
// ==========================================


use std::sync::Arc;
use test_helpers::*;
use vaccine_allocation::domain::{
    Allocation, AllocationPolicy, CostParameters, EpidemicSnapshot, GroupId, ObjectiveWeights, SolveStatus,
    TimingGridConfig,
};
use vaccine_allocation::engine::{
    AllocationModel, AllocationModelBuilder, AllocationOrchestrator, CancellationToken, CandidateEvaluator,
    CandidateRecord, CostModel, EngineError, EvaluatorOptions, InvalidParameterError, SolveOutcome, SolverAdapter,
    SolverError, SweepProgress, TimingGrid, TimingGridEnumerator,
};

// ==========================================
// 测试辅助函数
// ==========================================

fn evaluator(
    snapshot: Arc<EpidemicSnapshot>,
    parameters: CostParameters,
    weights: ObjectiveWeights,
    options: EvaluatorOptions,
) -> CandidateEvaluator {
    let cost_model = CostModel::new(parameters, weights).unwrap();
    CandidateEvaluator::new(snapshot, Arc::new(cost_model), Arc::new(AllocationPolicy::default())).with_options(options)
}

fn single_grid(tau1: u32, gap: u32) -> TimingGrid {
    let candidate = uniform_candidate(0, tau1, gap);
    TimingGridEnumerator::enumerate(&TimingGridConfig::single(candidate.groups)).unwrap()
}

/// 36 个候选: τ1 ∈ {10,17}×{10,17}, gap ∈ {14,21,28}×{14,21,28}
fn small_search_grid() -> TimingGrid {
    let config = TimingGridConfig {
        tau1_group1_min: 10,
        tau1_group1_max: 20,
        tau1_group2_min: 10,
        tau1_group2_max: 20,
        gap_group1_min: 14,
        gap_group1_max: 28,
        gap_group2_min: 14,
        gap_group2_max: 28,
        time_step: 7,
    };
    TimingGridEnumerator::enumerate(&config).unwrap()
}

/// 产能充足的成本参数（衰减快照下最低覆盖率约需 3400 剂）
fn roomy_parameters(capacity: f64) -> CostParameters {
    CostParameters::default().with_capacity(capacity)
}

/// 所有覆盖率与产量均取 0；index 为奇数时返回数值失败
struct ZeroSolver {
    fail_odd: bool,
}

impl SolverAdapter for ZeroSolver {
    fn name(&self) -> &'static str {
        "zero"
    }

    fn solve(&self, model: &AllocationModel) -> SolveOutcome {
        if self.fail_odd && model.candidate.index % 2 == 1 {
            return SolveOutcome::failed(SolverError::Numerical("stub failure".to_string()));
        }
        let allocation = Allocation {
            dose1_coverage: [0.0; 2],
            dose2_coverage: [0.0; 2],
            production_units: vec![0.0; model.num_producers],
        };
        let objective = model.objective.evaluate(&allocation);
        SolveOutcome::optimal(allocation, objective)
    }
}

/// 总是失败的求解器
struct FailingSolver;

impl SolverAdapter for FailingSolver {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn solve(&self, _model: &AllocationModel) -> SolveOutcome {
        SolveOutcome::failed(SolverError::Timeout { timeout_ms: 1 })
    }
}

/// 完成 `after` 个候选后触发取消
struct CancelAfter {
    token: CancellationToken,
    after: usize,
}

impl SweepProgress for CancelAfter {
    fn on_candidate(&self, _record: &CandidateRecord, done: usize, _total: usize) {
        if done >= self.after {
            self.token.cancel();
        }
    }
}

// ==========================================
// 固定时机求解
// ==========================================

#[test]
fn test_fixed_timing_respects_floors_and_supply() {
    let snapshot = flat_snapshot(60);
    let parameters = CostParameters::default();
    let policy = AllocationPolicy::default();
    let evaluator = evaluator(
        Arc::clone(&snapshot),
        parameters.clone(),
        ObjectiveWeights::balanced(),
        options(1),
    );

    let outcome = evaluator.evaluate(&single_grid(10, 14)).unwrap();
    let best = &outcome.best;
    assert_eq!(best.status, SolveStatus::Optimal);
    assert_eq!(outcome.summary.total, 1);
    assert_eq!(outcome.summary.optimal, 1);

    // 最低覆盖率
    for group in GroupId::ALL {
        assert!(best.allocation.u1(group) >= policy.dose1_floor(group) - 1e-6);
        assert!(best.allocation.u2(group) >= policy.dose2_floor(group) - 1e-6);
        assert!(best.allocation.u1(group) <= policy.coverage_cap + 1e-6);
    }

    // 剂量不超过产量，产量不超过产能
    let production = best.allocation.total_production();
    assert!(best.doses.total() <= production + 1e-4);
    assert!(production <= parameters.production_capacity + 1e-4);

    // 目标值 = 各分量加权和
    let cost_model = CostModel::new(parameters.clone(), ObjectiveWeights::balanced()).unwrap();
    assert!(approx_eq(best.objective, cost_model.weighted(&best.breakdown), 1e-9));

    // 解满足模型全部约束
    let model = AllocationModelBuilder::new(&snapshot, &cost_model, &policy)
        .build(&best.candidate)
        .unwrap();
    assert!(model.violations(&best.allocation, 1e-5).is_empty());
}

#[test]
fn test_fixed_timing_stays_at_floors_when_doses_are_expensive() {
    // 均衡权重下剂量边际成本远高于边际收益，覆盖率停在下限
    // 剂量 = (0.15 + 0.10 + 0.10 + 0.05)·1000 = 400
    let evaluator = evaluator(
        flat_snapshot(60),
        CostParameters::default(),
        ObjectiveWeights::balanced(),
        options(1),
    );
    let best = evaluator.evaluate(&single_grid(10, 14)).unwrap().best;

    assert!((best.allocation.u1(GroupId::Group1) - 0.15).abs() < 1e-6);
    assert!((best.allocation.u1(GroupId::Group2) - 0.10).abs() < 1e-6);
    assert!((best.doses.total() - 400.0).abs() < 1e-4);
    assert!((best.allocation.total_production() - best.doses.total()).abs() < 1e-4);
}

#[test]
fn test_capacity_below_floor_doses_has_no_feasible_solution() {
    let evaluator = evaluator(
        flat_snapshot(60),
        CostParameters::default().with_capacity(100.0),
        ObjectiveWeights::balanced(),
        options(1),
    );
    match evaluator.evaluate(&single_grid(10, 14)) {
        Err(EngineError::NoFeasibleSolution(e)) => {
            assert_eq!(e.summary.total, 1);
            assert_eq!(e.summary.infeasible, 1);
            assert!(!e.summary.cancelled);
        }
        other => panic!("unexpected: {:?}", other.map(|o| o.best.candidate)),
    }
}

#[test]
fn test_depleted_susceptible_drives_dose1_coverage_to_cap() {
    // S1(τ1)=1：第一剂几乎零成本，感染人日收益使 U1_1 取上限
    let evaluator = evaluator(
        depleted_group1_snapshot(60),
        CostParameters::default(),
        ObjectiveWeights::balanced(),
        options(1),
    );
    let best = evaluator.evaluate(&single_grid(10, 14)).unwrap().best;

    assert!(best.allocation.u1(GroupId::Group1) > 0.999);
    assert!((best.allocation.u1(GroupId::Group2) - 0.10).abs() < 1e-6);
    assert!((best.doses.dose1[0] - best.allocation.u1(GroupId::Group1)).abs() < 1e-6);
    for group in GroupId::ALL {
        let i = group.index();
        assert!(best.doses.dose2[i] <= best.doses.dose1[i] + 1e-9);
    }
}

#[test]
fn test_late_dose1_on_decaying_epidemic_reaches_full_coverage() {
    // τ1 ≥ 30 时 S(τ1) 已接近耗尽，第一剂覆盖率趋于 100%
    for (tau1, gap) in [(30, 45), (35, 45)] {
        let evaluator = evaluator(
            siqr_decay_snapshot(120),
            CostParameters::default(),
            ObjectiveWeights::balanced(),
            options(1),
        );
        let best = evaluator.evaluate(&single_grid(tau1, gap)).unwrap().best;

        for group in GroupId::ALL {
            assert!(
                best.allocation.u1(group) > 0.999,
                "τ1={} {} U1={}",
                tau1,
                group,
                best.allocation.u1(group)
            );
            assert!(best.doses.dose2[group.index()] <= best.doses.dose1[group.index()] + 1e-9);
        }
    }
}

// ==========================================
// 剂次顺序
// ==========================================

#[test]
fn test_second_doses_drawn_from_first_dose_recipients() {
    // 快照中没有任何已接种者，第二剂仍需占用产能
    let snapshot = unvaccinated_snapshot(60);
    let best = evaluator(
        Arc::clone(&snapshot),
        CostParameters::default(),
        ObjectiveWeights::balanced(),
        options(1),
    )
    .evaluate(&single_grid(10, 14))
    .unwrap()
    .best;

    assert!((best.doses.dose2[0] - 100.0).abs() < 1e-4);
    assert!((best.doses.dose2[1] - 50.0).abs() < 1e-4);
    for group in GroupId::ALL {
        let i = group.index();
        assert!(best.doses.dose2[i] <= best.doses.dose1[i] + 1e-9);
        assert!(best.allocation.u2(group) <= best.allocation.u1(group) + 1e-9);
    }
    assert!((best.allocation.total_production() - 400.0).abs() < 1e-4);

    // 第二剂供应成本 = CV2 · 第二剂剂量
    let cost_model = CostModel::new(CostParameters::default(), ObjectiveWeights::balanced()).unwrap();
    let mut without_dose2 = best.allocation.clone();
    without_dose2.dose2_coverage = [0.0; 2];
    let terms = AllocationModelBuilder::new(&snapshot, &cost_model, &AllocationPolicy::default())
        .build(&best.candidate)
        .unwrap()
        .terms;
    let dose2_supply = best.breakdown.supply - cost_model.evaluate_components(&without_dose2, &terms).supply;
    assert!((dose2_supply - 150.0 * cost_model.parameters().dose2_fixed_cost).abs() < 1e-6);

    // 产能只够第一剂下限（250）时整体不可行
    let tight = evaluator(
        unvaccinated_snapshot(60),
        CostParameters::default().with_capacity(300.0),
        ObjectiveWeights::balanced(),
        options(1),
    );
    assert!(matches!(
        tight.evaluate(&single_grid(10, 14)),
        Err(EngineError::NoFeasibleSolution(_))
    ));
}

// ==========================================
// 候选拒绝
// ==========================================

#[test]
fn test_short_interval_candidates_rejected_but_sweep_continues() {
    let config = TimingGridConfig {
        tau1_group1_min: 10,
        tau1_group1_max: 10,
        tau1_group2_min: 10,
        tau1_group2_max: 10,
        gap_group1_min: 7,
        gap_group1_max: 14,
        gap_group2_min: 7,
        gap_group2_max: 14,
        time_step: 7,
    };
    let grid = TimingGridEnumerator::enumerate(&config).unwrap();
    assert_eq!(grid.len(), 4);

    let mut opts = options(1);
    opts.record_trace = true;
    let evaluator = evaluator(flat_snapshot(60), CostParameters::default(), ObjectiveWeights::balanced(), opts);
    let outcome = evaluator.evaluate(&grid).unwrap();

    assert_eq!(outcome.summary.rejected, 3);
    assert_eq!(outcome.summary.optimal, 1);
    assert_eq!(outcome.best.candidate.gap(GroupId::Group1), 14);
    assert_eq!(outcome.best.candidate.gap(GroupId::Group2), 14);
    assert_eq!(outcome.summary.trace.len(), 4);
    assert!(outcome
        .summary
        .trace
        .windows(2)
        .all(|w| w[0].candidate.index < w[1].candidate.index));
}

#[test]
fn test_candidates_beyond_horizon_rejected() {
    let config = TimingGridConfig {
        tau1_group1_min: 10,
        tau1_group1_max: 10,
        tau1_group2_min: 10,
        tau1_group2_max: 10,
        gap_group1_min: 14,
        gap_group1_max: 28,
        gap_group2_min: 14,
        gap_group2_max: 14,
        time_step: 14,
    };
    let grid = TimingGridEnumerator::enumerate(&config).unwrap();
    let evaluator = evaluator(flat_snapshot(30), CostParameters::default(), ObjectiveWeights::balanced(), options(1));
    let outcome = evaluator.evaluate(&grid).unwrap();

    // τ2 = 38 > 最后一天 29
    assert_eq!(outcome.summary.rejected, 1);
    assert_eq!(outcome.best.candidate.tau2(GroupId::Group1), 24);

    // 裁剪后该候选不再出现
    let clipped = grid.with_horizon(29);
    assert_eq!(clipped.len(), 1);
}

// ==========================================
// 性质测试
// ==========================================

#[test]
fn test_raising_capacity_never_worsens_best_objective() {
    let grid = small_search_grid();
    let mut previous = f64::INFINITY;
    for capacity in [5_000.0, 10_000.0, 50_000.0] {
        let evaluator = evaluator(
            decaying_snapshot(200),
            roomy_parameters(capacity),
            ObjectiveWeights::balanced(),
            options(1),
        );
        let best = evaluator.evaluate(&grid).unwrap().best;
        assert!(
            best.objective <= previous + 1e-9,
            "capacity {} gave {} > {}",
            capacity,
            best.objective,
            previous
        );
        previous = best.objective;
    }
}

#[test]
fn test_raising_capacity_never_lowers_best_coverage() {
    // 社会成本主导时每一剂都划算，最优方案用满产能直至全部覆盖（4000 剂）
    // 下限剂量 400：350 不可行，420 刚好可行
    let grid = small_search_grid();
    let weights = ObjectiveWeights::new("infection_focus", 0.01, 0.98, 0.01).unwrap();

    let below = evaluator(
        high_infection_snapshot(120),
        roomy_parameters(350.0),
        weights.clone(),
        options(1),
    );
    assert!(matches!(below.evaluate(&grid), Err(EngineError::NoFeasibleSolution(_))));

    let mut previous = f64::NEG_INFINITY;
    for capacity in [420.0, 1_000.0, 2_500.0, 4_000.0, 8_000.0] {
        let best = evaluator(
            high_infection_snapshot(120),
            roomy_parameters(capacity),
            weights.clone(),
            options(1),
        )
        .evaluate(&grid)
        .unwrap()
        .best;

        let coverage = best.allocation.total_coverage();
        assert!(
            coverage >= previous - 1e-9,
            "capacity {} gave coverage {} < {}",
            capacity,
            coverage,
            previous
        );
        let expected = f64::min(capacity, 4_000.0) / 1_000.0;
        assert!(approx_eq(coverage, expected, 1e-6), "capacity {} coverage {}", capacity, coverage);
        previous = coverage;
    }
}

#[test]
fn test_repeated_sweeps_are_identical() {
    let grid = small_search_grid();
    let run = || {
        evaluator(
            decaying_snapshot(200),
            roomy_parameters(20_000.0),
            ObjectiveWeights::balanced(),
            options(1),
        )
        .evaluate(&grid)
        .unwrap()
    };
    let a = run();
    let b = run();
    assert_eq!(a.best.candidate, b.best.candidate);
    assert_eq!(a.best.objective, b.best.objective);
    assert_eq!(a.best.allocation, b.best.allocation);
    assert_eq!(a.summary.optimal, b.summary.optimal);
}

#[test]
fn test_grid_enumeration_is_deterministic() {
    let a = small_search_grid().to_vec();
    let b = small_search_grid().to_vec();
    assert_eq!(a.len(), 36);
    assert_eq!(a, b);
    assert!(a.iter().enumerate().all(|(i, c)| c.index == i));
}

#[tokio::test]
async fn test_parallel_sweep_matches_sequential() {
    let grid = small_search_grid();
    let sequential = evaluator(
        decaying_snapshot(200),
        roomy_parameters(20_000.0),
        ObjectiveWeights::balanced(),
        options(1),
    )
    .evaluate(&grid)
    .unwrap();
    let parallel = evaluator(
        decaying_snapshot(200),
        roomy_parameters(20_000.0),
        ObjectiveWeights::balanced(),
        options(4),
    )
    .evaluate_parallel(&grid)
    .await
    .unwrap();

    assert_eq!(parallel.best.candidate, sequential.best.candidate);
    assert!(approx_eq(parallel.best.objective, sequential.best.objective, 1e-12));
    assert_eq!(parallel.summary.evaluated, sequential.summary.evaluated);
    assert_eq!(parallel.summary.optimal, sequential.summary.optimal);
    assert!(!parallel.summary.cancelled);
}

#[tokio::test]
async fn test_parallel_tie_goes_to_lowest_index() {
    // 覆盖率为 0 时各候选目标值相同（常数快照下窗口之和与时机无关）
    let evaluator = evaluator(flat_snapshot(120), CostParameters::default(), ObjectiveWeights::balanced(), options(4))
        .with_solver(Arc::new(ZeroSolver { fail_odd: false }));
    let outcome = evaluator.evaluate_parallel(&small_search_grid()).await.unwrap();
    assert_eq!(outcome.summary.optimal, 36);
    assert_eq!(outcome.best.candidate.index, 0);
}

// ==========================================
// 权重校验
// ==========================================

#[test]
fn test_unnormalized_weights_rejected_before_sweep() {
    let weights = ObjectiveWeights {
        name: "bad".to_string(),
        w1: 0.5,
        w2: 0.5,
        w3: 0.5,
    };
    assert!(matches!(
        CostModel::new(CostParameters::default(), weights.clone()),
        Err(InvalidParameterError::WeightsNotNormalized { .. })
    ));

    let orchestrator =
        AllocationOrchestrator::new(flat_snapshot(60), CostParameters::default(), AllocationPolicy::default())
            .unwrap();
    assert!(matches!(
        orchestrator.evaluator(weights),
        Err(InvalidParameterError::WeightsNotNormalized { .. })
    ));
}

#[tokio::test]
async fn test_compare_keeps_infeasible_weight_sets() {
    let orchestrator = AllocationOrchestrator::new(
        flat_snapshot(120),
        CostParameters::default().with_capacity(100.0),
        AllocationPolicy::default(),
    )
    .unwrap()
    .with_options(options(1));
    let grid = orchestrator
        .prepare_grid(None, &Default::default(), false)
        .unwrap();

    let runs = orchestrator.compare(&ObjectiveWeights::presets(), &grid).await.unwrap();
    assert_eq!(runs.len(), 4);
    assert!(runs.iter().all(|r| !r.is_feasible()));
}

#[tokio::test]
async fn test_compare_presets_on_fixed_timing() {
    let orchestrator =
        AllocationOrchestrator::new(flat_snapshot(120), CostParameters::default(), AllocationPolicy::default())
            .unwrap()
            .with_options(options(2));
    let grid = orchestrator
        .prepare_grid(None, &Default::default(), false)
        .unwrap();

    let runs = orchestrator.compare(&ObjectiveWeights::presets(), &grid).await.unwrap();
    assert_eq!(runs.len(), 4);
    for run in &runs {
        let outcome = run.result.as_ref().unwrap();
        assert_eq!(outcome.summary.total, 1);
    }
}

// ==========================================
// 取消与求解错误
// ==========================================

#[test]
fn test_cancellation_keeps_best_so_far() {
    let token = CancellationToken::new();
    let evaluator = evaluator(flat_snapshot(120), CostParameters::default(), ObjectiveWeights::balanced(), options(1))
        .with_cancellation(token.clone())
        .with_progress(Arc::new(CancelAfter { token, after: 3 }));

    let outcome = evaluator.evaluate(&small_search_grid()).unwrap();
    assert!(outcome.summary.cancelled);
    assert_eq!(outcome.summary.evaluated, 3);
    assert!(outcome.best.candidate.index < 3);
}

#[tokio::test]
async fn test_cancelled_before_start_reports_no_solution() {
    let token = CancellationToken::new();
    token.cancel();
    let evaluator = evaluator(flat_snapshot(120), CostParameters::default(), ObjectiveWeights::balanced(), options(4))
        .with_cancellation(token);

    match evaluator.evaluate_parallel(&small_search_grid()).await {
        Err(EngineError::NoFeasibleSolution(e)) => {
            assert!(e.summary.cancelled);
            assert_eq!(e.summary.evaluated, 0);
            assert_eq!(e.summary.total, 36);
        }
        other => panic!("unexpected: {:?}", other.map(|o| o.summary)),
    }
}

#[test]
fn test_solver_errors_are_skipped() {
    let evaluator = evaluator(flat_snapshot(120), CostParameters::default(), ObjectiveWeights::balanced(), options(1))
        .with_solver(Arc::new(ZeroSolver { fail_odd: true }));
    let outcome = evaluator.evaluate(&small_search_grid()).unwrap();

    assert_eq!(outcome.summary.solver_errors, 18);
    assert_eq!(outcome.summary.optimal, 18);
    assert_eq!(outcome.best.candidate.index, 0);
}

#[test]
fn test_solver_error_budget_stops_sweep() {
    let mut opts = options(1);
    opts.max_solver_errors = Some(2);
    let evaluator = evaluator(flat_snapshot(120), CostParameters::default(), ObjectiveWeights::balanced(), opts)
        .with_solver(Arc::new(FailingSolver));

    match evaluator.evaluate(&small_search_grid()) {
        Err(EngineError::NoFeasibleSolution(e)) => {
            assert_eq!(e.summary.solver_errors, 2);
            assert_eq!(e.summary.evaluated, 2);
            assert!(e.summary.cancelled);
        }
        other => panic!("unexpected: {:?}", other.map(|o| o.summary)),
    }
}
