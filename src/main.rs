// ==========================================
// 疫苗分配优化系统 - 命令行入口
// ==========================================
// 子命令:
// - optimize: 加载疫情数据，搜索接种时机并优化剂量分配
// - template: 生成配置文件模板
// ==========================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vaccine_allocation::config::{save_timing_config, ConfigSources, ModelConfig, RunConfig};
use vaccine_allocation::engine::TracingProgress;
use vaccine_allocation::logging::LogFormat;
use vaccine_allocation::{logging, perf, ObjectiveWeights, OptimizationApi, TimingGridConfig};

#[derive(Parser)]
#[command(name = "vaccine-allocation")]
#[command(version)]
#[command(about = "疫苗分配优化: 接种时机搜索 + 剂量分配线性规划")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 输出 debug 日志
    #[arg(short, long, global = true)]
    verbose: bool,

    /// 以 JSON 行输出日志
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 搜索最优接种时机并优化剂量分配
    Optimize {
        /// 疫情轨迹文件 (.csv / .xlsx / .xls)
        #[arg(short, long)]
        data: PathBuf,

        /// 搜索最优时机（否则使用固定时机）
        #[arg(short, long)]
        search: bool,

        /// 时机网格配置 JSON（配合 --search；文件不存在则关闭搜索）
        #[arg(short, long)]
        timing_config: Option<PathBuf>,

        /// 目标权重 JSON（单个对象或列表）
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// 多权重对比运行（自定义权重 + 内置预设）
        #[arg(long)]
        compare_weights: bool,

        /// 模型参数 JSON（成本参数 + 分配策略）
        #[arg(short, long)]
        model_config: Option<PathBuf>,

        /// 覆盖产能上限 L（剂）
        #[arg(long)]
        capacity: Option<f64>,

        /// 结果 JSON 输出目录
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 并行工作线程数（1 为顺序扫描）
        #[arg(long)]
        workers: Option<usize>,

        /// 单个候选求解超时（毫秒，0 表示不限）
        #[arg(long)]
        solver_timeout_ms: Option<u64>,

        /// 求解错误达到该数量时中止扫描
        #[arg(long)]
        max_solver_errors: Option<usize>,

        /// 扫描总时长上限（秒）
        #[arg(long)]
        deadline_secs: Option<u64>,

        /// 在结果中记录每个候选的评估轨迹
        #[arg(long)]
        trace: bool,

        /// 丢弃 τ2 超出疫情数据范围的候选
        #[arg(long)]
        clip_horizon: bool,
    },

    /// 在目录中生成配置模板
    Template {
        /// 输出目录
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

fn write_templates(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("无法创建目录 {}", dir.display()))?;

    save_timing_config(&dir.join("timing_config.json"), &TimingGridConfig::default())?;

    let weights = serde_json::to_string_pretty(&ObjectiveWeights::presets())?;
    std::fs::write(dir.join("weights.json"), weights).context("写入 weights.json 失败")?;

    let model = serde_json::to_string_pretty(&ModelConfig::default())?;
    std::fs::write(dir.join("model_config.json"), model).context("写入 model_config.json 失败")?;

    println!("配置模板已写入 {}", dir.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = if cli.log_json { LogFormat::Json } else { LogFormat::Text };
    logging::init(if cli.verbose { "debug" } else { "info" }, format);
    perf::install_from_env();

    tracing::info!("{} v{}", vaccine_allocation::APP_NAME, vaccine_allocation::VERSION);

    match cli.command {
        Commands::Template { dir } => write_templates(&dir),
        Commands::Optimize {
            data,
            search,
            timing_config,
            weights,
            compare_weights,
            model_config,
            capacity,
            output,
            workers,
            solver_timeout_ms,
            max_solver_errors,
            deadline_secs,
            trace,
            clip_horizon,
        } => {
            let config = RunConfig::resolve(ConfigSources {
                data_path: data,
                search,
                timing_config_path: timing_config,
                weights_path: weights,
                compare_weights,
                model_config_path: model_config,
                capacity_override: capacity,
                output_dir: output,
                workers,
                solver_timeout_ms,
                max_solver_errors,
                sweep_deadline_secs: deadline_secs,
                record_trace: trace,
                clip_to_horizon: clip_horizon,
            })
            .context("运行配置无效")?;

            let api = OptimizationApi::new(config).with_progress(Arc::new(TracingProgress::default()));

            // Ctrl-C: 停止派发新候选，已有最优解照常输出
            let token = api.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("收到中断信号，正在停止扫描");
                    token.cancel();
                }
            });

            let artifacts = match api.run().await {
                Ok(artifacts) => artifacts,
                Err(e) => {
                    if let Some(hint) = e.hint() {
                        eprintln!("提示: {}", hint);
                    }
                    return Err(e.into());
                }
            };

            print!("{}", artifacts.report.render_console());
            if let Some(comparison) = &artifacts.comparison {
                print!("{}", comparison.render_console());
            }
            for path in &artifacts.written {
                println!("已导出: {}", path.display());
            }
            Ok(())
        }
    }
}
