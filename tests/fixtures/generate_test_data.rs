// ==========================================
// 测试数据生成器
// ==========================================
// 用途: 生成疫情轨迹测试数据集 CSV 文件
// 输出: tests/fixtures/datasets/*.csv
// 模型: 两组离散时间 SIQR（不含接种流），保证各组总人口守恒
// ==========================================

use chrono::Local;
use csv::Writer;
use std::error::Error;
use std::fs::{self, File};

// CSV 表头（与导入层必需列一致）
const CSV_HEADER: &[&str] = &[
    "Time", "S1", "I1", "Q1", "V11", "V21", "R1", "S2", "I2", "Q2", "V12", "V22", "R2",
];

const OUTPUT_DIR: &str = "tests/fixtures/datasets";

// 单组传播参数
#[derive(Clone, Copy)]
struct GroupParams {
    population: f64,
    initial_infected: f64,
    beta: f64,
    gamma: f64,
    quarantine_rate: f64,
    release_rate: f64,
}

// 单组当日仓室
#[derive(Clone, Copy)]
struct GroupState {
    s: f64,
    i: f64,
    q: f64,
    r: f64,
}

impl GroupState {
    fn initial(params: &GroupParams) -> Self {
        Self {
            s: params.population - params.initial_infected,
            i: params.initial_infected,
            q: 0.0,
            r: 0.0,
        }
    }

    fn step(&self, params: &GroupParams) -> Self {
        let infections = (params.beta * self.s * self.i / params.population).min(self.s);
        let recoveries = params.gamma * self.i;
        let quarantined = params.quarantine_rate * self.i;
        let released = params.release_rate * self.q;
        Self {
            s: self.s - infections,
            i: self.i + infections - recoveries - quarantined,
            q: self.q + quarantined - released,
            r: self.r + recoveries + released,
        }
    }

    fn cells(&self) -> [String; 6] {
        [
            format!("{:.4}", self.s),
            format!("{:.4}", self.i),
            format!("{:.4}", self.q),
            "0".to_string(),
            "0".to_string(),
            format!("{:.4}", self.r),
        ]
    }
}

fn simulate(days: usize, groups: [GroupParams; 2]) -> Vec<Vec<String>> {
    let mut state = [GroupState::initial(&groups[0]), GroupState::initial(&groups[1])];
    let mut rows = Vec::with_capacity(days);
    for day in 0..days {
        let mut row = vec![day.to_string()];
        row.extend(state[0].cells());
        row.extend(state[1].cells());
        rows.push(row);
        state = [state[0].step(&groups[0]), state[1].step(&groups[1])];
    }
    rows
}

fn baseline_groups() -> [GroupParams; 2] {
    [
        GroupParams {
            population: 10_000.0,
            initial_infected: 20.0,
            beta: 0.25,
            gamma: 0.08,
            quarantine_rate: 0.03,
            release_rate: 0.1,
        },
        GroupParams {
            population: 20_000.0,
            initial_infected: 40.0,
            beta: 0.3,
            gamma: 0.1,
            quarantine_rate: 0.05,
            release_rate: 0.1,
        },
    ]
}

fn write_rows(name: &str, header: &[&str], rows: &[Vec<String>]) -> Result<(), Box<dyn Error>> {
    let path = format!("{}/{}", OUTPUT_DIR, name);
    let file = File::create(&path)?;
    let mut wtr = Writer::from_writer(file);
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    println!("✓ 生成 {} ({}行)", name, rows.len());
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    println!("==========================================");
    println!("疫情轨迹测试数据生成器");
    println!("生成时间: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("==========================================");

    fs::create_dir_all(OUTPUT_DIR)?;

    generate_baseline()?;
    generate_short_horizon()?;
    generate_fast_outbreak()?;
    generate_missing_column()?;
    generate_invalid_values()?;

    println!("全部数据集已生成: {}", OUTPUT_DIR);
    Ok(())
}

// 200 天基准轨迹（默认网格全部落在数据范围内）
fn generate_baseline() -> Result<(), Box<dyn Error>> {
    write_rows("01_baseline.csv", CSV_HEADER, &simulate(200, baseline_groups()))
}

// 90 天短轨迹（默认网格的大部分候选超出范围）
fn generate_short_horizon() -> Result<(), Box<dyn Error>> {
    write_rows("02_short_horizon.csv", CSV_HEADER, &simulate(90, baseline_groups()))
}

// 快速暴发：τ1 时易感人群已大量耗尽
fn generate_fast_outbreak() -> Result<(), Box<dyn Error>> {
    let mut groups = baseline_groups();
    for g in groups.iter_mut() {
        g.beta = 0.9;
        g.initial_infected *= 10.0;
    }
    write_rows("03_fast_outbreak.csv", CSV_HEADER, &simulate(200, groups))
}

// 缺少 Q2 列
fn generate_missing_column() -> Result<(), Box<dyn Error>> {
    let header: Vec<&str> = CSV_HEADER.iter().copied().filter(|c| *c != "Q2").collect();
    let rows: Vec<Vec<String>> = simulate(30, baseline_groups())
        .into_iter()
        .map(|mut row| {
            row.remove(9);
            row
        })
        .collect();
    write_rows("04_missing_column.csv", &header, &rows)
}

// 第 5 行 I1 为非数值
fn generate_invalid_values() -> Result<(), Box<dyn Error>> {
    let mut rows = simulate(30, baseline_groups());
    rows[3][2] = "N/A".to_string();
    write_rows("05_invalid_values.csv", CSV_HEADER, &rows)
}
