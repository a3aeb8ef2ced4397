// ==========================================
// 疫苗分配优化系统 - 报告导出
// ==========================================
// 输出: <dir>/optimization_results_<时间戳>.json
//       <dir>/weight_comparison_<时间戳>.json
// ==========================================

use crate::report::summary::{ComparisonReport, OptimizationReport};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("报告写入失败: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("报告序列化失败: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn write_results(&self, report: &OptimizationReport) -> Result<PathBuf, ReportError> {
        let name = format!("optimization_results_{}.json", report.generated_at.format("%Y%m%d_%H%M%S"));
        self.write_json(&name, report)
    }

    pub fn write_comparison(&self, report: &ComparisonReport) -> Result<PathBuf, ReportError> {
        let name = format!("weight_comparison_{}.json", report.generated_at.format("%Y%m%d_%H%M%S"));
        self.write_json(&name, report)
    }

    fn write_json<T: Serialize>(&self, file_name: &str, value: &T) -> Result<PathBuf, ReportError> {
        let io_err = |path: &Path| {
            let path = path.display().to_string();
            move |source: std::io::Error| ReportError::Io { path, source }
        };
        fs::create_dir_all(&self.output_dir).map_err(io_err(&self.output_dir))?;

        let path = self.output_dir.join(file_name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).map_err(io_err(&path))?;
        info!(path = %path.display(), "报告已导出");
        Ok(path)
    }
}
