// ==========================================
// 疫苗分配优化系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 所有导入错误均为致命错误，在任何候选评估之前中止
// ==========================================

use crate::domain::error::SnapshotError;
use thiserror::Error;

/// 疫情数据格式错误
#[derive(Error, Debug)]
pub enum DataFormatError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 列/字段错误 =====
    #[error("缺少必需的列: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("非数值 (行 {row}, 列 {column}): {value:?}")]
    NonNumeric {
        row: usize,
        column: String,
        value: String,
    },

    #[error("数值无效 (行 {row}, 列 {column}): {value}（必须为有限的非负数）")]
    InvalidValue { row: usize, column: String, value: f64 },

    #[error("Time 列必须严格递增 (行 {row}): {previous} -> {current}")]
    NonIncreasingTime {
        row: usize,
        previous: f64,
        current: f64,
    },

    #[error("疫情数据为空")]
    EmptyData,
}

impl From<std::io::Error> for DataFormatError {
    fn from(err: std::io::Error) -> Self {
        DataFormatError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for DataFormatError {
    fn from(err: csv::Error) -> Self {
        DataFormatError::CsvParseError(err.to_string())
    }
}

impl From<calamine::Error> for DataFormatError {
    fn from(err: calamine::Error) -> Self {
        DataFormatError::ExcelParseError(err.to_string())
    }
}

impl From<SnapshotError> for DataFormatError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::EmptyData => DataFormatError::EmptyData,
            SnapshotError::InvalidValue { row, column, value } => DataFormatError::InvalidValue { row, column, value },
            SnapshotError::NonIncreasingTime { row, previous, current } => {
                DataFormatError::NonIncreasingTime { row, previous, current }
            }
        }
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, DataFormatError>;
