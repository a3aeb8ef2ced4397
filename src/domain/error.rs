// ==========================================
// 疫苗分配优化系统 - 领域层校验错误
// ==========================================
// 工具: thiserror 派生宏
// 分类:
// - InvalidParameterError: 参数/权重/时机网格/策略校验失败
// - SnapshotError: 疫情快照行数据校验失败
// 红线: 领域层不依赖导入层、引擎层；外层通过重导出或 From 转换使用
// ==========================================

use thiserror::Error;

/// 参数校验错误：必须指明字段与违反的界限
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidParameterError {
    #[error("参数不是有限值: {field}={value}")]
    NotFinite { field: String, value: f64 },

    #[error("参数不能为负: {field}={value}")]
    Negative { field: String, value: f64 },

    #[error("参数超出范围: {field}={value} 不在 [{min}, {max}] 内")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("目标权重之和必须为 1 (容差 {tolerance}): w1+w2+w3={sum}")]
    WeightsNotNormalized { sum: f64, tolerance: f64 },

    #[error("区间上下界颠倒: {field} 的 min={min} > max={max}")]
    InvertedBounds { field: String, min: u32, max: u32 },

    #[error("时机网格过大: {size} 个候选，上限 {limit}")]
    GridTooLarge { size: u128, limit: usize },

    #[error("参数缺失: {0}")]
    Missing(String),

    #[error("候选时机无效 ({candidate}): {reason}")]
    InvalidCandidate { candidate: String, reason: String },
}

/// 检查参数有限且非负
pub fn check_non_negative(field: &str, value: f64) -> Result<(), InvalidParameterError> {
    if !value.is_finite() {
        return Err(InvalidParameterError::NotFinite {
            field: field.to_string(),
            value,
        });
    }
    if value < 0.0 {
        return Err(InvalidParameterError::Negative {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

/// 检查参数落在闭区间 [min, max]
pub fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), InvalidParameterError> {
    if !value.is_finite() {
        return Err(InvalidParameterError::NotFinite {
            field: field.to_string(),
            value,
        });
    }
    if value < min || value > max {
        return Err(InvalidParameterError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// 快照行数据错误（行号从 1 开始，不含表头）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    #[error("疫情数据为空")]
    EmptyData,

    #[error("数值无效 (行 {row}, 列 {column}): {value}")]
    InvalidValue { row: usize, column: String, value: f64 },

    #[error("Time 必须严格递增 (行 {row}): {previous} -> {current}")]
    NonIncreasingTime {
        row: usize,
        previous: f64,
        current: f64,
    },
}

impl SnapshotError {
    /// 行号整体平移（导入层加上表头行，使行号与文件一致）
    pub fn with_row_offset(self, offset: usize) -> Self {
        match self {
            SnapshotError::InvalidValue { row, column, value } => SnapshotError::InvalidValue {
                row: row + offset,
                column,
                value,
            },
            SnapshotError::NonIncreasingTime { row, previous, current } => SnapshotError::NonIncreasingTime {
                row: row + offset,
                previous,
                current,
            },
            other => other,
        }
    }
}
