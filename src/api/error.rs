// ==========================================
// 疫苗分配优化系统 - API层错误类型
// ==========================================
// 职责: 汇总各层错误，转换为带操作提示的用户可读错误
// ==========================================

use crate::config::error::ConfigError;
use crate::engine::error::{EngineError, InvalidParameterError, NoFeasibleSolutionError};
use crate::importer::error::DataFormatError;
use crate::report::writer::ReportError;
use thiserror::Error;

/// API层错误类型
/// 所有错误信息必须指明失败原因（字段 / 界限 / 文件位置）
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 扫描开始前的致命错误
    // ==========================================
    #[error("疫情数据格式错误: {0}")]
    DataFormat(#[from] DataFormatError),

    #[error("参数校验失败: {0}")]
    InvalidParameter(#[from] InvalidParameterError),

    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    // ==========================================
    // 扫描终止性失败
    // ==========================================
    #[error(transparent)]
    NoFeasibleSolution(#[from] NoFeasibleSolutionError),

    // ==========================================
    // 输出错误
    // ==========================================
    #[error(transparent)]
    Report(#[from] ReportError),
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidParameter(e) => ApiError::InvalidParameter(e),
            EngineError::NoFeasibleSolution(e) => ApiError::NoFeasibleSolution(e),
        }
    }
}

impl ApiError {
    /// 面向操作人员的处理建议
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ApiError::DataFormat(DataFormatError::MissingColumns(_)) => {
                Some("疫情数据需包含 Time, S1, I1, Q1, V11, V21, R1, S2, I2, Q2, V12, V22, R2 列")
            }
            ApiError::DataFormat(_) => Some("检查疫情数据文件：数值列不能为空或非数字，Time 必须严格递增"),
            ApiError::InvalidParameter(InvalidParameterError::WeightsNotNormalized { .. }) => {
                Some("目标权重 w1+w2+w3 必须等于 1")
            }
            ApiError::InvalidParameter(_) | ApiError::Config(_) => Some("检查配置文件中对应字段的取值范围"),
            ApiError::NoFeasibleSolution(e) => Some(e.hint()),
            ApiError::Report(_) => Some("检查输出目录是否存在且可写"),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
