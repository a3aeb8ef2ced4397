// ==========================================
// 疫苗分配优化系统 - 配置层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::engine::error::InvalidParameterError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("配置文件 JSON 解析失败: {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("配置文件参数无效: {path}: {source}")]
    Invalid {
        path: String,
        #[source]
        source: InvalidParameterError,
    },

    #[error(transparent)]
    InvalidParameter(#[from] InvalidParameterError),

    #[error("配置缺失: {0}")]
    Missing(String),
}

/// Result 类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
