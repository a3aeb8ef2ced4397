// ==========================================
// 疫苗分配优化系统 - JSON 配置文件读取
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// 读取并解析 JSON 文件；文件不存在返回 None
pub fn read_optional<T: DeserializeOwned>(path: &Path) -> ConfigResult<Option<T>> {
    let path_text = path.display().to_string();
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "配置文件不存在");
            return Ok(None);
        }
        Err(source) => return Err(ConfigError::Io { path: path_text, source }),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| ConfigError::Json { path: path_text, source })
}
