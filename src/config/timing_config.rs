// ==========================================
// 疫苗分配优化系统 - 时机网格配置
// ==========================================
// 文件格式（JSON，缺省键取默认值）:
// {
//   "tau1_group1_min": 30, "tau1_group1_max": 50,
//   "tau1_group2_min": 30, "tau1_group2_max": 50,
//   "gap_group1_min": 45,  "gap_group1_max": 75,
//   "gap_group2_min": 45,  "gap_group2_max": 75,
//   "time_step": 5
// }
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::json_file;
use crate::domain::timing::TimingGridConfig;
use std::path::Path;
use tracing::info;

/// 读取时机网格配置；文件不存在返回 None（不搜索，使用固定时机）
pub fn load_timing_config(path: &Path) -> ConfigResult<Option<TimingGridConfig>> {
    let Some(config) = json_file::read_optional::<TimingGridConfig>(path)? else {
        info!(path = %path.display(), "未找到时机配置文件，使用固定接种时机");
        return Ok(None);
    };

    config.validate().map_err(|source| ConfigError::Invalid {
        path: path.display().to_string(),
        source,
    })?;

    info!(
        path = %path.display(),
        tau1_group1 = ?(config.tau1_group1_min, config.tau1_group1_max),
        tau1_group2 = ?(config.tau1_group2_min, config.tau1_group2_max),
        gap_group1 = ?(config.gap_group1_min, config.gap_group1_max),
        gap_group2 = ?(config.gap_group2_min, config.gap_group2_max),
        time_step = config.time_step,
        "时机配置加载完成"
    );
    Ok(Some(config))
}

/// 写出时机配置（生成模板用）
pub fn save_timing_config(path: &Path, config: &TimingGridConfig) -> ConfigResult<()> {
    let path_text = path.display().to_string();
    let json = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Json {
        path: path_text.clone(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| ConfigError::Io { path: path_text, source })
}
