// ==========================================
// 疫苗分配优化系统 - 目标权重配置
// ==========================================
// 文件格式（JSON）:
//   单套: {"name": "custom", "w1": 0.5, "w2": 0.3, "w3": 0.2}
//   多套: [{...}, {...}]   （对比运行）
// 对比权重集 = 用户权重在前 + 内置预设，按 0.01 容差去重
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::json_file;
use crate::domain::cost::ObjectiveWeights;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WeightsFile {
    Single(ObjectiveWeights),
    Many(Vec<ObjectiveWeights>),
}

/// 读取权重文件；文件不存在返回 None（使用默认权重）
///
/// 每套权重都会校验（各项在 [0,1]，和为 1）
pub fn load_weights(path: &Path) -> ConfigResult<Option<Vec<ObjectiveWeights>>> {
    let Some(file) = json_file::read_optional::<WeightsFile>(path)? else {
        info!(path = %path.display(), "未找到权重文件，使用默认均衡权重");
        return Ok(None);
    };

    let weights = match file {
        WeightsFile::Single(w) => vec![w],
        WeightsFile::Many(list) => list,
    };
    if weights.is_empty() {
        return Err(ConfigError::Missing(format!("{} 中没有任何权重", path.display())));
    }

    for w in &weights {
        w.validate().map_err(|source| ConfigError::Invalid {
            path: path.display().to_string(),
            source,
        })?;
    }

    info!(path = %path.display(), count = weights.len(), "权重配置加载完成");
    Ok(Some(weights))
}

/// 按 0.01 容差去重，保留先出现者
pub fn dedupe_weights(weights: Vec<ObjectiveWeights>) -> Vec<ObjectiveWeights> {
    let mut unique: Vec<ObjectiveWeights> = Vec::with_capacity(weights.len());
    for w in weights {
        if let Some(existing) = unique.iter().find(|u| u.is_near_duplicate(&w)) {
            debug!(skipped = %w.name, kept = %existing.name, "跳过重复权重");
            continue;
        }
        unique.push(w);
    }
    unique
}

/// 对比运行使用的权重集：用户权重在前，随后内置预设
pub fn comparison_weight_set(custom: &[ObjectiveWeights]) -> Vec<ObjectiveWeights> {
    let mut all = custom.to_vec();
    all.extend(ObjectiveWeights::presets());
    dedupe_weights(all)
}
