//! 配置模块，负责加载数据源字段目录的JSON配置文件

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// 字段目录配置错误
#[derive(Debug, Error)]
#[error("配置错误: {message}")]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    pub fn new(message: String) -> Self {
        Self { message }
    }
}

/// 数据源字段目录：当前信息提供者可用作操作数的字段名列表。
/// 同时支撑公式命名时的重名检查。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCatalog {
    /// 字段名，保持配置文件中的顺序
    fields: Vec<String>,
}

impl FieldCatalog {
    /// 从JSON文件加载字段目录（字符串数组）
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        // 检查文件是否存在
        if !path_ref.exists() {
            return Err(ConfigError::new(format!(
                "配置文件不存在: {}",
                path_ref.display()
            )));
        }

        // 读取文件内容
        let content = fs::read_to_string(path_ref).map_err(|e| {
            ConfigError::new(format!("无法读取配置文件 {}: {}", path_ref.display(), e))
        })?;

        // 解析JSON
        let fields: Vec<String> = serde_json::from_str(&content).map_err(|e| {
            ConfigError::new(format!(
                "无法解析JSON配置文件 {}: {}",
                path_ref.display(),
                e
            ))
        })?;

        Ok(FieldCatalog { fields })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field == name)
    }

    /// 获取所有字段名
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// 创建默认目录（用于测试或fallback）
    pub fn default_catalog() -> Self {
        let fields = [
            "temperature",
            "humidity",
            "windSpeed",
            "pressure",
            "precipitation",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        Self { fields }
    }
}
