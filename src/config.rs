//! 配置：大文件阈值与日志级别，可从JSON文件加载，缺省字段取默认值

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::error::AppError;
use crate::utils::fs::read_text_file;

/// 默认文本大小阈值：1 MiB
pub const DEFAULT_LARGE_TEXT_BYTES: usize = 1024 * 1024;
/// 默认元素/节点数量阈值
pub const DEFAULT_LARGE_NODE_COUNT: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 文本字节数达到该值视为大文件
    pub large_text_bytes: usize,
    /// 节点数达到该值视为大文件
    pub large_node_count: usize,
    /// 日志级别：trace/debug/info/warn/error
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            large_text_bytes: DEFAULT_LARGE_TEXT_BYTES,
            large_node_count: DEFAULT_LARGE_NODE_COUNT,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// 从JSON文件加载配置
    ///
    /// 加载发生在日志初始化之前，这里不记录日志，由宿主在初始化后报告。
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = read_text_file(path)?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// 有路径则加载，否则使用默认配置
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, AppError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn tracing_level(&self) -> Result<tracing::Level, AppError> {
        self.log_level
            .parse()
            .map_err(|_| AppError::Config(format!("未知的日志级别: {}", self.log_level)))
    }

    pub fn large_doc_policy(&self) -> LargeDocPolicy {
        LargeDocPolicy {
            max_text_bytes: self.large_text_bytes,
            max_nodes: self.large_node_count,
        }
    }
}

/// 大文件判定阈值（由宿主决定数值，核心只负责比较）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LargeDocPolicy {
    pub max_text_bytes: usize,
    pub max_nodes: usize,
}

impl Default for LargeDocPolicy {
    fn default() -> Self {
        Config::default().large_doc_policy()
    }
}
