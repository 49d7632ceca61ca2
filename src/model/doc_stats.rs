//! 文档规模统计：供宿主决定是否弹出大文件提醒
//!
//! 核心只给出字节数、行数和节点数，阈值来自 `LargeDocPolicy`。

use serde::Serialize;
use serde_json::Value;

use crate::config::LargeDocPolicy;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    pub bytes: usize,
    pub lines: usize,
    /// 已解析时的节点数（XML 元素数 / JSON 值个数）
    pub nodes: Option<usize>,
}

impl DocumentStats {
    pub fn from_text(text: &str) -> Self {
        Self {
            bytes: text.len(),
            lines: text.lines().count(),
            nodes: None,
        }
    }

    pub fn with_nodes(mut self, nodes: usize) -> Self {
        self.nodes = Some(nodes);
        self
    }

    /// 文本或节点数任一达到阈值即视为大文件
    pub fn is_large(&self, policy: &LargeDocPolicy) -> bool {
        self.bytes >= policy.max_text_bytes || self.nodes.is_some_and(|n| n >= policy.max_nodes)
    }
}

/// JSON 值总数（含根）
pub fn count_json_values(v: &Value) -> usize {
    1 + match v {
        Value::Object(m) => m.values().map(count_json_values).sum::<usize>(),
        Value::Array(a) => a.iter().map(count_json_values).sum::<usize>(),
        _ => 0,
    }
}
