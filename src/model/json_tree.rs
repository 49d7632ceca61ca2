//! JSON 树视图：把解析后的 Value 展平成按文档顺序排列的行
//!
//! 每行只记录位置、类型和一段短预览；展开/折叠只改行上的标记，
//! 可见性由 `update_visibility` 一趟扫描重新计算。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 字符串预览最多保留的字符数
const PREVIEW_CHARS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Object,
    Array,
    String,
    Number,
    Bool,
    Null,
}

impl NodeKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => NodeKind::Object,
            Value::Array(_) => NodeKind::Array,
            Value::String(_) => NodeKind::String,
            Value::Number(_) => NodeKind::Number,
            Value::Bool(_) => NodeKind::Bool,
            Value::Null => NodeKind::Null,
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Object | NodeKind::Array)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonTreeRow {
    /// 字段名；数组元素为 `[i]`，根为 `$`
    pub name: String,
    /// 从根出发的 JSONPath，可直接交给 `Panel::query_json`
    pub path: String,
    pub kind: NodeKind,
    /// 直接子节点个数
    pub children: u32,
    pub preview: String,
    /// 根为0
    pub depth: u32,
    pub expanded: bool,
    pub visible: bool,
}

/// 一行的预览文字
fn preview(value: &Value) -> String {
    match value {
        Value::String(s) => {
            let s = s.trim();
            match s.char_indices().nth(PREVIEW_CHARS) {
                Some((cut, _)) => format!("\"{}...\"", &s[..cut]),
                None => format!("\"{}\"", s),
            }
        }
        Value::Object(m) => format!("{{..}} {} 个字段", m.len()),
        Value::Array(a) => format!("[..] {} 个元素", a.len()),
        scalar => scalar.to_string(),
    }
}

/// 对象字段的路径：普通标识符用点号，其余用带引号的方括号
fn field_path(parent: &str, key: &str) -> String {
    let plain = key.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        format!("{}.{}", parent, key)
    } else {
        format!("{}['{}']", parent, key.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

/// 深度优先收集行，子节点紧跟在父节点之后
struct RowCollector {
    rows: Vec<JsonTreeRow>,
    expanded: bool,
}

impl RowCollector {
    fn visit(&mut self, value: &Value, name: String, path: String, depth: u32) {
        let children = match value {
            Value::Object(m) => m.len(),
            Value::Array(a) => a.len(),
            _ => 0,
        };
        self.rows.push(JsonTreeRow {
            name,
            kind: NodeKind::of(value),
            children: children as u32,
            preview: preview(value),
            depth,
            expanded: self.expanded,
            visible: false,
            path: path.clone(),
        });

        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    self.visit(child, key.clone(), field_path(&path, key), depth + 1);
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    self.visit(child, format!("[{}]", i), format!("{}[{}]", path, i), depth + 1);
                }
            }
            _ => {}
        }
    }
}

/// 展平整棵树；`collapse_all` 为真时所有行初始折叠，只有根可见
pub fn build_json_rows(root: &Value, collapse_all: bool) -> Vec<JsonTreeRow> {
    let mut collector = RowCollector {
        rows: Vec::new(),
        expanded: !collapse_all,
    };
    collector.visit(root, "$".to_string(), "$".to_string(), 0);
    let mut rows = collector.rows;
    update_visibility(&mut rows);
    rows
}

/// 翻转 `path` 所在行的展开标记；找不到该行时返回 false
pub fn toggle_row(rows: &mut [JsonTreeRow], path: &str) -> bool {
    match rows.iter_mut().find(|r| r.path == path) {
        Some(row) => row.expanded = !row.expanded,
        None => return false,
    }
    update_visibility(rows);
    true
}

/// 一行可见，当且仅当它的祖先全部展开
///
/// `limit` 是下一行可见所允许的最大深度：遇到可见行时，
/// 展开则放宽到它的子层，折叠则收紧到它本层。
pub fn update_visibility(rows: &mut [JsonTreeRow]) {
    let mut limit = 0;
    for row in rows.iter_mut() {
        row.visible = row.depth <= limit;
        if row.visible {
            limit = if row.expanded { row.depth + 1 } else { row.depth };
        }
    }
}
