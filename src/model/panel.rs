//! Panel：单个打开文档的完整状态（原文、解析结果、视图模式、搜索游标）及其状态转换

use std::fmt;
use std::ops::Range;

use jsonpath_rust::JsonPath;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::config::LargeDocPolicy;
use crate::model::doc_stats::{count_json_values, DocumentStats};
use crate::model::error::AppError;
use crate::model::format::{
    decode_json, format_xml, minify_xml, render_json_compact, render_json_pretty, DocFormat,
};
use crate::model::json_tree::{build_json_rows, JsonTreeRow};
use crate::model::search::{count_matches, find_matches, SearchCursor};
use crate::model::xml_tree::{parse_xml, serialize_xml, TreeNode};

/// 面板ID：创建时生成，生命周期内不变
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PanelId(Uuid);

impl PanelId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// 视图模式：原文编辑 / 结构树
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Edit,
    Tree,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    id: PanelId,
    /// 标签页标题
    pub title: String,
    /// 用户编辑/加载的原文，与格式无关
    pub raw_text: String,
    /// 仅 JSON 格式且解析成功时存在
    pub parsed_json: Option<Value>,
    /// 仅 XML 格式且解析成功时存在
    pub parsed_xml_tree: Option<TreeNode>,
    pub mode: ViewMode,
    pub selected_format: DocFormat,
    /// 树视图全部折叠的提示，不影响解析
    pub collapse_all: bool,
    /// 用户关闭大文件提醒之前一直为 true
    pub large_file_warning_enabled: bool,
    /// 搜索框中尚未提交的输入
    pub search_input: String,
    /// 最近一次提交的查询，空串表示没有搜索
    pub active_search_query: String,
    pub current_match_index: usize,
    pub total_matches: usize,
}

/// 部分字段更新：None 表示保持不变；可空字段用 `Some(None)` 清空
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PanelPatch {
    pub title: Option<String>,
    pub raw_text: Option<String>,
    #[serde(deserialize_with = "present_or_null")]
    pub parsed_json: Option<Option<Value>>,
    #[serde(deserialize_with = "present_or_null")]
    pub parsed_xml_tree: Option<Option<TreeNode>>,
    pub mode: Option<ViewMode>,
    pub selected_format: Option<DocFormat>,
    pub collapse_all: Option<bool>,
    pub large_file_warning_enabled: Option<bool>,
    pub search_input: Option<String>,
    pub active_search_query: Option<String>,
    pub current_match_index: Option<usize>,
    pub total_matches: Option<usize>,
}

/// 字段出现即为 `Some`：显式的 `null` 反序列化为 `Some(None)`，缺省字段由 `default` 给出 `None`
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl Panel {
    /// 新建空面板：无解析数据、编辑模式、JSON 格式
    pub fn new(id: PanelId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            raw_text: String::new(),
            parsed_json: None,
            parsed_xml_tree: None,
            mode: ViewMode::Edit,
            selected_format: DocFormat::Json,
            collapse_all: false,
            large_file_warning_enabled: true,
            search_input: String::new(),
            active_search_query: String::new(),
            current_match_index: 0,
            total_matches: 0,
        }
    }

    pub fn id(&self) -> PanelId {
        self.id
    }

    /// 合并部分字段，不做一致性校验（由调用方先完成解析/格式化）
    pub fn apply_patch(&mut self, patch: PanelPatch) {
        let PanelPatch {
            title,
            raw_text,
            parsed_json,
            parsed_xml_tree,
            mode,
            selected_format,
            collapse_all,
            large_file_warning_enabled,
            search_input,
            active_search_query,
            current_match_index,
            total_matches,
        } = patch;

        if let Some(v) = title {
            self.title = v;
        }
        if let Some(v) = raw_text {
            self.raw_text = v;
        }
        if let Some(v) = parsed_json {
            self.parsed_json = v;
        }
        if let Some(v) = parsed_xml_tree {
            self.parsed_xml_tree = v;
        }
        if let Some(v) = mode {
            self.mode = v;
        }
        if let Some(v) = selected_format {
            self.selected_format = v;
        }
        if let Some(v) = collapse_all {
            self.collapse_all = v;
        }
        if let Some(v) = large_file_warning_enabled {
            self.large_file_warning_enabled = v;
        }
        if let Some(v) = search_input {
            self.search_input = v;
        }
        if let Some(v) = active_search_query {
            self.active_search_query = v;
        }
        if let Some(v) = current_match_index {
            self.current_match_index = v;
        }
        if let Some(v) = total_matches {
            self.total_matches = v;
        }
    }

    // === 原文与格式 ===

    /// 替换原文：旧的解析结果作废，回到编辑模式
    pub fn set_raw_text(&mut self, text: impl Into<String>) {
        self.raw_text = text.into();
        self.parsed_json = None;
        self.parsed_xml_tree = None;
        self.mode = ViewMode::Edit;
        self.refresh_search();
    }

    /// 切换格式：两种解析结果都清空并强制回到编辑模式（即使格式未变）
    pub fn set_format(&mut self, format: DocFormat) {
        tracing::debug!("面板 {} 切换格式: {:?} -> {:?}", self.id, self.selected_format, format);
        self.selected_format = format;
        self.parsed_json = None;
        self.parsed_xml_tree = None;
        self.mode = ViewMode::Edit;
        self.refresh_search();
    }

    /// 美化原文；失败时面板保持不变
    pub fn format(&mut self) -> Result<(), AppError> {
        match self.selected_format {
            DocFormat::Json => {
                let value = decode_json(&self.raw_text)?;
                self.raw_text = render_json_pretty(&value)?;
                self.parsed_json = Some(value);
            }
            DocFormat::Xml => {
                let formatted = format_xml(&self.raw_text);
                self.replace_xml_text(formatted);
            }
        }
        self.refresh_search();
        Ok(())
    }

    /// 压缩原文；失败时面板保持不变
    pub fn minify(&mut self) -> Result<(), AppError> {
        match self.selected_format {
            DocFormat::Json => {
                let value = decode_json(&self.raw_text)?;
                self.raw_text = render_json_compact(&value)?;
                self.parsed_json = Some(value);
            }
            DocFormat::Xml => {
                let minified = minify_xml(&self.raw_text);
                self.replace_xml_text(minified);
            }
        }
        self.refresh_search();
        Ok(())
    }

    /// XML 原文被重排后，已缓存的结构树按新原文重建；重建失败则退回编辑模式
    fn replace_xml_text(&mut self, text: String) {
        self.raw_text = text;
        if self.parsed_xml_tree.is_none() {
            return;
        }
        match parse_xml(&self.raw_text) {
            Ok(tree) => self.parsed_xml_tree = Some(tree),
            Err(e) => {
                tracing::warn!("面板 {} 重排后无法重建结构树: {}", self.id, e);
                self.parsed_xml_tree = None;
                self.mode = ViewMode::Edit;
            }
        }
    }

    // === 视图模式 ===

    /// 按当前格式解析原文（已有解析结果时直接复用）；失败时不修改任何状态
    pub fn ensure_parsed(&mut self) -> Result<(), AppError> {
        match self.selected_format {
            DocFormat::Json if self.parsed_json.is_none() => {
                self.parsed_json = Some(decode_json(&self.raw_text)?);
            }
            DocFormat::Xml if self.parsed_xml_tree.is_none() => {
                let tree = parse_xml(&self.raw_text)?;
                self.parsed_xml_tree = Some(tree);
            }
            _ => {}
        }
        Ok(())
    }

    /// 切换视图模式；进入树视图需要解析成功，否则返回错误且模式不变
    pub fn set_mode(&mut self, mode: ViewMode) -> Result<(), AppError> {
        if mode == ViewMode::Tree {
            if let Err(e) = self.ensure_parsed() {
                tracing::warn!("面板 {} 无法进入树视图: {}", self.id, e);
                return Err(e);
            }
        }
        self.mode = mode;
        self.refresh_search();
        Ok(())
    }

    pub fn toggle_mode(&mut self) -> Result<(), AppError> {
        match self.mode {
            ViewMode::Edit => self.set_mode(ViewMode::Tree),
            ViewMode::Tree => self.set_mode(ViewMode::Edit),
        }
    }

    pub fn set_collapse_all(&mut self, collapse: bool) {
        self.collapse_all = collapse;
    }

    /// 当前视图下呈现给用户的文本：编辑模式为原文，树视图为美化JSON或回写的XML
    pub fn rendered_content(&self) -> String {
        if self.mode == ViewMode::Tree {
            match self.selected_format {
                DocFormat::Json => {
                    if let Some(value) = &self.parsed_json {
                        if let Ok(pretty) = render_json_pretty(value) {
                            return pretty;
                        }
                    }
                }
                DocFormat::Xml => {
                    if let Some(tree) = &self.parsed_xml_tree {
                        return serialize_xml(tree, 0);
                    }
                }
            }
        }
        self.raw_text.clone()
    }

    /// JSON 树视图的行模型，折叠状态取自 `collapse_all`
    pub fn json_rows(&self) -> Option<Vec<JsonTreeRow>> {
        self.parsed_json
            .as_ref()
            .map(|value| build_json_rows(value, self.collapse_all))
    }

    /// 按 JSONPath 提取第一个匹配节点的 pretty 字符串
    pub fn query_json(&self, json_path: &str) -> Result<String, AppError> {
        let dom = self
            .parsed_json
            .as_ref()
            .ok_or_else(|| AppError::State("JSON尚未解析".into()))?;
        let hits: Vec<&Value> = dom
            .query(json_path)
            .map_err(|e| AppError::JsonPath(e.to_string()))?;
        let first = hits
            .into_iter()
            .next()
            .ok_or_else(|| AppError::JsonPath("未匹配到任何节点".into()))?;
        render_json_pretty(first)
    }

    // === 大文件提醒 ===

    /// 已解析时的节点数
    pub fn node_count(&self) -> Option<usize> {
        match self.selected_format {
            DocFormat::Json => self.parsed_json.as_ref().map(count_json_values),
            DocFormat::Xml => self.parsed_xml_tree.as_ref().map(TreeNode::count_nodes),
        }
    }

    pub fn stats(&self) -> DocumentStats {
        let stats = DocumentStats::from_text(&self.raw_text);
        match self.node_count() {
            Some(n) => stats.with_nodes(n),
            None => stats,
        }
    }

    /// 是否需要提醒大文件（用户关闭提醒后不再提醒）
    pub fn should_warn_large(&self, policy: &LargeDocPolicy) -> bool {
        self.large_file_warning_enabled && self.stats().is_large(policy)
    }

    pub fn dismiss_large_file_warning(&mut self) {
        self.large_file_warning_enabled = false;
    }

    // === 搜索 ===

    pub fn set_search_input(&mut self, input: impl Into<String>) {
        self.search_input = input.into();
    }

    /// 提交搜索输入：重新扫描当前呈现内容，游标归零
    pub fn commit_search(&mut self) -> usize {
        self.active_search_query = self.search_input.trim().to_string();
        self.total_matches = count_matches(&self.rendered_content(), &self.active_search_query);
        self.current_match_index = 0;
        tracing::debug!(
            "面板 {} 搜索 {:?}: {} 个匹配",
            self.id,
            self.active_search_query,
            self.total_matches
        );
        self.total_matches
    }

    pub fn clear_search(&mut self) {
        self.search_input.clear();
        self.active_search_query.clear();
        self.current_match_index = 0;
        self.total_matches = 0;
    }

    pub fn next_match(&mut self) -> usize {
        self.set_cursor(self.cursor().next());
        self.current_match_index
    }

    pub fn previous_match(&mut self) -> usize {
        self.set_cursor(self.cursor().previous());
        self.current_match_index
    }

    /// 当前匹配在呈现内容中的字节区间
    pub fn current_match_range(&self) -> Option<Range<usize>> {
        if self.active_search_query.is_empty() {
            return None;
        }
        find_matches(&self.rendered_content(), &self.active_search_query)
            .into_iter()
            .nth(self.current_match_index)
    }

    fn cursor(&self) -> SearchCursor {
        SearchCursor {
            current: self.current_match_index,
            total: self.total_matches,
        }
    }

    fn set_cursor(&mut self, cursor: SearchCursor) {
        self.current_match_index = cursor.current;
        self.total_matches = cursor.total;
    }

    /// 呈现内容变化后按已提交的查询重新计数
    fn refresh_search(&mut self) {
        let total = if self.active_search_query.is_empty() {
            0
        } else {
            count_matches(&self.rendered_content(), &self.active_search_query)
        };
        self.set_cursor(self.cursor().rescan(total));
    }
}
