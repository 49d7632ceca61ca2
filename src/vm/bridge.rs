//! VM桥接层：把面板/工作区状态整理成宿主界面直接显示的文本
//!
//! 宿主（命令行或图形界面）只负责渲染，这里不改动任何状态。

use crate::config::LargeDocPolicy;
use crate::model::format::DocFormat;
use crate::model::panel::{Panel, ViewMode};
use crate::model::workspace::{Workspace, MAX_PANELS};

// === 常量定义（消除魔法值） ===
pub const STATUS_READY: &str = "就绪";
pub const STATUS_FORMATTED: &str = "格式化完成";
pub const STATUS_MINIFIED: &str = "压缩完成";
pub const STATUS_PANEL_LIMIT: &str = "面板数量已达上限";
pub const STATUS_LARGE_FILE: &str = "文件较大，树视图可能较慢";
pub const STATUS_ERROR_PREFIX: &str = "错误: ";

pub fn format_label(format: DocFormat) -> &'static str {
    match format {
        DocFormat::Json => "JSON",
        DocFormat::Xml => "XML",
    }
}

pub fn mode_label(mode: ViewMode) -> &'static str {
    match mode {
        ViewMode::Edit => "编辑",
        ViewMode::Tree => "树",
    }
}

/// 搜索计数：有匹配时显示 "当前/总数"（从1开始），无查询时为空
pub fn match_label(panel: &Panel) -> String {
    if panel.active_search_query.is_empty() {
        return String::new();
    }
    if panel.total_matches == 0 {
        return "0/0".to_string();
    }
    format!("{}/{}", panel.current_match_index + 1, panel.total_matches)
}

/// 单个面板的状态栏文本
pub fn panel_status(panel: &Panel, policy: &LargeDocPolicy) -> String {
    let mut line = format!(
        "{} [{}·{}] {} 字节",
        panel.title,
        format_label(panel.selected_format),
        mode_label(panel.mode),
        panel.raw_text.len()
    );
    if let Some(n) = panel.node_count() {
        line.push_str(&format!(" · {} 节点", n));
    }
    let matches = match_label(panel);
    if !matches.is_empty() {
        line.push_str(&format!(" · 匹配 {}", matches));
    }
    if panel.should_warn_large(policy) {
        line.push_str(&format!(" · {}", STATUS_LARGE_FILE));
    }
    line
}

/// 标签栏文本：活动面板前加 `*`
pub fn tab_bar(ws: &Workspace) -> String {
    let active = ws.active_panel_id();
    let tabs: Vec<String> = ws
        .panels()
        .iter()
        .map(|p| {
            if Some(p.id()) == active {
                format!("*{}", p.title)
            } else {
                p.title.clone()
            }
        })
        .collect();
    format!("{} ({}/{})", tabs.join(" | "), ws.panel_count(), MAX_PANELS)
}

pub fn error_status(err: &impl std::fmt::Display) -> String {
    format!("{}{}", STATUS_ERROR_PREFIX, err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_label() {
        let mut ws = Workspace::new();
        let panel = ws.open_document("a.json", "[\"x\", \"x\"]", DocFormat::Json).unwrap();
        assert_eq!(match_label(panel), "", "没有查询时不显示");

        panel.set_search_input("x");
        panel.commit_search();
        panel.next_match();
        assert_eq!(match_label(panel), "2/2");

        panel.set_search_input("zzz");
        panel.commit_search();
        assert_eq!(match_label(panel), "0/0");
    }

    #[test]
    fn test_panel_status() {
        let mut ws = Workspace::new();
        let panel = ws.open_document("a.xml", "<r><a/></r>", DocFormat::Xml).unwrap();
        panel.set_mode(ViewMode::Tree).unwrap();
        let policy = LargeDocPolicy { max_text_bytes: usize::MAX, max_nodes: 2 };
        let status = panel_status(panel, &policy);
        assert!(status.starts_with("a.xml [XML·树]"), "状态: {}", status);
        assert!(status.contains("2 节点"));
        assert!(status.contains(STATUS_LARGE_FILE));
    }

    #[test]
    fn test_tab_bar_marks_active() {
        let mut ws = Workspace::new();
        ws.open_document("a.json", "{}", DocFormat::Json);
        ws.open_document("b.json", "{}", DocFormat::Json);
        assert_eq!(tab_bar(&ws), "a.json | *b.json (2/3)");
    }

    #[test]
    fn test_error_status() {
        assert_eq!(error_status(&"坏了"), "错误: 坏了");
    }
}
