//! Workspace：有序面板集合、活动面板指针与片段编号计数器
//!
//! 不变量：`active` 为 None 当且仅当面板列表为空。

use serde::Serialize;

use crate::model::format::DocFormat;
use crate::model::panel::{Panel, PanelId, PanelPatch};

/// 同时打开的面板上限（硬性资源限制，不可配置）
pub const MAX_PANELS: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct Workspace {
    panels: Vec<Panel>,
    active: Option<PanelId>,
    /// 下一个空面板的编号，从1开始，关闭面板后不回收
    next_panel: u32,
    /// 下一个粘贴片段的编号，从1开始
    next_snippet: u32,
}

impl Default for Workspace {
    fn default() -> Self {
        Self {
            panels: Vec::with_capacity(MAX_PANELS),
            active: None,
            next_panel: 1,
            next_snippet: 1,
        }
    }
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// 工作区为空时打开一个空面板
    pub fn initialize(&mut self) {
        if self.panels.is_empty() {
            self.add_panel();
        }
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    pub fn can_add_panel(&self) -> bool {
        self.panels.len() < MAX_PANELS
    }

    pub fn active_panel_id(&self) -> Option<PanelId> {
        self.active
    }

    pub fn active_panel(&self) -> Option<&Panel> {
        self.active.and_then(|id| self.panel(id))
    }

    pub fn active_panel_mut(&mut self) -> Option<&mut Panel> {
        let id = self.active?;
        self.panel_mut(id)
    }

    pub fn panel(&self, id: PanelId) -> Option<&Panel> {
        self.panels.iter().find(|p| p.id() == id)
    }

    pub fn panel_mut(&mut self, id: PanelId) -> Option<&mut Panel> {
        self.panels.iter_mut().find(|p| p.id() == id)
    }

    fn index_of(&self, id: PanelId) -> Option<usize> {
        self.panels.iter().position(|p| p.id() == id)
    }

    /// 新建空面板并设为活动面板；已达上限时返回 None 且不做任何修改
    pub fn add_panel(&mut self) -> Option<&mut Panel> {
        if !self.can_add_panel() {
            tracing::info!("面板数量已达上限 {}，忽略新建请求", MAX_PANELS);
            return None;
        }
        let title = format!("面板 {}", self.next_panel);
        self.next_panel += 1;
        self.push_panel(title)
    }

    fn push_panel(&mut self, title: String) -> Option<&mut Panel> {
        if !self.can_add_panel() {
            tracing::info!("面板数量已达上限 {}，忽略新建请求", MAX_PANELS);
            return None;
        }
        let panel = Panel::new(PanelId::new_random(), title);
        let id = panel.id();
        self.panels.push(panel);
        self.active = Some(id);
        tracing::info!("新建面板 {}，当前共 {} 个", id, self.panels.len());
        self.panels.last_mut()
    }

    /// 打开一份文档：新面板带标题、原文与格式
    pub fn open_document(
        &mut self,
        name: impl Into<String>,
        raw: impl Into<String>,
        format: DocFormat,
    ) -> Option<&mut Panel> {
        let panel = self.push_panel(name.into())?;
        panel.set_format(format);
        panel.set_raw_text(raw);
        Some(panel)
    }

    /// 打开粘贴片段，按 "Snippet N" 命名；只有真正建出面板时编号才递增
    pub fn add_snippet(&mut self, raw: impl Into<String>, format: DocFormat) -> Option<&mut Panel> {
        if !self.can_add_panel() {
            tracing::info!("面板数量已达上限 {}，忽略片段", MAX_PANELS);
            return None;
        }
        let name = format!("Snippet {}", self.next_snippet);
        self.next_snippet += 1;
        self.open_document(name, raw, format)
    }

    /// 关闭面板；id 不存在时什么也不做
    ///
    /// 被关闭的是活动面板时，新的活动面板是占据同一位置的面板；
    /// 若关闭的是最后一个则取前一个；列表为空则为 None。
    pub fn remove_panel(&mut self, id: PanelId) {
        let Some(index) = self.index_of(id) else {
            tracing::debug!("关闭面板 {}：不存在，忽略", id);
            return;
        };
        self.panels.remove(index);
        tracing::info!("关闭面板 {}，剩余 {} 个", id, self.panels.len());

        if self.active == Some(id) {
            self.active = self
                .panels
                .get(index)
                .or_else(|| self.panels.last())
                .map(Panel::id);
        }
    }

    /// 设置活动面板；id 不存在时什么也不做
    pub fn set_active_panel(&mut self, id: PanelId) {
        if self.index_of(id).is_some() {
            self.active = Some(id);
        }
    }

    /// 合并部分字段到指定面板；id 不存在时什么也不做
    pub fn update_panel(&mut self, id: PanelId, patch: PanelPatch) {
        if let Some(panel) = self.panel_mut(id) {
            panel.apply_patch(patch);
        }
    }
}
