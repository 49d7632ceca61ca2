//! 数据层：格式化引擎、XML结构树、面板与工作区状态

pub mod doc_stats;
pub mod error;
pub mod format;
pub mod json_tree;
pub mod panel;
pub mod search;
pub mod workspace;
pub mod xml_tree;
