//! JSON/XML 多面板格式化工具库
//!
//! 提供JSON与XML的美化/压缩、XML结构树解析与回写、
//! 以及最多三个并列面板的工作区状态管理（视图模式、搜索游标）

pub mod config;
pub mod model;
pub mod utils;
pub mod vm;

// 重新导出主要类型
pub use config::{Config, LargeDocPolicy};
pub use model::error::AppError;
pub use model::format::{format_json, format_xml, minify_json, minify_xml, DocFormat};
pub use model::panel::{Panel, PanelId, PanelPatch, ViewMode};
pub use model::workspace::{Workspace, MAX_PANELS};
pub use model::xml_tree::{count_nodes, parse_xml, serialize_xml, TreeNode};
