//! AppError：格式化核心的统一错误类型

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO失败: {0}")]
    Io(#[from] std::io::Error),
    /// JSON 文本无法解码（ParseError）
    #[error("JSON解析失败: {0}")]
    Parse(#[from] serde_json::Error),
    /// XML 不是良构文档，携带诊断信息（MalformedXmlError）
    #[error("XML格式错误: {0}")]
    MalformedXml(String),
    #[error("JSONPath错误: {0}")]
    JsonPath(String),
    #[error("状态错误: {0}")]
    State(String),
    #[error("配置错误: {0}")]
    Config(String),
}

impl AppError {
    pub fn is_parse(&self) -> bool {
        matches!(self, AppError::Parse(_))
    }

    pub fn is_malformed_xml(&self) -> bool {
        matches!(self, AppError::MalformedXml(_))
    }
}
