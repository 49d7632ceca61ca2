//! IO helper: 读取待格式化的文档文本（只读，不做持久化）

use std::{fs::File, io::{BufReader, Read}, path::Path};

use crate::model::error::AppError;
use crate::model::format::DocFormat;

/// 读取整个文本文件
pub fn read_text_file(p: &Path) -> Result<String, AppError> {
    let f = File::open(p)?;
    let mut rdr = BufReader::new(f);
    let mut text = String::new();
    rdr.read_to_string(&mut text)?;
    Ok(text)
}

/// 按扩展名识别格式；无法识别时根据首个非空白字符猜测
pub fn detect_format(p: &Path, text: &str) -> DocFormat {
    if let Some(fmt) = p
        .extension()
        .and_then(|e| e.to_str())
        .and_then(DocFormat::from_extension)
    {
        return fmt;
    }
    match text.trim_start().chars().next() {
        Some('<') => DocFormat::Xml,
        _ => DocFormat::Json,
    }
}

/// 文件名（不含目录），用作面板标题
pub fn display_name(p: &Path) -> String {
    p.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| p.display().to_string())
}
