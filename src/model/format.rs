//! 格式化引擎：JSON / XML 的美化与压缩（纯函数，无副作用）
//!
//! XML 在这里只做词法层面的重排缩进，不校验结构；严格解析见 `xml_tree`。

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::error::AppError;

/// 每层缩进：2个空格
const INDENT_UNIT: &str = "  ";

/// 面板当前选择的文档格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocFormat {
    #[default]
    Json,
    Xml,
}

impl DocFormat {
    /// 根据文件扩展名猜测格式，无法识别时返回 None
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(DocFormat::Json),
            "xml" | "xsd" | "xsl" | "svg" | "xhtml" => Some(DocFormat::Xml),
            _ => None,
        }
    }
}

/// 解码JSON文本，不做部分恢复
pub fn decode_json(text: &str) -> Result<Value, AppError> {
    Ok(serde_json::from_str(text)?)
}

/// 以2空格缩进输出已解码的值
pub fn render_json_pretty(value: &Value) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// 以紧凑形式输出已解码的值
pub fn render_json_compact(value: &Value) -> Result<String, AppError> {
    Ok(serde_json::to_string(value)?)
}

/// 美化JSON：2空格缩进，保留键顺序与数值写法
pub fn format_json(text: &str) -> Result<String, AppError> {
    render_json_pretty(&decode_json(text)?)
}

/// 压缩JSON：去掉所有非必要空白
pub fn minify_json(text: &str) -> Result<String, AppError> {
    render_json_compact(&decode_json(text)?)
}

/// 宽松的XML美化：按标签嵌套深度重新缩进，从不拒绝输入
pub fn format_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    let mut depth = 0usize;

    for token in tokenize_xml(text) {
        match token {
            XmlToken::Closer(tag) => {
                // 多余的闭合标签不会让深度变成负数
                depth = depth.saturating_sub(1);
                push_line(&mut out, depth, tag);
            }
            XmlToken::Opener(tag) => {
                push_line(&mut out, depth, tag);
                depth += 1;
            }
            XmlToken::Leaf(tag) => push_line(&mut out, depth, tag),
            XmlToken::Text(t) => {
                let t = t.trim();
                if !t.is_empty() {
                    push_line(&mut out, depth, t);
                }
            }
        }
    }

    out.trim().to_string()
}

/// 宽松的XML压缩：标签之间不留空白，文本去掉首尾空白
pub fn minify_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for token in tokenize_xml(text) {
        match token {
            XmlToken::Text(t) => out.push_str(t.trim()),
            XmlToken::Closer(tag) | XmlToken::Opener(tag) | XmlToken::Leaf(tag) => out.push_str(tag),
        }
    }
    out
}

/// 按格式分派美化
pub fn format_text(format: DocFormat, text: &str) -> Result<String, AppError> {
    match format {
        DocFormat::Json => format_json(text),
        DocFormat::Xml => Ok(format_xml(text)),
    }
}

/// 按格式分派压缩
pub fn minify_text(format: DocFormat, text: &str) -> Result<String, AppError> {
    match format {
        DocFormat::Json => minify_json(text),
        DocFormat::Xml => Ok(minify_xml(text)),
    }
}

fn push_line(out: &mut String, depth: usize, content: &str) {
    for _ in 0..depth {
        out.push_str(INDENT_UNIT);
    }
    out.push_str(content);
    out.push('\n');
}

/// 词法扫描得到的XML片段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum XmlToken<'a> {
    /// `</name ...>`
    Closer(&'a str),
    /// `<name ...>`
    Opener(&'a str),
    /// `<name .../>`
    Leaf(&'a str),
    /// 文本、注释、声明等其他片段
    Text(&'a str),
}

fn tag_regex() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("标签正则应当合法"))
}

fn tokenize_xml(text: &str) -> Vec<XmlToken<'_>> {
    let mut tokens = Vec::new();
    let mut last = 0;
    for m in tag_regex().find_iter(text) {
        if m.start() > last {
            tokens.push(XmlToken::Text(&text[last..m.start()]));
        }
        tokens.push(classify_tag(m.as_str()));
        last = m.end();
    }
    if last < text.len() {
        tokens.push(XmlToken::Text(&text[last..]));
    }
    tokens
}

fn is_name_start(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn classify_tag(tag: &str) -> XmlToken<'_> {
    if let Some(rest) = tag.strip_prefix("</") {
        if rest.chars().next().is_some_and(is_name_start) {
            return XmlToken::Closer(tag);
        }
        return XmlToken::Text(tag);
    }
    let named = tag[1..].chars().next().is_some_and(is_name_start);
    if !named {
        // <?xml ...?>、<!-- -->、<!DOCTYPE> 等按文本原样输出
        return XmlToken::Text(tag);
    }
    if tag.ends_with("/>") {
        XmlToken::Leaf(tag)
    } else {
        XmlToken::Opener(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_json_indent_and_key_order() {
        let formatted = format_json(r#"{"b":1,"a":[true,null,"x"],"c":{}}"#).unwrap();
        let expected = "{\n  \"b\": 1,\n  \"a\": [\n    true,\n    null,\n    \"x\"\n  ],\n  \"c\": {}\n}";
        assert_eq!(formatted, expected, "应该2空格缩进且保持键顺序");
    }

    #[test]
    fn test_format_json_idempotent() {
        let samples = [
            r#"{"name":"测试","nested":{"list":[1,2.50,-3e5]},"flag":false}"#,
            "[]",
            "\"纯字符串\"",
            "  42  ",
        ];
        for s in samples {
            let once = format_json(s).unwrap();
            let twice = format_json(&once).unwrap();
            assert_eq!(once, twice, "格式化应该是幂等的: {}", s);
        }
    }

    #[test]
    fn test_format_json_keeps_number_spelling() {
        let formatted = format_json(r#"{"a":1.0,"b":12345678901234567890123}"#).unwrap();
        assert!(formatted.contains("1.0"), "浮点写法应该保留");
        assert!(formatted.contains("12345678901234567890123"), "大整数不应该丢失精度");
    }

    #[test]
    fn test_format_json_invalid() {
        let err = format_json("{bad json").unwrap_err();
        assert!(err.is_parse(), "无效JSON应该返回解析错误");
        assert!(minify_json("[1,").unwrap_err().is_parse());
    }

    #[test]
    fn test_decode_then_render() {
        let value = decode_json(r#"{"z": [1.0, "二"]}"#).unwrap();
        assert_eq!(render_json_compact(&value).unwrap(), r#"{"z":[1.0,"二"]}"#);
        assert_eq!(render_json_pretty(&value).unwrap(), format_json(r#"{"z": [1.0, "二"]}"#).unwrap());
        assert!(decode_json("").unwrap_err().is_parse(), "空文本不是合法JSON");
    }

    #[test]
    fn test_minify_json() {
        let minified = minify_json("{\n  \"a\": [1, 2],\n  \"b\": \"x y\"\n}").unwrap();
        assert_eq!(minified, r#"{"a":[1,2],"b":"x y"}"#);
    }

    #[test]
    fn test_format_xml_nesting() {
        let formatted = format_xml("<root><item id=\"1\">文本</item><empty/></root>");
        let expected = "<root>\n  <item id=\"1\">\n    文本\n  </item>\n  <empty/>\n</root>";
        assert_eq!(formatted, expected);
    }

    #[test]
    fn test_format_xml_single_letter_tags() {
        let formatted = format_xml("<a><b>x</b></a>");
        assert_eq!(formatted, "<a>\n  <b>\n    x\n  </b>\n</a>", "单字母标签也应该按嵌套缩进");
    }

    #[test]
    fn test_format_xml_normalizes_whitespace() {
        let formatted = format_xml("\n\n   <root>\n\t\t<child />   \n</root>\n\n");
        assert_eq!(formatted, "<root>\n  <child />\n</root>");
    }

    #[test]
    fn test_format_xml_declaration_and_comment_as_text() {
        let formatted = format_xml("<?xml version=\"1.0\"?><root><!-- 注释 --><item/></root>");
        let expected = "<?xml version=\"1.0\"?>\n<root>\n  <!-- 注释 -->\n  <item/>\n</root>";
        assert_eq!(formatted, expected);
    }

    #[test]
    fn test_format_xml_is_permissive() {
        // 不匹配的标签照样输出
        assert_eq!(format_xml("<a><b></a>"), "<a>\n  <b>\n  </a>");
        // 多余的闭合标签不会让缩进为负
        assert_eq!(format_xml("</x></y><z/>"), "</x>\n</y>\n<z/>");
        // 没有标签的文本
        assert_eq!(format_xml("  a < b  "), "a < b");
        assert_eq!(format_xml(""), "");
    }

    #[test]
    fn test_minify_xml() {
        let minified = minify_xml("<root>\n  <item>\n    值\n  </item>\n  <empty />\n</root>\n");
        assert_eq!(minified, "<root><item>值</item><empty /></root>");
    }

    #[test]
    fn test_format_text_dispatch() {
        assert_eq!(format_text(DocFormat::Json, "[1]").unwrap(), "[\n  1\n]");
        assert_eq!(format_text(DocFormat::Xml, "<a/>").unwrap(), "<a/>");
        assert_eq!(minify_text(DocFormat::Xml, "<a> </a>").unwrap(), "<a></a>");
    }

    #[test]
    fn test_doc_format_from_extension() {
        assert_eq!(DocFormat::from_extension("JSON"), Some(DocFormat::Json));
        assert_eq!(DocFormat::from_extension("svg"), Some(DocFormat::Xml));
        assert_eq!(DocFormat::from_extension("txt"), None);
    }
}
