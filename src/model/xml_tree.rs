//! XML结构树：严格解析为 TreeNode，并可按固定缩进规则回写为XML文本
//!
//! 与 `format::format_xml` 不同，这里的解析是严格的：不良构的文档直接报错，
//! 不会产生半棵树。

use std::fmt::Write as _;

use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::model::error::AppError;

const INDENT_UNIT: &str = "  ";

/// 一个XML元素及其后代（构建后不可变，重新解析时整体替换）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    /// 元素名（区分大小写，非空）
    pub tag_name: String,
    /// 属性，按书写顺序保存；同一节点内键唯一
    pub attributes: Vec<(String, String)>,
    /// 直接子元素（不含文本节点）
    pub children: Vec<TreeNode>,
    /// 所有直接文本子节点拼接后去掉首尾空白
    pub text_content: String,
}

impl TreeNode {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: TreeNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = text.into();
        self
    }

    /// 按名称查找属性值
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// 子树元素总数（含自身）
    pub fn count_nodes(&self) -> usize {
        count_nodes(self)
    }

    /// 从根缩进开始回写
    pub fn to_xml(&self) -> String {
        serialize_xml(self, 0)
    }
}

/// 正在构建中的元素：文本先原样累积，闭合时再整体裁剪
struct OpenElement {
    node: TreeNode,
    text: String,
}

/// 严格解析XML文本为元素树
pub fn parse_xml(text: &str) -> Result<TreeNode, AppError> {
    let mut reader = Reader::from_str(text);
    reader.check_end_names(true);

    let mut stack: Vec<OpenElement> = Vec::new();
    let mut root: Option<TreeNode> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            AppError::MalformedXml(format!("第 {} 字节处: {}", reader.buffer_position(), e))
        })?;
        match event {
            Event::Start(ref e) => {
                ensure_no_second_root(&root, &stack, reader.buffer_position())?;
                stack.push(OpenElement {
                    node: open_node(e)?,
                    text: String::new(),
                });
            }
            Event::Empty(ref e) => {
                ensure_no_second_root(&root, &stack, reader.buffer_position())?;
                let node = open_node(e)?;
                attach(&mut stack, &mut root, node);
            }
            Event::End(ref e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let Some(open) = stack.pop() else {
                    return Err(AppError::MalformedXml(format!("多余的闭合标签 </{}>", name)));
                };
                if open.node.tag_name != name {
                    return Err(AppError::MalformedXml(format!(
                        "标签不匹配: 期望 </{}>, 实际 </{}>",
                        open.node.tag_name, name
                    )));
                }
                let mut node = open.node;
                node.text_content = open.text.trim().to_string();
                attach(&mut stack, &mut root, node);
            }
            Event::Text(ref t) => {
                if t.windows(3).any(|w| w == b"]]>") {
                    return Err(AppError::MalformedXml(format!(
                        "第 {} 字节处的字符数据中出现 \"]]>\"",
                        reader.buffer_position()
                    )));
                }
                let content = t.unescape().map_err(|e| {
                    AppError::MalformedXml(format!("第 {} 字节处的字符数据无效: {}", reader.buffer_position(), e))
                })?;
                check_chars(&content, "字符数据")?;
                push_text(&mut stack, &content)?;
            }
            Event::CData(ref c) => {
                // CDATA 段只做合法性检查，不计入 text_content
                if stack.is_empty() {
                    return Err(AppError::MalformedXml("根元素之外存在CDATA段".into()));
                }
                check_chars(&String::from_utf8_lossy(c), "CDATA段")?;
            }
            Event::Eof => break,
            // 注释、处理指令、声明、DOCTYPE 不进入结构树
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(AppError::MalformedXml(format!("标签 <{}> 未闭合", open.node.tag_name)));
    }
    root.ok_or_else(|| AppError::MalformedXml("文档没有根元素".into()))
}

fn ensure_no_second_root(
    root: &Option<TreeNode>,
    stack: &[OpenElement],
    position: impl std::fmt::Display,
) -> Result<(), AppError> {
    if stack.is_empty() && root.is_some() {
        return Err(AppError::MalformedXml(format!("第 {} 字节处出现第二个根元素", position)));
    }
    Ok(())
}

fn open_node(start: &BytesStart) -> Result<TreeNode, AppError> {
    let tag_name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    check_qname(&tag_name, "元素名")?;
    let mut node = TreeNode::new(tag_name);
    // attributes() 默认开启检查：重复属性、缺少引号都会报错
    for attr in start.attributes() {
        let attr = attr.map_err(|e| {
            AppError::MalformedXml(format!("元素 <{}> 的属性无效: {}", node.tag_name, e))
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        check_qname(&key, "属性名")?;
        if attr.value.contains(&b'<') {
            return Err(AppError::MalformedXml(format!("属性 {} 的值中不能出现 '<'", key)));
        }
        let value = attr
            .unescape_value()
            .map_err(|e| AppError::MalformedXml(format!("属性 {} 的值无效: {}", key, e)))?
            .into_owned();
        check_chars(&value, "属性值")?;
        node.attributes.push((key, value));
    }
    Ok(node)
}

/// XML 1.0 `Char`：制表、换行、回车以及 U+0020 之后除 U+FFFE/U+FFFF 外的字符
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r')
        || (c >= '\u{20}' && c != '\u{FFFE}' && c != '\u{FFFF}')
}

fn check_chars(content: &str, what: &str) -> Result<(), AppError> {
    match content.chars().find(|c| !is_xml_char(*c)) {
        Some(bad) => Err(AppError::MalformedXml(format!("{}中含有非法字符 U+{:04X}", what, bad as u32))),
        None => Ok(()),
    }
}

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c, '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

/// 不含冒号的名称（NCName）
fn is_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_name_start_char) && chars.all(is_name_char)
}

/// 带命名空间前缀的名称：`local` 或 `prefix:local`
fn check_qname(name: &str, what: &str) -> Result<(), AppError> {
    let valid = match name.split_once(':') {
        Some((prefix, local)) => is_ncname(prefix) && is_ncname(local),
        None => is_ncname(name),
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::MalformedXml(format!("{}不合法: {:?}", what, name)))
    }
}

fn attach(stack: &mut [OpenElement], root: &mut Option<TreeNode>, node: TreeNode) {
    match stack.last_mut() {
        Some(parent) => parent.node.children.push(node),
        None => *root = Some(node),
    }
}

fn push_text(stack: &mut [OpenElement], content: &str) -> Result<(), AppError> {
    match stack.last_mut() {
        Some(open) => {
            open.text.push_str(content);
            Ok(())
        }
        None if content.trim().is_empty() => Ok(()),
        None => Err(AppError::MalformedXml(format!(
            "根元素之外存在文本: {:?}",
            content.trim()
        ))),
    }
}

/// 将元素树回写为XML文本，`depth` 为起始缩进层级
///
/// 无子元素且无文本时输出自闭合标签；只有文本时输出单行；
/// 有子元素时文本（若有）单独占一行，排在子元素之前。
pub fn serialize_xml(node: &TreeNode, depth: usize) -> String {
    let mut out = String::new();
    write_node(&mut out, node, depth);
    out
}

fn write_node(out: &mut String, node: &TreeNode, depth: usize) {
    push_indent(out, depth);
    out.push('<');
    out.push_str(&node.tag_name);
    for (name, value) in &node.attributes {
        let _ = write!(out, " {}=\"{}\"", name, escape(value));
    }

    if node.children.is_empty() && node.text_content.is_empty() {
        out.push_str(" />");
        return;
    }

    out.push('>');
    if node.children.is_empty() {
        out.push_str(&partial_escape(&node.text_content));
    } else {
        out.push('\n');
        if !node.text_content.is_empty() {
            push_indent(out, depth + 1);
            out.push_str(&partial_escape(&node.text_content));
            out.push('\n');
        }
        for child in &node.children {
            write_node(out, child, depth + 1);
            out.push('\n');
        }
        push_indent(out, depth);
    }
    out.push_str("</");
    out.push_str(&node.tag_name);
    out.push('>');
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT_UNIT);
    }
}

/// 子树元素总数：1 + 各子元素的计数
pub fn count_nodes(node: &TreeNode) -> usize {
    1 + node.children.iter().map(count_nodes).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE catalog>
<catalog xmlns:x="urn:x" version="2">
  <!-- 注释会被丢弃 -->
  <book id="b1" lang="zh">三体 &amp; 续集</book>
  <book id="b2">
    <title>Rust</title>
    <x:price cur="&quot;USD&quot;">39.9</x:price>
  </book>
  <empty/>
  尾部文本
</catalog>"#;

    #[test]
    fn test_parse_structure() {
        let root = parse_xml(CATALOG).expect("解析应该成功");
        assert_eq!(root.tag_name, "catalog");
        assert_eq!(
            root.attributes,
            vec![
                ("xmlns:x".to_string(), "urn:x".to_string()),
                ("version".to_string(), "2".to_string())
            ],
            "属性应该保持书写顺序"
        );
        assert_eq!(root.children.len(), 3, "注释不应该成为子节点");
        assert_eq!(root.text_content, "尾部文本");

        let first = &root.children[0];
        assert_eq!(first.text_content, "三体 & 续集", "实体应该被还原");
        assert_eq!(first.attribute("lang"), Some("zh"));

        let price = &root.children[1].children[1];
        assert_eq!(price.tag_name, "x:price");
        assert_eq!(price.attribute("cur"), Some("\"USD\""));
        assert_eq!(price.text_content, "39.9");

        assert!(root.children[2].children.is_empty());
        assert!(root.children[2].text_content.is_empty());
    }

    #[test]
    fn test_parse_concatenates_direct_text() {
        let root = parse_xml("<p>  前 <b>粗</b> 后  </p>").unwrap();
        assert_eq!(root.text_content, "前  后", "只拼接直接文本子节点并裁剪首尾");
        assert_eq!(root.children[0].text_content, "粗");
    }

    #[test]
    fn test_parse_drops_cdata_sections() {
        // 只收集文本节点，CDATA 段不计入 text_content
        let root = parse_xml("<code>前<![CDATA[a < b]]>后</code>").unwrap();
        assert_eq!(root.text_content, "前后");
        let only_cdata = parse_xml("<code><![CDATA[x]]></code>").unwrap();
        assert!(only_cdata.text_content.is_empty());
        assert_eq!(serialize_xml(&only_cdata, 0), "<code />");
    }

    #[test]
    fn test_parse_accepts_valid_names_and_chars() {
        let root = parse_xml("<ns:文档 _a=\"1\" b-c.d=\"&#x9;值\">\t制表\r\n</ns:文档>").unwrap();
        assert_eq!(root.tag_name, "ns:文档");
        assert_eq!(root.attribute("b-c.d"), Some("\t值"));
        assert_eq!(root.text_content, "制表");
    }

    #[test]
    fn test_round_trip_is_structurally_equal() {
        let docs = [
            CATALOG,
            "<a/>",
            "<a><b><c>深</c></b><b x=\"1\"/></a>",
            "<r t=\"a &lt; b &amp; c\">1 &gt; 0</r>",
        ];
        for doc in docs {
            let tree = parse_xml(doc).unwrap();
            let again = parse_xml(&serialize_xml(&tree, 0)).expect("回写结果应该可以重新解析");
            assert_eq!(tree, again, "往返解析应该结构一致: {}", doc);
        }
    }

    #[test]
    fn test_serialize_self_closing_and_inline() {
        assert_eq!(serialize_xml(&TreeNode::new("x"), 0), "<x />");
        assert_eq!(serialize_xml(&TreeNode::new("x").with_text("hi"), 0), "<x>hi</x>");
        let with_attrs = TreeNode::new("x").with_attribute("b", "2").with_attribute("a", "1");
        assert_eq!(serialize_xml(&with_attrs, 0), r#"<x b="2" a="1" />"#);
    }

    #[test]
    fn test_serialize_nested_block() {
        let tree = TreeNode::new("root")
            .with_child(TreeNode::new("item").with_attribute("id", "1").with_text("一"))
            .with_child(TreeNode::new("group").with_child(TreeNode::new("leaf")));
        let expected = "<root>\n  <item id=\"1\">一</item>\n  <group>\n    <leaf />\n  </group>\n</root>";
        assert_eq!(serialize_xml(&tree, 0), expected);
        assert_eq!(tree.to_xml(), expected);
    }

    #[test]
    fn test_serialize_mixed_text_and_children() {
        // 文本单独一行，位于所有子元素之前
        let tree = TreeNode::new("a")
            .with_text("intro")
            .with_child(TreeNode::new("b"))
            .with_child(TreeNode::new("c").with_text("x"));
        assert_eq!(serialize_xml(&tree, 0), "<a>\n  intro\n  <b />\n  <c>x</c>\n</a>");
    }

    #[test]
    fn test_serialize_with_start_depth() {
        let tree = TreeNode::new("a").with_child(TreeNode::new("b"));
        assert_eq!(serialize_xml(&tree, 1), "  <a>\n    <b />\n  </a>");
    }

    #[test]
    fn test_serialize_escapes_values() {
        let tree = TreeNode::new("q")
            .with_attribute("say", "\"hi\" & bye")
            .with_text("1 < 2 & 3 > 2");
        assert_eq!(
            serialize_xml(&tree, 0),
            "<q say=\"&quot;hi&quot; &amp; bye\">1 &lt; 2 &amp; 3 &gt; 2</q>"
        );
    }

    #[test]
    fn test_malformed_inputs() {
        let cases = [
            "<a><b></a>",
            "<a>",
            "<a/><b/>",
            "</a>",
            "<a>x & y</a>",
            "<a x=\"1\" x=\"2\"/>",
            "文本<a/>",
            "",
            "<!-- 只有注释 -->",
            // 非法字符与名称
            "<a>\u{1}</a>",
            "<a>&#1;</a>",
            "<a x=\"&#0;\"/>",
            "<1a/>",
            "<-a/>",
            "<a 9x=\"1\"/>",
            "<a:b:c/>",
            "<:a/>",
            "<a>]]></a>",
            "<a x=\"<\"/>",
            "<![CDATA[x]]><a/>",
        ];
        for case in cases {
            let result = parse_xml(case);
            assert!(
                matches!(result, Err(AppError::MalformedXml(_))),
                "应该判定为不良构: {:?} -> {:?}",
                case,
                result
            );
        }
    }

    #[test]
    fn test_malformed_error_carries_diagnostic() {
        let err = parse_xml("<a><b></a>").unwrap_err();
        assert!(!err.to_string().is_empty(), "错误应该携带诊断信息");
    }

    #[test]
    fn test_count_nodes() {
        assert_eq!(count_nodes(&TreeNode::new("leaf")), 1, "叶子节点计数为1");
        let root = parse_xml(CATALOG).unwrap();
        assert_eq!(root.count_nodes(), 6);
        let expected = 1 + root.children.iter().map(count_nodes).sum::<usize>();
        assert_eq!(count_nodes(&root), expected);
    }
}
