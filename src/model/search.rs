//! 面板内搜索：匹配规则与结果游标
//!
//! 匹配规则：逐字符忽略大小写（Unicode 小写折叠）的子串匹配，
//! 从左到右扫描，匹配之间不重叠。

use std::ops::Range;

/// 在 `haystack` 中查找 `query` 的所有匹配，返回原文中的字节区间
pub fn find_matches(haystack: &str, query: &str) -> Vec<Range<usize>> {
    let mut matches = Vec::new();
    if query.is_empty() {
        return matches;
    }
    let needle: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();

    let mut start = 0;
    while start < haystack.len() {
        match match_at(&haystack[start..], &needle) {
            Some(len) => {
                matches.push(start..start + len);
                start += len;
            }
            None => {
                // 前进一个字符（保持在字符边界上）
                let step = haystack[start..].chars().next().map_or(1, char::len_utf8);
                start += step;
            }
        }
    }
    matches
}

/// 匹配数量
pub fn count_matches(haystack: &str, query: &str) -> usize {
    find_matches(haystack, query).len()
}

/// 匹配所在的行：行号从1开始，`line` 为整行原文（不含换行符）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchLine<'a> {
    pub line_no: usize,
    pub line: &'a str,
}

/// 为按起点升序排列的匹配区间定位所在行，整段文本只扫描一遍
pub fn match_lines<'a>(haystack: &'a str, matches: &[Range<usize>]) -> Vec<MatchLine<'a>> {
    let mut out = Vec::with_capacity(matches.len());
    let mut line_no = 1;
    let mut line_start = 0;
    let mut line_end = None;
    let mut scanned = 0;
    for range in matches {
        if range.start > scanned {
            let skipped = &haystack[scanned..range.start];
            if let Some(last) = skipped.rfind('\n') {
                line_no += skipped.bytes().filter(|b| *b == b'\n').count();
                line_start = scanned + last + 1;
                line_end = None;
            }
            scanned = range.start;
        }
        // 同一行上的多个匹配共用一次行尾查找
        let end = *line_end.get_or_insert_with(|| {
            haystack[line_start..].find('\n').map_or(haystack.len(), |i| line_start + i)
        });
        out.push(MatchLine { line_no, line: &haystack[line_start..end] });
    }
    out
}

/// 若 `text` 以 needle 开头（忽略大小写），返回消耗的字节数
fn match_at(text: &str, needle: &[char]) -> Option<usize> {
    let mut pending = needle.iter();
    let mut consumed = 0;
    let mut folded = Vec::with_capacity(2);
    for ch in text.chars() {
        folded.clear();
        folded.extend(ch.to_lowercase());
        for f in &folded {
            if pending.next() != Some(f) {
                return None;
            }
        }
        consumed += ch.len_utf8();
        if pending.as_slice().is_empty() {
            return Some(consumed);
        }
    }
    None
}

/// 已提交查询的结果游标：下标从0开始，前后翻页按总数取模回绕
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchCursor {
    pub current: usize,
    pub total: usize,
}

impl SearchCursor {
    pub fn new(total: usize) -> Self {
        Self { current: 0, total }
    }

    /// 内容变化后重新计数：原下标仍然有效则保留，否则归零
    pub fn rescan(self, total: usize) -> Self {
        let current = if self.current < total { self.current } else { 0 };
        Self { current, total }
    }

    pub fn next(self) -> Self {
        if self.total == 0 {
            return self;
        }
        Self {
            current: (self.current + 1) % self.total,
            ..self
        }
    }

    pub fn previous(self) -> Self {
        if self.total == 0 {
            return self;
        }
        Self {
            current: (self.current + self.total - 1) % self.total,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_substring() {
        let text = "Name: name, NAME!";
        assert_eq!(find_matches(text, "name"), vec![0..4, 6..10, 12..16]);
        assert_eq!(count_matches(text, "NaMe"), 3);
    }

    #[test]
    fn test_non_overlapping_left_to_right() {
        assert_eq!(find_matches("aaaa", "aa"), vec![0..2, 2..4], "匹配之间不应该重叠");
        assert_eq!(count_matches("aaa", "aa"), 1);
    }

    #[test]
    fn test_unicode_offsets() {
        let text = "张三和张三丰";
        let ranges = find_matches(text, "张三");
        assert_eq!(ranges.len(), 2);
        for r in ranges {
            assert_eq!(&text[r], "张三", "区间应该落在字符边界上");
        }
        assert_eq!(count_matches("ÄPFEL äpfel", "äpfel"), 2);
    }

    #[test]
    fn test_empty_query_or_no_match() {
        assert!(find_matches("anything", "").is_empty(), "空查询没有匹配");
        assert_eq!(count_matches("abc", "abcd"), 0);
        assert_eq!(count_matches("", "a"), 0);
    }

    #[test]
    fn test_match_lines() {
        let text = "first Key\nnothing\nkey key\r\n\nlast KEY";
        let ranges = find_matches(text, "key");
        let lines = match_lines(text, &ranges);
        let got: Vec<(usize, &str)> = lines.iter().map(|m| (m.line_no, m.line)).collect();
        assert_eq!(
            got,
            vec![(1, "first Key"), (3, "key key\r"), (3, "key key\r"), (5, "last KEY")],
            "行号应该从1开始，同一行的多个匹配各占一条"
        );
        assert!(match_lines(text, &[]).is_empty());
    }

    #[test]
    fn test_match_lines_large_document() {
        let text = "x\n".repeat(20_000) + "目标";
        let ranges = find_matches(&text, "目标");
        let lines = match_lines(&text, &ranges);
        assert_eq!(lines, vec![MatchLine { line_no: 20_001, line: "目标" }]);
    }

    #[test]
    fn test_cursor_wraps() {
        let cursor = SearchCursor::new(3);
        assert_eq!(cursor.next().next().next().current, 0, "向后翻页应该回绕");
        assert_eq!(cursor.previous().current, 2, "向前翻页应该回绕到末尾");
        let empty = SearchCursor::new(0);
        assert_eq!(empty.next(), empty, "没有匹配时翻页无效");
        assert_eq!(empty.previous(), empty);
    }

    #[test]
    fn test_cursor_rescan() {
        let cursor = SearchCursor { current: 2, total: 5 };
        assert_eq!(cursor.rescan(4).current, 2, "仍在范围内则保留");
        assert_eq!(cursor.rescan(2).current, 0, "超出范围则归零");
        assert_eq!(cursor.rescan(0), SearchCursor::default());
    }
}
