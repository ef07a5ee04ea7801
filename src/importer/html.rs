// ==========================================
// 商品同步连接器 - HTML 处理
// ==========================================
// html_to_text: 去除全部标记（图片丢弃，链接只保留文字）
// sanitize_html: 保留结构，只去除 xml:lang 属性
// ==========================================

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static SCRIPT_STYLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("valid regex")
});
static IMG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<img\b[^>]*>").expect("valid regex"));
static BREAK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|li|h[1-6]|tr)\s*>").expect("valid regex")
});
static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new("<[^>]*>").expect("valid regex"));
static XML_LANG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\s+xml:lang\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).expect("valid regex")
});

/// HTML → 纯文本
pub fn html_to_text(content: &str) -> String {
    if content.trim().is_empty() {
        return String::new();
    }
    let text = SCRIPT_STYLE_RE.replace_all(content, "");
    let text = IMG_RE.replace_all(&text, "");
    let text = BREAK_RE.replace_all(&text, "\n");
    let text = HTML_TAG_RE.replace_all(&text, "");
    let text = decode_entities(&text);

    let lines: Vec<String> = text
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();

    // 连续空行合并为一行
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    for line in &lines {
        if line.is_empty() && out.last().map_or(true, |prev| prev.is_empty()) {
            continue;
        }
        out.push(line);
    }
    out.join("\n").trim().to_string()
}

/// 去除 xml:lang 属性（lang 属性保留）
pub fn sanitize_html(content: &str) -> Cow<'_, str> {
    if XML_LANG_RE.is_match(content) {
        Cow::Owned(XML_LANG_RE.replace_all(content, "").to_string())
    } else {
        Cow::Borrowed(content)
    }
}

fn decode_entities(input: &str) -> String {
    input
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
