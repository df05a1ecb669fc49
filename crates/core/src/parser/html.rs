//! Just enough HTML handling to scrape SMF markup.
//!
//! Elements are located by tag and balanced against their closing tag; there
//! is no DOM. Markup that SMF emits is regular enough for this to hold.

use std::sync::LazyLock;

use regex::Regex;

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9]*)\b[^>]*?(/?)>").expect("TAG regex should compile"));
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("ATTRIBUTE regex should compile")
});
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</(?:p|div|li|dd|dt|h[1-6])>").expect("LINE_BREAK regex should compile"));
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("ANY_TAG regex should compile"));
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:[xX]([0-9a-fA-F]+)|([0-9]+));").expect("NUMERIC_ENTITY regex should compile"));
static MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("MULTI_SPACE regex should compile"));
static MULTI_NEWLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\n\s*").expect("MULTI_NEWLINE regex should compile"));

const VOID_TAGS: &[&str] = &["area", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "wbr"];

/// One element of a document, borrowed from the source text.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Element<'a> {
    /// Opening tag including `<` and `>`.
    pub open: &'a str,
    /// Everything between the opening and closing tags.
    pub inner: &'a str,
    /// Byte offset of the element start in the searched text.
    pub start: usize,
    /// Byte offset just past the element end in the searched text.
    pub end: usize,
}

impl<'a> Element<'a> {
    /// Decoded value of attribute `name`.
    pub fn attr(&self, name: &str) -> Option<String> {
        attributes(self.open)
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    pub fn id(&self) -> Option<String> {
        self.attr("id")
    }

    /// Returns `true` if `class` is one of the element's classes.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Returns `true` if any class contains `fragment`.
    pub fn class_contains(&self, fragment: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c.contains(fragment)))
    }

    /// Visible text of the element.
    pub fn text(&self) -> String {
        html_to_text(self.inner)
    }

    /// Raw inner markup, trimmed.
    pub fn html(&self) -> &'a str {
        self.inner.trim()
    }

    /// Descendants with tag `tag`, in document order.
    pub fn children(self, tag: &'a str) -> impl Iterator<Item = Element<'a>> + 'a {
        elements(self.inner, tag)
    }

    /// First descendant with tag `tag` matching `pred`.
    pub fn find(self, tag: &'a str, pred: impl Fn(&Element<'a>) -> bool) -> Option<Element<'a>> {
        self.children(tag).find(|element| pred(element))
    }

    /// First descendant `tag` with class `class`.
    pub fn find_class(self, tag: &'a str, class: &str) -> Option<Element<'a>> {
        self.find(tag, |element| element.has_class(class))
    }

    /// First descendant with tag `tag`.
    pub fn first(self, tag: &'a str) -> Option<Element<'a>> {
        self.children(tag).next()
    }
}

/// All elements with tag `tag` in `html`, outer before inner.
pub(crate) fn elements<'a>(html: &'a str, tag: &'a str) -> impl Iterator<Item = Element<'a>> + 'a {
    TAG.captures_iter(html).filter_map(move |captures| {
        let whole = captures.get(0)?;
        let is_close = !captures[1].is_empty();
        if is_close || !captures[2].eq_ignore_ascii_case(tag) {
            return None;
        }
        let self_closing = !captures[3].is_empty() || VOID_TAGS.iter().any(|void| void.eq_ignore_ascii_case(tag));
        if self_closing {
            return Some(Element {
                open: whole.as_str(),
                inner: "",
                start: whole.start(),
                end: whole.end(),
            });
        }
        let (inner_end, end) = closing_tag(html, whole.end(), tag);
        Some(Element {
            open: whole.as_str(),
            inner: &html[whole.end()..inner_end],
            start: whole.start(),
            end,
        })
    })
}

/// Finds the end of the element whose opening tag ends at `from`.
///
/// Returns the offset of the closing tag and the offset past it. An unclosed
/// element runs to the end of the text.
fn closing_tag(html: &str, from: usize, tag: &str) -> (usize, usize) {
    let mut depth = 1usize;
    for captures in TAG.captures_iter(&html[from..]) {
        if !captures[2].eq_ignore_ascii_case(tag) || !captures[3].is_empty() {
            continue;
        }
        let Some(whole) = captures.get(0) else {
            continue;
        };
        if captures[1].is_empty() {
            depth += 1;
        } else {
            depth -= 1;
            if depth == 0 {
                return (from + whole.start(), from + whole.end());
            }
        }
    }
    (html.len(), html.len())
}

/// First element `tag` whose id is `id`.
pub(crate) fn find_by_id<'a>(html: &'a str, tag: &'a str, id: &str) -> Option<Element<'a>> {
    elements(html, tag).find(|element| element.id().as_deref() == Some(id))
}

/// First element `tag` with class `class`.
pub(crate) fn find_by_class<'a>(html: &'a str, tag: &'a str, class: &str) -> Option<Element<'a>> {
    elements(html, tag).find(|element| element.has_class(class))
}

/// Attribute names and decoded values of an opening tag.
pub(crate) fn attributes(open: &str) -> impl Iterator<Item = (String, String)> + '_ {
    // Skip the tag name so `<a href=...>` does not match on `a`.
    let body = open
        .trim_start_matches('<')
        .split_once(char::is_whitespace)
        .map_or("", |(_, rest)| rest);
    ATTRIBUTE.captures_iter(body).map(|captures| {
        let value = captures
            .get(2)
            .or_else(|| captures.get(3))
            .or_else(|| captures.get(4))
            .map_or("", |m| m.as_str());
        (captures[1].to_string(), decode_html_entities(value))
    })
}

/// Decodes named entities common in SMF output and all numeric references.
pub(crate) fn decode_html_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let numeric = NUMERIC_ENTITY.replace_all(s, |captures: &regex::Captures<'_>| {
        let code = match (captures.get(1), captures.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse().ok(),
            _ => None,
        };
        code.and_then(char::from_u32).map(String::from).unwrap_or_default()
    });
    numeric
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&raquo;", "\u{bb}")
        .replace("&laquo;", "\u{ab}")
        .replace("&amp;", "&")
}

/// Collapses runs of spaces and blank lines.
pub(crate) fn collapse_whitespace(s: &str) -> String {
    let result = MULTI_SPACE.replace_all(s, " ");
    MULTI_NEWLINE.replace_all(&result, "\n").trim().to_string()
}

/// Visible text of a markup fragment: line breaks kept, tags dropped.
pub(crate) fn html_to_text(html: &str) -> String {
    let with_breaks = LINE_BREAK.replace_all(html, "\n");
    let stripped = ANY_TAG.replace_all(&with_breaks, "");
    collapse_whitespace(&decode_html_entities(&stripped))
}
