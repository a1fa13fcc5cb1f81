//! Markup fragment parser.
//!
//! A hand-rolled, forgiving parser for the HTML-ish markup component
//! render functions produce. It never fails: any input yields a node
//! tree. Recovery rules:
//!
//! - A `<` not followed by a letter, `/` or `!` is literal text.
//! - A close tag with no matching open tag on the stack is dropped.
//! - A close tag matching a non-innermost open tag closes everything up
//!   to and including it (misnested tags cannot escape their ancestors).
//! - Unclosed tags are closed at end of input.
//! - Void elements (`br`, `img`, ...) and `/>` self-closing syntax never
//!   take children.
//!
//! Tag and attribute names are lowercased, matching host-platform
//! behavior for HTML documents. Entities `&amp; &lt; &gt; &quot; &#39;`
//! are decoded in text and attribute values.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// A parsed node, not yet part of any document.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedNode {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<ParsedNode>,
    },
    Text(String),
    Comment(String),
}

static VOID_ELEMENTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
        "track", "wbr",
    ]
    .into_iter()
    .collect()
});

pub(crate) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(tag)
}

/// Parses a markup fragment into a list of top-level nodes.
pub fn parse_fragment(input: &str) -> Vec<ParsedNode> {
    Parser::new(input).run()
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// Open-element stack: (tag, attrs, children).
    stack: Vec<(String, Vec<(String, String)>, Vec<ParsedNode>)>,
    top: Vec<ParsedNode>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Parser {
            bytes: input.as_bytes(),
            pos: 0,
            stack: Vec::new(),
            top: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<ParsedNode> {
        let mut text_start = self.pos;
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] != b'<' {
                self.pos += 1;
                continue;
            }
            let next = self.bytes.get(self.pos + 1).copied();
            let starts_markup = matches!(next, Some(c) if c.is_ascii_alphabetic() || c == b'/' || c == b'!');
            if !starts_markup {
                self.pos += 1;
                continue;
            }
            self.flush_text(text_start, self.pos);
            if self.bytes[self.pos + 1] == b'!' {
                self.comment();
            } else if self.bytes[self.pos + 1] == b'/' {
                self.close_tag();
            } else {
                self.open_tag();
            }
            text_start = self.pos;
        }
        self.flush_text(text_start, self.bytes.len());

        // Close anything left open at end of input.
        while let Some((tag, attrs, children)) = self.stack.pop() {
            self.append(ParsedNode::Element { tag, attrs, children });
        }
        self.top
    }

    fn flush_text(&mut self, start: usize, end: usize) {
        if start < end {
            let raw = std::str::from_utf8(&self.bytes[start..end]).unwrap_or_default();
            self.append(ParsedNode::Text(unescape(raw)));
        }
    }

    fn append(&mut self, node: ParsedNode) {
        match self.stack.last_mut() {
            Some((_, _, children)) => children.push(node),
            None => self.top.push(node),
        }
    }

    fn comment(&mut self) {
        // pos is at "<!". Only "<!--" starts a comment; anything else
        // (doctype and friends) is skipped to the next '>'.
        if self.bytes[self.pos..].starts_with(b"<!--") {
            let body_start = self.pos + 4;
            let end = find(self.bytes, body_start, b"-->");
            let body = std::str::from_utf8(&self.bytes[body_start..end]).unwrap_or_default();
            self.append(ParsedNode::Comment(body.to_string()));
            self.pos = (end + 3).min(self.bytes.len());
        } else {
            let end = find(self.bytes, self.pos, b">");
            self.pos = (end + 1).min(self.bytes.len());
        }
    }

    fn close_tag(&mut self) {
        self.pos += 2; // consume "</"
        let tag = self.tag_name();
        let end = find(self.bytes, self.pos, b">");
        self.pos = (end + 1).min(self.bytes.len());

        if !self.stack.iter().any(|(t, _, _)| *t == tag) {
            return; // stray close tag
        }
        loop {
            let (t, attrs, children) = self.stack.pop().expect("tag is on the stack");
            let done = t == tag;
            self.append(ParsedNode::Element { tag: t, attrs, children });
            if done {
                break;
            }
        }
    }

    fn open_tag(&mut self) {
        self.pos += 1; // consume '<'
        let tag = self.tag_name();
        let mut attrs = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            match self.bytes.get(self.pos).copied() {
                None => break,
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') => {
                    self.pos += 1;
                    if self.bytes.get(self.pos) == Some(&b'>') {
                        self.pos += 1;
                        self_closing = true;
                        break;
                    }
                }
                Some(_) => {
                    if let Some(attr) = self.attribute() {
                        attrs.push(attr);
                    }
                }
            }
        }

        if self_closing || is_void(&tag) {
            self.append(ParsedNode::Element { tag, attrs, children: Vec::new() });
        } else {
            self.stack.push((tag, attrs, Vec::new()));
        }
    }

    fn tag_name(&mut self) -> String {
        let start = self.pos;
        while let Some(&c) = self.bytes.get(self.pos) {
            if c.is_ascii_alphanumeric() || c == b'-' || c == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .unwrap_or_default()
            .to_ascii_lowercase()
    }

    fn attribute(&mut self) -> Option<(String, String)> {
        let start = self.pos;
        while let Some(&c) = self.bytes.get(self.pos) {
            if c.is_ascii_whitespace() || c == b'=' || c == b'>' || c == b'/' {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            self.pos += 1; // unexpected byte, skip it
            return None;
        }
        let name = std::str::from_utf8(&self.bytes[start..self.pos])
            .unwrap_or_default()
            .to_ascii_lowercase();

        self.skip_whitespace();
        if self.bytes.get(self.pos) != Some(&b'=') {
            return Some((name, String::new())); // bare attribute
        }
        self.pos += 1;
        self.skip_whitespace();

        let value = match self.bytes.get(self.pos).copied() {
            Some(q @ (b'"' | b'\'')) => {
                self.pos += 1;
                let vstart = self.pos;
                while self.pos < self.bytes.len() && self.bytes[self.pos] != q {
                    self.pos += 1;
                }
                let raw = std::str::from_utf8(&self.bytes[vstart..self.pos]).unwrap_or_default();
                self.pos = (self.pos + 1).min(self.bytes.len());
                unescape(raw)
            }
            _ => {
                let vstart = self.pos;
                while let Some(&c) = self.bytes.get(self.pos) {
                    if c.is_ascii_whitespace() || c == b'>' {
                        break;
                    }
                    self.pos += 1;
                }
                let raw = std::str::from_utf8(&self.bytes[vstart..self.pos]).unwrap_or_default();
                unescape(raw)
            }
        };
        Some((name, value))
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.bytes.get(self.pos), Some(c) if c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> usize {
    let mut i = from;
    while i + needle.len() <= bytes.len() {
        if &bytes[i..i + needle.len()] == needle {
            return i;
        }
        i += 1;
    }
    bytes.len()
}

fn unescape(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let mut replaced = false;
        for (entity, ch) in [
            ("&amp;", '&'),
            ("&lt;", '<'),
            ("&gt;", '>'),
            ("&quot;", '"'),
            ("&#39;", '\''),
        ] {
            if rest.starts_with(entity) {
                out.push(ch);
                rest = &rest[entity.len()..];
                replaced = true;
                break;
            }
        }
        if !replaced {
            out.push('&');
            rest = &rest[1..];
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(tag: &str) -> ParsedNode {
        ParsedNode::Element { tag: tag.into(), attrs: vec![], children: vec![] }
    }

    #[test]
    fn plain_text() {
        assert_eq!(parse_fragment("hello"), vec![ParsedNode::Text("hello".into())]);
    }

    #[test]
    fn nested_elements() {
        let nodes = parse_fragment("<div><span>x</span></div>");
        assert_eq!(
            nodes,
            vec![ParsedNode::Element {
                tag: "div".into(),
                attrs: vec![],
                children: vec![ParsedNode::Element {
                    tag: "span".into(),
                    attrs: vec![],
                    children: vec![ParsedNode::Text("x".into())],
                }],
            }]
        );
    }

    #[test]
    fn attribute_forms() {
        let nodes = parse_fragment(r#"<div a="1" b='two' c=3 disabled></div>"#);
        let ParsedNode::Element { attrs, .. } = &nodes[0] else { panic!() };
        assert_eq!(
            attrs,
            &vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "two".to_string()),
                ("c".to_string(), "3".to_string()),
                ("disabled".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn void_and_self_closing() {
        let nodes = parse_fragment("<br><input type=\"text\"><x-thing/>");
        assert_eq!(nodes.len(), 3);
        for n in &nodes {
            let ParsedNode::Element { children, .. } = n else { panic!() };
            assert!(children.is_empty());
        }
    }

    #[test]
    fn comments_round_trip() {
        let nodes = parse_fragment("a<!--marker-7-->b");
        assert_eq!(nodes[1], ParsedNode::Comment("marker-7".into()));
    }

    #[test]
    fn stray_close_tag_is_dropped() {
        let nodes = parse_fragment("x</div>y");
        assert_eq!(
            nodes,
            vec![ParsedNode::Text("x".into()), ParsedNode::Text("y".into())]
        );
    }

    #[test]
    fn unclosed_tags_close_at_end() {
        let nodes = parse_fragment("<div><span>x");
        let ParsedNode::Element { tag, children, .. } = &nodes[0] else { panic!() };
        assert_eq!(tag, "div");
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn misnested_close_pops_through() {
        // </div> closes the span too.
        let nodes = parse_fragment("<div><span>a</div>b");
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1], ParsedNode::Text("b".into()));
    }

    #[test]
    fn lone_angle_bracket_is_text() {
        let nodes = parse_fragment("1 < 2");
        assert_eq!(nodes, vec![ParsedNode::Text("1 < 2".into())]);
    }

    #[test]
    fn entities_decoded() {
        let nodes = parse_fragment("<div t=\"&quot;ok&quot;\">&lt;b&gt;&amp;</div>");
        let ParsedNode::Element { attrs, children, .. } = &nodes[0] else { panic!() };
        assert_eq!(attrs[0].1, "\"ok\"");
        assert_eq!(children[0], ParsedNode::Text("<b>&".into()));
    }

    #[test]
    fn tag_names_lowercased() {
        let nodes = parse_fragment("<DIV Foo=\"1\"></DIV>");
        let ParsedNode::Element { tag, attrs, .. } = &nodes[0] else { panic!() };
        assert_eq!(tag, "div");
        assert_eq!(attrs[0].0, "foo");
    }

    #[test]
    fn custom_tags_keep_hyphens() {
        let nodes = parse_fragment("<x-foo></x-foo>");
        assert_eq!(nodes, vec![el("x-foo")]);
    }
}
