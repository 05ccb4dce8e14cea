//! Minimal document model for served pages
//!
//! Served HTML is parsed leniently into a [`TreeNode`] tree, the shape the
//! page runtime loads and hands back after every event. A [`Document`]
//! flattens that tree into an element arena in document order with parent
//! links, attributes and rendered text, and carries a selector engine
//! supporting descendant chains of `tag`, `#id`, `.class` and `[attr]` /
//! `[attr=value]` parts.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!--.*?-->|<![^>]*>|<(/?)([A-Za-z][A-Za-z0-9-]*)([^>]*)>")
        .expect("tag pattern is valid")
});

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s=/"'>]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .expect("attribute pattern is valid")
});

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose body is not markup
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea"];

/// Elements whose text is never rendered
const UNRENDERED_TEXT: &[&str] = &["script", "style"];

/// A node of a page, as parsed or as read back from the live page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Text(String),
    Element {
        tag: String,
        #[serde(default)]
        attrs: Vec<(String, String)>,
        #[serde(default)]
        children: Vec<TreeNode>,
    },
}

/// A script the page runs on load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageScript {
    /// `<script src="...">`, fetched relative to the page
    External(String),
    Inline(String),
}

/// An element of a [`Document`]
#[derive(Debug, Clone)]
pub struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    parent: Option<usize>,
    text: String,
}

impl Element {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Text content with whitespace runs collapsed, as rendered
    pub fn text(&self) -> String {
        self.text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// A page: its node tree and the elements of that tree in document order
#[derive(Debug, Clone, Default)]
pub struct Document {
    roots: Vec<TreeNode>,
    elements: Vec<Element>,
}

impl Document {
    /// Parse HTML leniently; unknown or unbalanced markup never fails
    pub fn parse(html: &str) -> Self {
        Self::from_tree(parse_tree(html))
    }

    pub fn from_tree(roots: Vec<TreeNode>) -> Self {
        let mut elements = Vec::new();
        for node in &roots {
            flatten(node, None, &mut elements);
        }
        Self { roots, elements }
    }

    pub fn tree(&self) -> &[TreeNode] {
        &self.roots
    }

    /// Scripts in document order
    pub fn scripts(&self) -> Vec<PageScript> {
        fn collect(node: &TreeNode, out: &mut Vec<PageScript>) {
            let TreeNode::Element {
                tag,
                attrs,
                children,
            } = node
            else {
                return;
            };
            if tag == "script" {
                match attrs.iter().find(|(k, _)| k == "src") {
                    Some((_, src)) => out.push(PageScript::External(src.clone())),
                    None => {
                        let mut code = String::new();
                        for child in children {
                            if let TreeNode::Text(text) = child {
                                code.push_str(text);
                            }
                        }
                        out.push(PageScript::Inline(code));
                    }
                }
                return;
            }
            for child in children {
                collect(child, out);
            }
        }

        let mut scripts = Vec::new();
        for node in &self.roots {
            collect(node, &mut scripts);
        }
        scripts
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Element> {
        self.elements.get(idx)
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Element indices from the root down to `idx`, inclusive
    pub fn chain(&self, idx: usize) -> Vec<usize> {
        let mut chain = vec![idx];
        let mut cur = self.elements.get(idx).and_then(|e| e.parent);
        while let Some(p) = cur {
            chain.push(p);
            cur = self.elements[p].parent;
        }
        chain.reverse();
        chain
    }

    fn chain_elements(&self, idx: usize) -> Vec<&Element> {
        self.chain(idx)
            .into_iter()
            .map(|i| &self.elements[i])
            .collect()
    }

    pub fn query_all(&self, selector: &Selector) -> Vec<usize> {
        (0..self.elements.len())
            .filter(|&i| selector.matches(&self.chain_elements(i)))
            .collect()
    }

    pub fn query(&self, selector: &Selector) -> Option<usize> {
        (0..self.elements.len()).find(|&i| selector.matches(&self.chain_elements(i)))
    }
}

/// An element whose end tag has not been seen yet
struct OpenElement {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<TreeNode>,
}

impl OpenElement {
    fn close(self) -> TreeNode {
        TreeNode::Element {
            tag: self.tag,
            attrs: self.attrs,
            children: self.children,
        }
    }
}

/// Parse HTML into top-level nodes. Text outside any element is dropped.
pub fn parse_tree(html: &str) -> Vec<TreeNode> {
    let mut roots = Vec::new();
    let mut open: Vec<OpenElement> = Vec::new();
    let mut pos = 0;

    while let Some(caps) = TAG_RE.captures_at(html, pos) {
        let Some(whole) = caps.get(0) else { break };
        append_text(&mut open, &html[pos..whole.start()]);
        pos = whole.end();

        // Comments and doctype
        let Some(name) = caps.get(2) else { continue };
        let tag = name.as_str().to_ascii_lowercase();

        if caps.get(1).is_some_and(|c| c.as_str() == "/") {
            if let Some(depth) = open.iter().rposition(|e| e.tag == tag) {
                close_to(&mut roots, &mut open, depth);
            }
            continue;
        }

        let raw_attrs = caps.get(3).map_or("", |a| a.as_str());
        let self_closing = raw_attrs.trim_end().ends_with('/');
        let mut element = OpenElement {
            attrs: parse_attrs(raw_attrs),
            tag,
            children: Vec::new(),
        };

        if self_closing || VOID_ELEMENTS.contains(&element.tag.as_str()) {
            attach(&mut roots, &mut open, element.close());
            continue;
        }

        if RAW_TEXT_ELEMENTS.contains(&element.tag.as_str()) {
            let close = format!("</{}", element.tag);
            let body_end = html[pos..]
                .to_ascii_lowercase()
                .find(&close)
                .map_or(html.len(), |off| pos + off);
            let body = &html[pos..body_end];
            let text = if element.tag == "textarea" {
                decode_entities(body)
            } else {
                body.to_string()
            };
            if !text.is_empty() {
                element.children.push(TreeNode::Text(text));
            }
            attach(&mut roots, &mut open, element.close());
            pos = html[body_end..]
                .find('>')
                .map_or(html.len(), |off| body_end + off + 1);
            continue;
        }

        open.push(element);
    }

    append_text(&mut open, &html[pos.min(html.len())..]);
    close_to(&mut roots, &mut open, 0);
    roots
}

fn attach(roots: &mut Vec<TreeNode>, open: &mut [OpenElement], node: TreeNode) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

/// Close every open element from `depth` up
fn close_to(roots: &mut Vec<TreeNode>, open: &mut Vec<OpenElement>, depth: usize) {
    while open.len() > depth {
        let Some(element) = open.pop() else { break };
        attach(roots, open, element.close());
    }
}

fn append_text(open: &mut [OpenElement], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(parent) = open.last_mut() {
        parent.children.push(TreeNode::Text(decode_entities(text)));
    }
}

fn flatten(node: &TreeNode, parent: Option<usize>, elements: &mut Vec<Element>) {
    let TreeNode::Element {
        tag,
        attrs,
        children,
    } = node
    else {
        return;
    };

    let idx = elements.len();
    let mut text = String::new();
    for child in children {
        rendered_text(child, &mut text);
    }
    elements.push(Element {
        tag: tag.to_ascii_lowercase(),
        attrs: attrs
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
            .collect(),
        parent,
        text,
    });

    for child in children {
        flatten(child, Some(idx), elements);
    }
}

fn rendered_text(node: &TreeNode, out: &mut String) {
    match node {
        TreeNode::Text(text) => out.push_str(text),
        TreeNode::Element { tag, children, .. } => {
            if UNRENDERED_TEXT.contains(&tag.as_str()) {
                return;
            }
            for child in children {
                rendered_text(child, out);
            }
        }
    }
}

fn parse_attrs(raw: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(raw)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or(String::new(), |v| decode_entities(v.as_str()));
            Some((name, value))
        })
        .collect()
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

/// A descendant chain of compound selectors
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    source: String,
    parts: Vec<Compound>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl Selector {
    pub fn parse(source: &str) -> E2eResult<Self> {
        let invalid = |reason: &str| E2eError::Selector {
            selector: source.to_string(),
            reason: reason.to_string(),
        };

        if source.contains(['>', '+', '~', ',']) {
            return Err(invalid("only descendant combinators are supported"));
        }

        let parts = split_compounds(source)
            .into_iter()
            .map(|token| Compound::parse(&token).map_err(|reason| invalid(&reason)))
            .collect::<E2eResult<Vec<_>>>()?;

        if parts.is_empty() {
            return Err(invalid("empty selector"));
        }

        Ok(Self {
            source: source.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match against a node given its ancestor chain, root first, node last
    pub fn matches(&self, chain: &[&Element]) -> bool {
        let Some((node, mut ancestors)) = chain.split_last() else {
            return false;
        };
        let Some((last, rest)) = self.parts.split_last() else {
            return false;
        };
        if !last.matches(*node) {
            return false;
        }

        for part in rest.iter().rev() {
            match ancestors.iter().rposition(|n| part.matches(*n)) {
                Some(i) => ancestors = &ancestors[..i],
                None => return false,
            }
        }
        true
    }
}

/// Split on whitespace outside of `[...]`
fn split_compounds(source: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;

    for c in source.chars() {
        match c {
            '[' => {
                in_brackets = true;
                current.push(c);
            }
            ']' => {
                in_brackets = false;
                current.push(c);
            }
            c if c.is_whitespace() && !in_brackets => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

impl Compound {
    fn parse(token: &str) -> Result<Self, String> {
        let chars: Vec<char> = token.chars().collect();
        let mut compound = Compound::default();
        let mut i = 0;

        let read_ident = |i: &mut usize| -> String {
            let start = *i;
            while *i < chars.len() && is_ident_char(chars[*i]) {
                *i += 1;
            }
            chars[start..*i].iter().collect()
        };

        while i < chars.len() {
            match chars[i] {
                '*' => i += 1,
                '.' => {
                    i += 1;
                    let class = read_ident(&mut i);
                    if class.is_empty() {
                        return Err("empty class name".to_string());
                    }
                    compound.classes.push(class);
                }
                '#' => {
                    i += 1;
                    let id = read_ident(&mut i);
                    if id.is_empty() {
                        return Err("empty id".to_string());
                    }
                    compound.id = Some(id);
                }
                '[' => {
                    let Some(close) = chars[i..].iter().position(|&c| c == ']') else {
                        return Err("unterminated attribute selector".to_string());
                    };
                    let inner: String = chars[i + 1..i + close].iter().collect();
                    i += close + 1;

                    let (name, value) = match inner.split_once('=') {
                        Some((n, v)) => {
                            let v = v.trim().trim_matches(|c| c == '"' || c == '\'');
                            (n.trim().to_ascii_lowercase(), Some(v.to_string()))
                        }
                        None => (inner.trim().to_ascii_lowercase(), None),
                    };
                    if name.is_empty() {
                        return Err("empty attribute name".to_string());
                    }
                    compound.attrs.push((name, value));
                }
                c if is_ident_char(c) && compound.tag.is_none() && i == 0 => {
                    compound.tag = Some(read_ident(&mut i).to_ascii_lowercase());
                }
                c => return Err(format!("unexpected '{}'", c)),
            }
        }

        Ok(compound)
    }

    fn matches(&self, node: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if !node.tag().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if node.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| node.has_class(c)) {
            return false;
        }
        self.attrs.iter().all(|(name, value)| match (node.attr(name), value) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(actual), Some(expected)) => actual == expected,
        })
    }
}
