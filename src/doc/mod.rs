//! Canvas document model, markup parser, and markup renderer.
//!
//! The remote canvas arrives as HTML-like markup. Only headings, list items
//! (with their completion state), paragraphs, and dividers survive parsing;
//! every other element is treated as a transparent container.

pub type HeadingLevel = u8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Heading { level: HeadingLevel, text: String },
    ListItem { checked: bool, text: String },
    Paragraph { text: String },
    Divider,
}

/// Ordered sequence of canvas nodes. Order is significant and preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredDocument {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkupParseError {
    #[error("unterminated tag starting at byte {offset}")]
    UnterminatedTag { offset: usize },
    #[error("mismatched close tag: expected </{expected}>, found </{found}>")]
    MismatchedClose { expected: String, found: String },
    #[error("close tag </{tag}> has no matching open tag")]
    UnexpectedClose { tag: String },
    #[error("element <{tag}> is never closed")]
    Unclosed { tag: String },
}

impl StructuredDocument {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Reads canonical text back into nodes. Blank lines carry no structure
    /// and are skipped.
    pub fn from_canonical(text: &str) -> Self {
        let nodes = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(parse_canonical_line)
            .collect();
        Self { nodes }
    }
}

/// Classifies one trimmed, non-blank canonical line.
pub(crate) fn parse_canonical_line(line: &str) -> Node {
    match line {
        "---" => return Node::Divider,
        "- [ ]" | "- [x]" => {
            return Node::ListItem {
                checked: line == "- [x]",
                text: String::new(),
            };
        }
        _ => {}
    }
    if let Some(text) = line.strip_prefix("- [ ] ") {
        return Node::ListItem {
            checked: false,
            text: text.trim().to_string(),
        };
    }
    if let Some(text) = line.strip_prefix("- [x] ") {
        return Node::ListItem {
            checked: true,
            text: text.trim().to_string(),
        };
    }
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if (1..=6).contains(&hashes)
        && let Some(text) = line[hashes..].strip_prefix(' ')
    {
        return Node::Heading {
            level: hashes as HeadingLevel,
            text: text.trim().to_string(),
        };
    }
    Node::Paragraph {
        text: line.to_string(),
    }
}

pub struct MarkupParser;

impl MarkupParser {
    /// Parses canvas markup. An empty or whitespace-only payload yields an
    /// empty document.
    pub fn parse(markup: &str) -> Result<StructuredDocument, MarkupParseError> {
        if markup.trim().is_empty() {
            return Ok(StructuredDocument::new());
        }
        let tokens = tokenize(markup)?;
        let tree = build_tree(tokens)?;
        let mut nodes = Vec::new();
        collect_nodes(&tree, &mut nodes);
        Ok(StructuredDocument { nodes })
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "hr", "img", "input", "link", "meta", "wbr",
];

const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "code", "del", "em", "i", "mark", "s", "small", "span", "strike", "strong",
    "sub", "sup", "u",
];

// Tags whose end tag may be omitted.
const OPTIONAL_END: &[&str] = &["li", "p"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    Close {
        name: String,
    },
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Content>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Content {
    Element(Element),
    Text(String),
}

impl Element {
    fn new(name: String, attrs: Vec<(String, String)>) -> Self {
        Self {
            name,
            attrs,
            children: Vec::new(),
        }
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, MarkupParseError> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut index = 0;

    while index < input.len() {
        let rest = &input[index..];
        let Some(lt) = rest.find('<') else {
            text.push_str(rest);
            break;
        };
        text.push_str(&rest[..lt]);
        index += lt;
        let tag = &input[index..];

        if tag.starts_with("<!--") {
            let end = tag
                .find("-->")
                .ok_or(MarkupParseError::UnterminatedTag { offset: index })?;
            index += end + 3;
            continue;
        }

        let opens_tag = tag[1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'));
        if !opens_tag {
            // A bare '<' is text.
            text.push('<');
            index += 1;
            continue;
        }

        let end = find_tag_end(tag).ok_or(MarkupParseError::UnterminatedTag { offset: index })?;
        let inner = &tag[1..end];
        index += end + 1;

        if inner.starts_with('!') || inner.starts_with('?') {
            continue;
        }

        if !text.is_empty() {
            tokens.push(Token::Text(decode_entities(&text)));
            text.clear();
        }

        let token = parse_tag(inner);
        if let Token::Open {
            name,
            self_closing: false,
            ..
        } = &token
            && (name == "script" || name == "style")
        {
            // Raw text content is skipped up to the matching close tag.
            let closing = format!("</{name}");
            let skipped = input[index..]
                .to_ascii_lowercase()
                .find(&closing)
                .unwrap_or(input.len() - index);
            index += skipped;
        }
        tokens.push(token);
    }

    if !text.is_empty() {
        tokens.push(Token::Text(decode_entities(&text)));
    }
    Ok(tokens)
}

fn find_tag_end(tag: &str) -> Option<usize> {
    let mut quote = None;
    for (offset, c) in tag.char_indices().skip(1) {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(offset),
            None => {}
        }
    }
    None
}

fn parse_tag(inner: &str) -> Token {
    if let Some(name) = inner.strip_prefix('/') {
        return Token::Close {
            name: name.trim().to_ascii_lowercase(),
        };
    }

    let trimmed = inner.trim_end();
    let self_closing = trimmed.ends_with('/');
    let body = trimmed.trim_end_matches('/');
    let name_end = body
        .find(|c: char| c.is_whitespace())
        .unwrap_or(body.len());
    let name = body[..name_end].to_ascii_lowercase();
    let attrs = parse_attributes(&body[name_end..]);

    Token::Open {
        name,
        attrs,
        self_closing,
    }
}

fn parse_attributes(source: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut rest = source.trim_start();

    while !rest.is_empty() {
        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '=')
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_ascii_lowercase();
        rest = rest[name_end..].trim_start();

        let mut value = String::new();
        if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            match after_eq.chars().next() {
                Some(q @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    let close = body.find(q).unwrap_or(body.len());
                    value = decode_entities(&body[..close]);
                    rest = body.get(close + 1..).unwrap_or("");
                }
                _ => {
                    let end = after_eq
                        .find(char::is_whitespace)
                        .unwrap_or(after_eq.len());
                    value = decode_entities(&after_eq[..end]);
                    rest = &after_eq[end..];
                }
            }
        }

        if !name.is_empty() {
            attrs.push((name, value));
        }
        rest = rest.trim_start();
    }
    attrs
}

fn build_tree(tokens: Vec<Token>) -> Result<Vec<Content>, MarkupParseError> {
    let mut stack = vec![Element::new(String::new(), Vec::new())];

    for token in tokens {
        match token {
            Token::Text(text) => push_content(&mut stack, Content::Text(text)),
            Token::Open {
                name,
                attrs,
                self_closing,
            } => {
                close_implied_by(&mut stack, &name);
                let element = Element::new(name, attrs);
                if self_closing || VOID_ELEMENTS.contains(&element.name.as_str()) {
                    push_content(&mut stack, Content::Element(element));
                } else {
                    stack.push(element);
                }
            }
            Token::Close { name } => {
                if VOID_ELEMENTS.contains(&name.as_str()) {
                    continue;
                }
                if !stack[1..].iter().any(|open| open.name == name) {
                    return Err(MarkupParseError::UnexpectedClose { tag: name });
                }
                loop {
                    // The root never matches a tag name, so the stack holds
                    // at least two elements here.
                    let Some(top) = stack.pop() else {
                        return Err(MarkupParseError::UnexpectedClose { tag: name });
                    };
                    if top.name == name {
                        push_content(&mut stack, Content::Element(top));
                        break;
                    }
                    if !OPTIONAL_END.contains(&top.name.as_str()) {
                        return Err(MarkupParseError::MismatchedClose {
                            expected: top.name,
                            found: name,
                        });
                    }
                    push_content(&mut stack, Content::Element(top));
                }
            }
        }
    }

    while stack.len() > 1 {
        let Some(top) = stack.pop() else { break };
        if !OPTIONAL_END.contains(&top.name.as_str()) {
            return Err(MarkupParseError::Unclosed { tag: top.name });
        }
        push_content(&mut stack, Content::Element(top));
    }

    Ok(stack.pop().map(|root| root.children).unwrap_or_default())
}

/// Closes an open `<p>` before a block element, and an open `<li>` before
/// its sibling `<li>`.
fn close_implied_by(stack: &mut Vec<Element>, opening: &str) {
    while stack.len() > 1 {
        let implied = match stack.last().map(|top| top.name.as_str()) {
            Some("p") => is_block(opening),
            Some("li") => opening == "li",
            _ => false,
        };
        if !implied {
            break;
        }
        if let Some(top) = stack.pop() {
            push_content(stack, Content::Element(top));
        }
    }
}

fn is_block(name: &str) -> bool {
    heading_level(name).is_some()
        || matches!(
            name,
            "p" | "ul" | "ol" | "li" | "hr" | "div" | "section" | "table" | "blockquote" | "pre"
        )
}

fn push_content(stack: &mut [Element], content: Content) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(content);
    }
}

fn heading_level(name: &str) -> Option<HeadingLevel> {
    let digit = name.strip_prefix('h')?;
    match digit {
        "1" | "2" | "3" | "4" | "5" | "6" => digit.parse().ok(),
        _ => None,
    }
}

fn collect_nodes(contents: &[Content], out: &mut Vec<Node>) {
    let mut loose = String::new();

    for content in contents {
        let element = match content {
            Content::Text(text) => {
                loose.push_str(text);
                continue;
            }
            Content::Element(element) => element,
        };
        let name = element.name.as_str();

        if name == "br" {
            loose.push(' ');
            continue;
        }
        if INLINE_ELEMENTS.contains(&name) {
            append_visible_text(element, &mut loose);
            continue;
        }

        flush_loose_text(&mut loose, out);
        if let Some(level) = heading_level(name) {
            out.push(Node::Heading {
                level,
                text: visible_text(element),
            });
            continue;
        }
        match name {
            "li" => collect_list_item(element, out),
            "p" => out.push(Node::Paragraph {
                text: visible_text(element),
            }),
            "hr" => out.push(Node::Divider),
            "script" | "style" | "head" | "title" => {}
            _ => collect_nodes(&element.children, out),
        }
    }

    flush_loose_text(&mut loose, out);
}

fn flush_loose_text(loose: &mut String, out: &mut Vec<Node>) {
    let text = squash_whitespace(loose);
    if !text.is_empty() {
        out.push(Node::Paragraph { text });
    }
    loose.clear();
}

fn collect_list_item(item: &Element, out: &mut Vec<Node>) {
    let mut text = String::new();
    let mut nested = Vec::new();
    let mut checkbox = false;
    gather_item(item, &mut text, &mut nested, &mut checkbox);

    out.push(Node::ListItem {
        checked: item.has_class("checked") || checkbox,
        text: squash_whitespace(&text),
    });
    for list in nested {
        collect_nodes(&list.children, out);
    }
}

fn gather_item<'a>(
    element: &'a Element,
    text: &mut String,
    nested: &mut Vec<&'a Element>,
    checkbox: &mut bool,
) {
    for child in &element.children {
        match child {
            Content::Text(t) => text.push_str(t),
            Content::Element(child) => match child.name.as_str() {
                "ul" | "ol" => nested.push(child),
                "input" => {
                    let is_checkbox = child
                        .attr("type")
                        .is_some_and(|kind| kind.eq_ignore_ascii_case("checkbox"));
                    if is_checkbox && child.attr("checked").is_some() {
                        *checkbox = true;
                    }
                }
                "br" => text.push(' '),
                "script" | "style" => {}
                name if INLINE_ELEMENTS.contains(&name) => {
                    gather_item(child, text, nested, checkbox);
                }
                _ => {
                    text.push(' ');
                    gather_item(child, text, nested, checkbox);
                    text.push(' ');
                }
            },
        }
    }
}

fn visible_text(element: &Element) -> String {
    let mut text = String::new();
    append_visible_text(element, &mut text);
    squash_whitespace(&text)
}

fn append_visible_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            Content::Text(text) => out.push_str(text),
            Content::Element(child) => match child.name.as_str() {
                "br" => out.push(' '),
                "script" | "style" => {}
                name if INLINE_ELEMENTS.contains(&name) => append_visible_text(child, out),
                _ => {
                    out.push(' ');
                    append_visible_text(child, out);
                    out.push(' ');
                }
            },
        }
    }
}

fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        output.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let decoded = candidate
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&candidate[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                output.push(c);
                rest = &candidate[semi + 1..];
            }
            None => {
                output.push('&');
                rest = &candidate[1..];
            }
        }
    }
    output.push_str(rest);
    output
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

fn escape_text(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            other => output.push(other),
        }
    }
    output
}

/// Renders a document as canvas markup. Consecutive list items share one
/// `<ul>`.
pub fn render_markup(doc: &StructuredDocument) -> String {
    let mut output = String::new();
    let mut in_list = false;

    for node in doc.nodes() {
        let is_item = matches!(node, Node::ListItem { .. });
        if in_list && !is_item {
            output.push_str("</ul>\n");
            in_list = false;
        }
        match node {
            Node::Heading { level, text } => {
                output.push_str(&format!("<h{level}>{}</h{level}>\n", escape_text(text)));
            }
            Node::ListItem { checked, text } => {
                if !in_list {
                    output.push_str("<ul>\n");
                    in_list = true;
                }
                if *checked {
                    output.push_str(&format!("<li class=\"checked\">{}</li>\n", escape_text(text)));
                } else {
                    output.push_str(&format!("<li>{}</li>\n", escape_text(text)));
                }
            }
            Node::Paragraph { text } => {
                output.push_str(&format!("<p>{}</p>\n", escape_text(text)));
            }
            Node::Divider => output.push_str("<hr>\n"),
        }
    }
    if in_list {
        output.push_str("</ul>\n");
    }
    output
}
