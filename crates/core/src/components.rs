//! Documentation component catalog.
//!
//! Each known component name maps to a [`ComponentKind`], and every kind has
//! exactly one rewrite rule turning an [`Invocation`] into plain Markdown
//! nodes. Rules always produce block nodes; callers splice a rule's
//! paragraphs back into surrounding inline content when the component was
//! written inline.

use std::collections::BTreeMap;

use markdown::mdast::{
    AttributeContent, AttributeValue, Blockquote, Heading, Image, InlineCode, Link, List,
    ListItem, Node, Paragraph, Strong, Text,
};

/// Rewrite category of a component name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// `Note`, `Tip`, `Warning`, `Info`, `Callout`.
    Callout,
    /// `Card`.
    Card,
    /// Layout wrappers that only group their children.
    Container,
    /// `Step`.
    Step,
    /// `Property`.
    Property,
    /// `GuideSection`.
    GuideSection,
    /// `GuideTitle`.
    GuideTitle,
    /// `Button`.
    Button,
    /// `Accordion`.
    Accordion,
    /// Intrinsic `a` element.
    Anchor,
    /// Intrinsic `img` element.
    Image,
    /// Any other named component.
    Unknown,
    /// `<>...</>`.
    Fragment,
}

impl ComponentKind {
    /// Classifies a component by its tag name.
    pub fn classify(name: Option<&str>) -> Self {
        let Some(name) = name else {
            return Self::Fragment;
        };
        match name {
            "Note" | "Tip" | "Warning" | "Info" | "Callout" => Self::Callout,
            "Card" => Self::Card,
            "CardGroup" | "CodeGroup" | "Steps" | "Properties" | "Row" | "Col"
            | "GuideSelector" | "AccordionGroup" | "Tabs" | "Tab" => Self::Container,
            "Step" => Self::Step,
            "Property" => Self::Property,
            "GuideSection" => Self::GuideSection,
            "GuideTitle" => Self::GuideTitle,
            "Button" => Self::Button,
            "Accordion" => Self::Accordion,
            "a" => Self::Anchor,
            "img" => Self::Image,
            _ => Self::Unknown,
        }
    }
}

/// Attribute values of one invocation that resolve to plain strings.
///
/// Boolean attributes, spreads and non-literal expressions are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    /// Collects resolvable attributes; later duplicates win.
    pub fn from_mdx(attributes: &[AttributeContent]) -> Self {
        let mut map = BTreeMap::new();
        for attribute in attributes {
            let AttributeContent::Property(property) = attribute else {
                continue;
            };
            let resolved = match &property.value {
                Some(AttributeValue::Literal(value)) => Some(value.clone()),
                Some(AttributeValue::Expression(expression)) => literal_value(&expression.value),
                None => None,
            };
            match resolved {
                Some(value) => {
                    map.insert(property.name.clone(), value);
                }
                None => {
                    map.remove(&property.name);
                }
            }
        }
        Self(map)
    }

    /// Non-empty value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A component tag with its already-transformed children.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Tag name; `None` for fragments.
    pub name: Option<String>,
    /// Resolved attributes.
    pub attributes: Attributes,
    /// Children, transformed depth-first.
    pub children: Vec<Node>,
}

impl Invocation {
    /// Category of this invocation.
    pub fn kind(&self) -> ComponentKind {
        ComponentKind::classify(self.name.as_deref())
    }

    /// Trimmed plain-text content of the children.
    pub fn text(&self) -> String {
        text_content(&self.children).trim().to_string()
    }

    /// Applies the catalog rule for this invocation.
    pub fn rewrite(self) -> Vec<Node> {
        match self.kind() {
            ComponentKind::Callout => self.rewrite_callout(),
            ComponentKind::Card => self.rewrite_card(),
            ComponentKind::Container | ComponentKind::Fragment => self.children,
            ComponentKind::Step => self.titled(3, "title"),
            ComponentKind::Accordion => self.titled(4, "title"),
            ComponentKind::Property => self.rewrite_property(),
            ComponentKind::GuideSection => self.rewrite_guide_section(),
            ComponentKind::GuideTitle => {
                let text = self.text();
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![heading(3, vec![text_node(text)])]
                }
            }
            ComponentKind::Button => {
                let text = self.text();
                match (self.attributes.get("href"), text.is_empty()) {
                    (_, true) => Vec::new(),
                    (Some(href), false) => {
                        vec![paragraph(vec![link(href, vec![text_node(text)])])]
                    }
                    (None, false) => vec![paragraph(vec![text_node(text)])],
                }
            }
            ComponentKind::Anchor => self.rewrite_anchor(),
            ComponentKind::Image => self.rewrite_image(),
            ComponentKind::Unknown => {
                if self.children.is_empty() {
                    log::debug!(
                        "dropping childless component <{}>",
                        self.name.as_deref().unwrap_or_default()
                    );
                }
                self.children
            }
        }
    }

    fn rewrite_callout(self) -> Vec<Node> {
        if self.text().is_empty() {
            return Vec::new();
        }
        let label = format!("{}:", self.name.as_deref().unwrap_or("Note"));
        let mut blocks = crate::transform::into_blocks(self.children);
        let mut lead = vec![
            Node::Strong(Strong {
                children: vec![text_node(label)],
                position: None,
            }),
            text_node(" ".to_string()),
        ];

        match blocks.first_mut() {
            Some(Node::Paragraph(first)) => {
                trim_inline_start(&mut first.children);
                lead.append(&mut first.children);
                first.children = lead;
            }
            _ => {
                lead.pop();
                blocks.insert(0, paragraph(lead));
            }
        }

        vec![Node::Blockquote(Blockquote {
            children: blocks,
            position: None,
        })]
    }

    fn rewrite_card(self) -> Vec<Node> {
        let text = self.text();
        if text.is_empty() {
            return Vec::new();
        }
        let title = self.attributes.get("title");
        let inline = match (self.attributes.get("href"), title) {
            (Some(href), Some(title)) => vec![
                strong_text(title),
                text_node(": ".to_string()),
                link(href, vec![text_node(text)]),
            ],
            (Some(href), None) => vec![link(href, vec![text_node(text)])],
            (None, Some(title)) => vec![strong_text(title), text_node(format!(": {text}"))],
            (None, None) => vec![text_node(text)],
        };
        vec![paragraph(inline)]
    }

    fn rewrite_property(self) -> Vec<Node> {
        let Some(name) = self.attributes.get("name") else {
            return self.children;
        };
        let mut detail = String::new();
        if let Some(kind) = self.attributes.get("type") {
            detail.push_str(&format!(" ({kind})"));
        }
        let description = self.text();
        if !description.is_empty() {
            detail.push_str(&format!(": {description}"));
        }

        let mut inline = vec![Node::InlineCode(InlineCode {
            value: name.to_string(),
            position: None,
        })];
        if !detail.is_empty() {
            inline.push(text_node(detail));
        }

        vec![Node::List(List {
            children: vec![Node::ListItem(ListItem {
                children: vec![paragraph(inline)],
                position: None,
                spread: false,
                checked: None,
            })],
            position: None,
            ordered: false,
            start: None,
            spread: false,
        })]
    }

    fn rewrite_guide_section(self) -> Vec<Node> {
        let label = self.attributes.get("show").map(|show| match show {
            "ts" => "TypeScript",
            "py" => "Python",
            "go" => "Go",
            other => other,
        });
        let mut out = Vec::with_capacity(self.children.len() + 1);
        if let Some(label) = label {
            out.push(heading(4, vec![text_node(label.to_string())]));
        }
        out.extend(self.children);
        out
    }

    fn rewrite_anchor(self) -> Vec<Node> {
        match self.attributes.get("href") {
            Some(href) if !self.text().is_empty() => {
                let children = crate::transform::flatten_inline(self.children);
                vec![paragraph(vec![link(href, children)])]
            }
            _ => self.children,
        }
    }

    fn rewrite_image(self) -> Vec<Node> {
        let Some(src) = self.attributes.get("src") else {
            return Vec::new();
        };
        vec![paragraph(vec![Node::Image(Image {
            position: None,
            alt: self.attributes.get("alt").unwrap_or_default().to_string(),
            url: src.to_string(),
            title: self.attributes.get("title").map(str::to_string),
        })])]
    }

    /// Optional heading from `attribute`, then the children.
    fn titled(self, depth: u8, attribute: &str) -> Vec<Node> {
        let mut out = Vec::with_capacity(self.children.len() + 1);
        if let Some(title) = self.attributes.get(attribute) {
            out.push(heading(depth, vec![text_node(title.to_string())]));
        }
        out.extend(self.children);
        out
    }
}

/// Plain-text content of `nodes`.
///
/// Sibling blocks are separated by a space and hard breaks become spaces,
/// so words from different paragraphs never run together.
pub fn text_content(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        collect_text(node, &mut out);
    }
    out
}

fn collect_text(node: &Node, out: &mut String) {
    if is_block(node) && !out.is_empty() && !out.ends_with(char::is_whitespace) {
        out.push(' ');
    }
    match node {
        Node::Text(Text { value, .. })
        | Node::InlineCode(InlineCode { value, .. })
        | Node::Code(markdown::mdast::Code { value, .. })
        | Node::InlineMath(markdown::mdast::InlineMath { value, .. })
        | Node::Math(markdown::mdast::Math { value, .. }) => out.push_str(value),
        Node::Image(Image { alt, .. })
        | Node::ImageReference(markdown::mdast::ImageReference { alt, .. }) => out.push_str(alt),
        Node::Break(_) => out.push(' '),
        other => {
            if let Some(children) = other.children() {
                for child in children {
                    collect_text(child, out);
                }
            }
        }
    }
}

/// Whether `node` can only appear at block level.
pub(crate) fn is_block(node: &Node) -> bool {
    matches!(
        node,
        Node::Root(_)
            | Node::Paragraph(_)
            | Node::Blockquote(_)
            | Node::List(_)
            | Node::ListItem(_)
            | Node::Heading(_)
            | Node::Code(_)
            | Node::Math(_)
            | Node::ThematicBreak(_)
            | Node::Table(_)
            | Node::TableRow(_)
            | Node::Definition(_)
            | Node::FootnoteDefinition(_)
            | Node::Yaml(_)
            | Node::Toml(_)
            | Node::MdxJsxFlowElement(_)
            | Node::MdxFlowExpression(_)
            | Node::MdxjsEsm(_)
    )
}

/// Resolves a JavaScript expression that is a plain literal.
///
/// String literals (double, single or template quotes without
/// interpolation) and numbers resolve; anything else is `None`.
pub fn literal_value(expression: &str) -> Option<String> {
    let source = expression.trim();
    let mut chars = source.chars();
    let quote = chars.next()?;

    if matches!(quote, '"' | '\'' | '`') {
        let mut value = String::new();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next()? {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    esc @ ('\\' | '"' | '\'' | '`' | '$') => value.push(esc),
                    esc => {
                        value.push('\\');
                        value.push(esc);
                    }
                }
            } else if c == quote {
                // Anything after the closing quote makes it a larger expression.
                return chars.as_str().trim().is_empty().then_some(value);
            } else if quote == '`' && c == '$' && chars.as_str().starts_with('{') {
                return None;
            } else {
                value.push(c);
            }
        }
        return None;
    }

    source
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(|_| source.to_string())
}

pub(crate) fn text_node(value: String) -> Node {
    Node::Text(Text {
        value,
        position: None,
    })
}

pub(crate) fn paragraph(children: Vec<Node>) -> Node {
    Node::Paragraph(Paragraph {
        children,
        position: None,
    })
}

fn heading(depth: u8, children: Vec<Node>) -> Node {
    Node::Heading(Heading {
        children,
        position: None,
        depth,
    })
}

fn link(url: &str, children: Vec<Node>) -> Node {
    Node::Link(Link {
        children,
        position: None,
        url: url.to_string(),
        title: None,
    })
}

fn strong_text(value: &str) -> Node {
    Node::Strong(Strong {
        children: vec![text_node(value.to_string())],
        position: None,
    })
}

fn trim_inline_start(children: &mut Vec<Node>) {
    while let Some(Node::Text(text)) = children.first_mut() {
        let trimmed = text.value.trim_start();
        if trimmed.is_empty() {
            children.remove(0);
        } else {
            text.value = trimmed.to_string();
            break;
        }
    }
}
