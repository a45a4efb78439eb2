//! Depth-first rewrite of a parsed MDX tree into plain Markdown nodes.
//!
//! ESM is dropped, expressions are resolved to text or dropped, and
//! component invocations are replaced by their catalog rule output.

use markdown::mdast::{List, Node, Text};

use crate::components::{Attributes, Invocation, is_block, literal_value, paragraph, text_node};

/// Rewrites `root` in place so it only contains plain Markdown nodes.
pub fn transform_tree(root: &mut Node) {
    match root {
        Node::Root(root) => {
            root.children = normalize_blocks(transform_all(std::mem::take(&mut root.children)));
        }
        other => transform_container(other),
    }
}

fn transform_all(nodes: Vec<Node>) -> Vec<Node> {
    nodes.into_iter().flat_map(transform_node).collect()
}

fn transform_node(node: Node) -> Vec<Node> {
    match node {
        Node::MdxjsEsm(_) => Vec::new(),
        Node::MdxFlowExpression(expression) => literal_text(&expression.value),
        Node::MdxTextExpression(expression) => literal_text(&expression.value),
        Node::MdxJsxFlowElement(element) => Invocation {
            attributes: Attributes::from_mdx(&element.attributes),
            name: element.name,
            children: transform_all(element.children),
        }
        .rewrite(),
        Node::MdxJsxTextElement(element) => Invocation {
            attributes: Attributes::from_mdx(&element.attributes),
            name: element.name,
            children: transform_all(element.children),
        }
        .rewrite(),
        Node::Paragraph(mut paragraph) => {
            let children = transform_all(std::mem::take(&mut paragraph.children));
            if children.iter().all(|child| !is_block(child)) {
                paragraph.children = merge_text(children);
                trim_edges(&mut paragraph.children);
                if paragraph.children.is_empty() {
                    return Vec::new();
                }
                return vec![Node::Paragraph(paragraph)];
            }
            split_paragraph(children)
        }
        mut other => {
            transform_container(&mut other);
            vec![other]
        }
    }
}

fn transform_container(node: &mut Node) {
    match node {
        Node::Blockquote(n) => {
            n.children = normalize_blocks(transform_all(std::mem::take(&mut n.children)));
        }
        Node::ListItem(n) => {
            n.children = normalize_blocks(transform_all(std::mem::take(&mut n.children)));
        }
        Node::FootnoteDefinition(n) => {
            n.children = normalize_blocks(transform_all(std::mem::take(&mut n.children)));
        }
        Node::List(n) => n.children = transform_all(std::mem::take(&mut n.children)),
        Node::Table(n) => n.children = transform_all(std::mem::take(&mut n.children)),
        Node::TableRow(n) => n.children = transform_all(std::mem::take(&mut n.children)),
        Node::TableCell(n) => n.children = inline_children(&mut n.children),
        Node::Heading(n) => n.children = inline_children(&mut n.children),
        Node::Strong(n) => n.children = inline_children(&mut n.children),
        Node::Emphasis(n) => n.children = inline_children(&mut n.children),
        Node::Delete(n) => n.children = inline_children(&mut n.children),
        Node::Link(n) => n.children = inline_children(&mut n.children),
        Node::LinkReference(n) => n.children = inline_children(&mut n.children),
        _ => {}
    }
}

fn inline_children(children: &mut Vec<Node>) -> Vec<Node> {
    merge_text(flatten_inline(transform_all(std::mem::take(children))))
}

fn literal_text(expression: &str) -> Vec<Node> {
    match literal_value(expression) {
        Some(value) => vec![text_node(value)],
        None => Vec::new(),
    }
}

/// Groups loose inline nodes into paragraphs.
pub(crate) fn into_blocks(nodes: Vec<Node>) -> Vec<Node> {
    group_blocks(nodes, true)
}

// Raw HTML stands alone at flow level and stays inline inside paragraphs.
fn group_blocks(nodes: Vec<Node>, flow: bool) -> Vec<Node> {
    let mut blocks = Vec::with_capacity(nodes.len());
    let mut run = Vec::new();
    for node in nodes {
        if is_block(&node) || (flow && matches!(node, Node::Html(_))) {
            flush_run(&mut run, &mut blocks);
            blocks.push(node);
        } else {
            run.push(node);
        }
    }
    flush_run(&mut run, &mut blocks);
    blocks
}

fn normalize_blocks(nodes: Vec<Node>) -> Vec<Node> {
    merge_lists(into_blocks(nodes))
}

fn flush_run(run: &mut Vec<Node>, blocks: &mut Vec<Node>) {
    if run.is_empty() {
        return;
    }
    let mut children = merge_text(std::mem::take(run));
    trim_edges(&mut children);
    if !children.is_empty() {
        blocks.push(paragraph(children));
    }
}

/// Splits a paragraph around block nodes produced by inline components.
fn split_paragraph(children: Vec<Node>) -> Vec<Node> {
    let mut inline = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Node::Paragraph(p) => inline.extend(p.children),
            other => inline.push(other),
        }
    }
    group_blocks(inline, false)
}

/// Flattens block content into phrasing content.
pub(crate) fn flatten_inline(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        if !is_block(&node) {
            out.push(node);
            continue;
        }
        if !out.is_empty() {
            out.push(text_node(" ".to_string()));
        }
        match node {
            Node::Code(code) => out.push(Node::InlineCode(markdown::mdast::InlineCode {
                value: code.value,
                position: code.position,
            })),
            Node::Math(math) => out.push(Node::InlineMath(markdown::mdast::InlineMath {
                value: math.value,
                position: math.position,
            })),
            other => {
                let children = match other {
                    Node::Paragraph(n) => n.children,
                    Node::Heading(n) => n.children,
                    Node::Blockquote(n) => n.children,
                    Node::List(n) => n.children,
                    Node::ListItem(n) => n.children,
                    Node::Table(n) => n.children,
                    Node::TableRow(n) => n.children,
                    Node::FootnoteDefinition(n) => n.children,
                    _ => Vec::new(),
                };
                out.extend(flatten_inline(children));
            }
        }
    }
    out
}

fn merge_text(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let Node::Text(next) = &node
            && let Some(Node::Text(previous)) = out.last_mut()
        {
            previous.value.push_str(&next.value);
            continue;
        }
        out.push(node);
    }
    out
}

fn trim_edges(children: &mut Vec<Node>) {
    if let Some(Node::Text(Text { value, .. })) = children.first_mut() {
        *value = value.trim_start().to_string();
    }
    if let Some(Node::Text(Text { value, .. })) = children.last_mut() {
        *value = value.trim_end().to_string();
    }
    children.retain(|child| !matches!(child, Node::Text(Text { value, .. }) if value.is_empty()));
}

// Lists built by the Property rule carry no source position; authored
// lists always do and are never merged.
fn is_generated_list(list: &List) -> bool {
    !list.ordered && list.position.is_none()
}

fn merge_lists(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::List(next) if is_generated_list(&next) => {
                if let Some(Node::List(previous)) = out.last_mut()
                    && is_generated_list(previous)
                {
                    let List {
                        children, spread, ..
                    } = next;
                    previous.children.extend(children);
                    previous.spread |= spread;
                } else {
                    out.push(Node::List(next));
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{ParseOptions, parse_mdast};

    fn transformed(source: &str) -> Vec<Node> {
        let mut tree = parse_mdast(source, &ParseOptions::mdx()).unwrap();
        transform_tree(&mut tree);
        let Node::Root(root) = tree else {
            panic!("expected root");
        };
        root.children
    }

    #[test]
    fn drops_esm_and_unknown_childless() {
        let children = transformed("import X from \"x\";\nexport const y = 1;\n\nHello\n\n<YouTube id=\"abc\" />\n");
        assert_eq!(children.len(), 1);
        assert!(matches!(&children[0], Node::Paragraph(_)));
    }

    #[test]
    fn inline_card_splices_into_paragraph() {
        let children = transformed("<Card href=\"/docs/a\">A</Card>\n");
        let [Node::Paragraph(p)] = children.as_slice() else {
            panic!("expected one paragraph: {children:?}");
        };
        assert!(matches!(&p.children[0], Node::Link(_)));
    }

    #[test]
    fn inline_callout_splits_paragraph() {
        let children = transformed("<Note>Careful.</Note>\n");
        assert!(matches!(children.as_slice(), [Node::Blockquote(_)]));
    }

    #[test]
    fn adjacent_properties_share_one_list() {
        let children = transformed(
            "<Properties>\n<Property name=\"a\">A</Property>\n\n<Property name=\"b\">B</Property>\n</Properties>\n",
        );
        let [Node::List(list)] = children.as_slice() else {
            panic!("expected one list: {children:?}");
        };
        assert_eq!(list.children.len(), 2);
    }

    #[test]
    fn authored_list_is_not_merged_with_properties() {
        let children = transformed("- x\n\n<Property name=\"a\">A</Property>\n");
        assert!(matches!(children.as_slice(), [Node::List(_), Node::List(_)]));
    }

    #[test]
    fn string_expressions_become_text() {
        let children = transformed("a{\" \"}b {props.x}\n");
        let [Node::Paragraph(p)] = children.as_slice() else {
            panic!("expected paragraph");
        };
        assert!(matches!(&p.children[..], [Node::Text(t)] if t.value == "a b"));
    }

    #[test]
    fn components_inside_headings_flatten() {
        let children = transformed("## Install <Badge>beta</Badge>\n");
        let [Node::Heading(h)] = children.as_slice() else {
            panic!("expected heading");
        };
        assert!(matches!(&h.children[..], [Node::Text(t)] if t.value == "Install beta"));
    }
}
