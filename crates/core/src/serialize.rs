//! Markdown serialization for mdast trees.
//!
//! Emits CommonMark plus GFM tables, strikethrough, task items and
//! footnotes. Block output is built bottom-up as strings: containers prefix
//! or indent the text of their children.

use markdown::mdast::{AlignKind, Code, List, ListItem, Node, ReferenceKind, Table};
use serde::{Deserialize, Serialize};

use crate::code_fence::longest_marker_run;

/// Serializer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializeOptions {
    /// Bullet for unordered lists (`-`, `*` or `+`).
    pub bullet: char,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self { bullet: '-' }
    }
}

/// Serializes `node` to Markdown, ending in a single newline.
pub fn to_markdown(node: &Node, options: &SerializeOptions) -> String {
    let bullet = match options.bullet {
        '-' | '*' | '+' => options.bullet,
        other => {
            log::warn!("unsupported list bullet {other:?}, using '-'");
            '-'
        }
    };
    let serializer = Serializer { bullet };
    let mut out = serializer.block(node);
    let trimmed = out.trim_end_matches('\n').len();
    out.truncate(trimmed);
    out.push('\n');
    out
}

struct Serializer {
    bullet: char,
}

impl Serializer {
    fn blocks(&self, nodes: &[Node], separator: &str) -> String {
        let mut out = Vec::with_capacity(nodes.len());
        let mut previous: Option<&Node> = None;
        for node in nodes {
            // Adjacent lists switch markers, otherwise they would parse as one.
            let block = match (previous, node) {
                (Some(Node::List(before)), Node::List(list)) if before.ordered == list.ordered => {
                    self.list(list, true)
                }
                _ => self.block(node),
            };
            if !block.is_empty() {
                out.push(block);
                previous = Some(node);
            }
        }
        out.join(separator)
    }

    fn block(&self, node: &Node) -> String {
        match node {
            Node::Root(root) => self.blocks(&root.children, "\n\n"),
            Node::Paragraph(paragraph) => {
                let text = self.inline(&paragraph.children);
                text.split('\n')
                    .map(escape_line_start)
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            Node::Heading(heading) => {
                let mut text = self.inline(&heading.children).replace('\n', " ");
                if text.ends_with('#') {
                    text.insert(text.len() - 1, '\\');
                }
                let marker = "#".repeat(usize::from(heading.depth.clamp(1, 6)));
                if text.is_empty() {
                    marker
                } else {
                    format!("{marker} {text}")
                }
            }
            Node::ThematicBreak(_) => "***".to_string(),
            Node::Blockquote(quote) => prefix_lines(&self.blocks(&quote.children, "\n\n"), "> ", ">"),
            Node::List(list) => self.list(list, false),
            Node::ListItem(item) => self.list_item(item, false),
            Node::Code(code) => fenced_code(code),
            Node::Math(math) => format!("$$\n{}\n$$", math.value),
            Node::Html(html) => html.value.clone(),
            Node::Table(table) => self.table(table),
            Node::Definition(definition) => {
                let label = definition.label.as_deref().unwrap_or(&definition.identifier);
                format!(
                    "[{label}]: {}{}",
                    destination(&definition.url),
                    title_suffix(definition.title.as_deref())
                )
            }
            Node::FootnoteDefinition(definition) => {
                let label = definition.label.as_deref().unwrap_or(&definition.identifier);
                let content = self.blocks(&definition.children, "\n\n");
                let content = indent_continuation(&content, 4);
                format!("[^{label}]: {content}")
            }
            Node::Yaml(yaml) => format!("---\n{}\n---", yaml.value),
            Node::Toml(toml) => format!("+++\n{}\n+++", toml.value),
            Node::MdxjsEsm(_)
            | Node::MdxFlowExpression(_)
            | Node::MdxJsxFlowElement(_)
            | Node::TableRow(_)
            | Node::TableCell(_) => {
                log::debug!("skipping unexpected block node: {node:?}");
                String::new()
            }
            inline => {
                let mut out = String::new();
                self.inline_node(inline, &mut out);
                out
            }
        }
    }

    fn list(&self, list: &List, alternate: bool) -> String {
        let spread = list.spread || list.children.iter().any(|child| {
            matches!(child, Node::ListItem(item) if item.spread)
        });
        let start = list.start.unwrap_or(1);
        let mut items = Vec::with_capacity(list.children.len());

        for (index, child) in list.children.iter().enumerate() {
            let Node::ListItem(item) = child else {
                continue;
            };
            let marker = match (list.ordered, alternate) {
                (true, false) => format!("{}.", start as usize + index),
                (true, true) => format!("{})", start as usize + index),
                (false, false) => self.bullet.to_string(),
                (false, true) => self.other_bullet().to_string(),
            };
            let content = self.list_item(item, spread);
            if content.is_empty() {
                items.push(marker);
            } else {
                let width = marker.len() + 1;
                items.push(format!("{marker} {}", indent_continuation(&content, width)));
            }
        }

        items.join(if spread { "\n\n" } else { "\n" })
    }

    fn other_bullet(&self) -> char {
        if self.bullet == '-' { '*' } else { '-' }
    }

    fn list_item(&self, item: &ListItem, spread: bool) -> String {
        let content = self.blocks(&item.children, if spread { "\n\n" } else { "\n" });
        match item.checked {
            Some(true) => format!("[x] {content}"),
            Some(false) => format!("[ ] {content}"),
            None => content,
        }
    }

    fn table(&self, table: &Table) -> String {
        let rows: Vec<Vec<String>> = table
            .children
            .iter()
            .filter_map(|row| match row {
                Node::TableRow(row) => Some(
                    row.children
                        .iter()
                        .map(|cell| match cell {
                            Node::TableCell(cell) => self
                                .inline(&cell.children)
                                .replace('\n', " ")
                                .replace('|', "\\|"),
                            _ => String::new(),
                        })
                        .collect(),
                ),
                _ => None,
            })
            .collect();

        let columns = rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(table.align.len());
        if columns == 0 {
            return String::new();
        }

        let render_row = |cells: &[String]| {
            let mut line = String::from("|");
            for index in 0..columns {
                line.push(' ');
                line.push_str(cells.get(index).map(String::as_str).unwrap_or(""));
                line.push_str(" |");
            }
            line
        };

        let mut lines = Vec::with_capacity(rows.len() + 1);
        let header = rows.first().cloned().unwrap_or_default();
        lines.push(render_row(&header));

        let mut delimiter = String::from("|");
        for index in 0..columns {
            let cell = match table.align.get(index).copied().unwrap_or(AlignKind::None) {
                AlignKind::Left => " :-- |",
                AlignKind::Right => " --: |",
                AlignKind::Center => " :-: |",
                AlignKind::None => " --- |",
            };
            delimiter.push_str(cell);
        }
        lines.push(delimiter);

        for row in rows.iter().skip(1) {
            lines.push(render_row(row));
        }
        lines.join("\n")
    }

    fn inline(&self, nodes: &[Node]) -> String {
        let mut out = String::new();
        for node in nodes {
            self.inline_node(node, &mut out);
        }
        out
    }

    fn inline_node(&self, node: &Node, out: &mut String) {
        match node {
            Node::Text(text) => out.push_str(&escape_text(&text.value)),
            Node::Emphasis(emphasis) => wrap(out, "*", &self.inline(&emphasis.children)),
            Node::Strong(strong) => wrap(out, "**", &self.inline(&strong.children)),
            Node::Delete(delete) => wrap(out, "~~", &self.inline(&delete.children)),
            Node::InlineCode(code) => out.push_str(&inline_code(&code.value)),
            Node::InlineMath(math) => {
                out.push('$');
                out.push_str(&math.value);
                out.push('$');
            }
            Node::Break(_) => out.push_str("\\\n"),
            Node::Link(link) => {
                out.push('[');
                out.push_str(&self.inline(&link.children));
                out.push_str("](");
                out.push_str(&destination(&link.url));
                out.push_str(&title_suffix(link.title.as_deref()));
                out.push(')');
            }
            Node::Image(image) => {
                out.push_str("![");
                out.push_str(&escape_text(&image.alt));
                out.push_str("](");
                out.push_str(&destination(&image.url));
                out.push_str(&title_suffix(image.title.as_deref()));
                out.push(')');
            }
            Node::LinkReference(reference) => {
                let text = self.inline(&reference.children);
                let label = reference.label.as_deref().unwrap_or(&reference.identifier);
                out.push_str(&reference_syntax(&text, label, reference.reference_kind));
            }
            Node::ImageReference(reference) => {
                let label = reference.label.as_deref().unwrap_or(&reference.identifier);
                out.push('!');
                out.push_str(&reference_syntax(
                    &escape_text(&reference.alt),
                    label,
                    reference.reference_kind,
                ));
            }
            Node::FootnoteReference(reference) => {
                let label = reference.label.as_deref().unwrap_or(&reference.identifier);
                out.push_str(&format!("[^{label}]"));
            }
            Node::Html(html) => out.push_str(&html.value),
            Node::MdxTextExpression(_) | Node::MdxJsxTextElement(_) => {
                log::debug!("skipping unexpected inline node: {node:?}");
            }
            block => out.push_str(&self.block(block)),
        }
    }
}

fn wrap(out: &mut String, marker: &str, content: &str) {
    if content.is_empty() {
        return;
    }
    out.push_str(marker);
    out.push_str(content);
    out.push_str(marker);
}

fn fenced_code(code: &Code) -> String {
    let fence = "`".repeat((longest_marker_run(&code.value, '`') + 1).max(3));
    let mut info = code.lang.clone().unwrap_or_default();
    if let Some(meta) = code.meta.as_deref().filter(|meta| !meta.is_empty()) {
        info.push(' ');
        info.push_str(meta);
    }
    if code.value.is_empty() {
        format!("{fence}{info}\n{fence}")
    } else {
        format!("{fence}{info}\n{}\n{fence}", code.value)
    }
}

fn inline_code(value: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in value.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    let fence = "`".repeat(longest + 1);
    let padding = if value.starts_with('`') || value.ends_with('`') {
        " "
    } else {
        ""
    };
    format!("{fence}{padding}{value}{padding}{fence}")
}

fn destination(url: &str) -> String {
    if url.is_empty() {
        return "<>".to_string();
    }
    let needs_brackets = url
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || c == '(' || c == ')');
    if needs_brackets {
        format!("<{}>", url.replace('<', "%3C").replace('>', "%3E"))
    } else {
        url.to_string()
    }
}

fn title_suffix(title: Option<&str>) -> String {
    match title {
        Some(title) => format!(" \"{}\"", title.replace('"', "\\\"")),
        None => String::new(),
    }
}

fn reference_syntax(text: &str, label: &str, kind: ReferenceKind) -> String {
    match kind {
        ReferenceKind::Full => format!("[{text}][{label}]"),
        ReferenceKind::Collapsed => format!("[{text}][]"),
        ReferenceKind::Shortcut => format!("[{text}]"),
    }
}

/// Escapes characters that would otherwise start inline syntax.
fn escape_text(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let tildes = chars.iter().filter(|&&c| c == '~').count() > 1;
    let mut out = String::with_capacity(value.len());
    for (i, &c) in chars.iter().enumerate() {
        let escape = match c {
            '*' | '`' | '[' | ']' | '<' => true,
            '~' => tildes,
            '&' => chars
                .get(i + 1)
                .is_some_and(|next| next.is_ascii_alphanumeric() || *next == '#'),
            '\\' => chars.get(i + 1).is_some_and(char::is_ascii_punctuation),
            '_' => {
                let before = i.checked_sub(1).and_then(|j| chars.get(j));
                let after = chars.get(i + 1);
                !before.is_some_and(|b| b.is_alphanumeric())
                    || !after.is_some_and(|a| a.is_alphanumeric())
            }
            _ => false,
        };
        if escape {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escapes a paragraph line that would otherwise parse as a block construct.
fn escape_line_start(line: &str) -> String {
    let indent = line.len() - line.trim_start().len();
    let (lead, rest) = line.split_at(indent);

    let starts_block = rest.starts_with('#')
        || rest.starts_with('>')
        || rest.starts_with("- ")
        || rest.starts_with("+ ")
        || rest == "-"
        || rest == "+"
        || rest.starts_with("~~~")
        || (!rest.is_empty() && rest.chars().all(|c| c == '=' || c == '-'));
    if starts_block {
        return format!("{lead}\\{rest}");
    }

    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if (1..=9).contains(&digits) {
        let after = &rest[digits..];
        if let Some(delimiter) = after.chars().next().filter(|c| matches!(c, '.' | ')'))
            && after[1..].chars().next().is_none_or(char::is_whitespace)
        {
            return format!("{lead}{}\\{delimiter}{}", &rest[..digits], &after[1..]);
        }
    }

    line.to_string()
}

fn prefix_lines(text: &str, prefix: &str, empty_prefix: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                empty_prefix.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn indent_continuation(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.split('\n')
        .enumerate()
        .map(|(i, line)| {
            if i == 0 || line.is_empty() {
                line.to_string()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{ParseOptions, parse_mdast};

    fn roundtrip(source: &str) -> String {
        let tree = parse_mdast(source, &ParseOptions::markdown()).unwrap();
        to_markdown(&tree, &SerializeOptions::default())
    }

    #[test]
    fn headings_and_paragraphs() {
        assert_eq!(roundtrip("Title\n=====\n\nSome *text*."), "# Title\n\nSome *text*.\n");
    }

    #[test]
    fn lists_use_configured_bullet() {
        let tree = parse_mdast("* a\n* b\n", &ParseOptions::markdown()).unwrap();
        assert_eq!(to_markdown(&tree, &SerializeOptions::default()), "- a\n- b\n");
        assert_eq!(
            to_markdown(&tree, &SerializeOptions { bullet: '*' }),
            "* a\n* b\n"
        );
    }

    #[test]
    fn nested_and_ordered_lists() {
        assert_eq!(
            roundtrip("3. one\n4. two\n   - inner\n"),
            "3. one\n4. two\n   - inner\n"
        );
    }

    #[test]
    fn code_fence_kept_verbatim() {
        let source = "```ts title=\"a.ts\"\nconst a = `x`;\n\n\nexport {};\n```\n";
        assert_eq!(roundtrip(source), source);
    }

    #[test]
    fn code_fence_lengthened_past_inner_fence() {
        let source = "````md\n```js\nx\n```\n````\n";
        assert_eq!(roundtrip(source), source);
    }

    #[test]
    fn blockquote_prefixes_every_line() {
        assert_eq!(roundtrip("> a\n>\n> b\n"), "> a\n>\n> b\n");
    }

    #[test]
    fn escapes_block_starts_in_text() {
        assert_eq!(roundtrip("\\# not a heading\n"), "\\# not a heading\n");
        assert_eq!(roundtrip("1\\. not a list\n"), "1\\. not a list\n");
        assert_eq!(roundtrip("a \\* b and snake_case\n"), "a \\* b and snake_case\n");
    }

    #[test]
    fn links_images_and_inline_code() {
        assert_eq!(
            roundtrip("[a](/x \"t\") ![i](/i.png) ``a`b``\n"),
            "[a](/x \"t\") ![i](/i.png) ``a`b``\n"
        );
    }

    #[test]
    fn tables_and_task_items() {
        assert_eq!(
            roundtrip("| a | b |\n| :-- | --: |\n| 1 | 2 |\n\n- [x] done\n- [ ] todo\n"),
            "| a | b |\n| :-- | --: |\n| 1 | 2 |\n\n- [x] done\n- [ ] todo\n"
        );
    }

    #[test]
    fn escaped_inline_syntax_roundtrips() {
        for source in [
            "Use \\[text\\](/docs/a) literally.\n",
            "a \\~\\~b\\~\\~ c\n",
            "\\<div> and R\\&amp;D\n",
            "![i](/i.png) and !\\[not an image\\]\n",
            "[a \\] b](/x)\n",
        ] {
            assert_eq!(roundtrip(source), source);
        }
    }

    #[test]
    fn adjacent_lists_alternate_markers() {
        assert_eq!(roundtrip("- a\n\n* b\n"), "- a\n\n* b\n");
        assert_eq!(roundtrip("1. a\n\n1) b\n"), "1. a\n\n1) b\n");
    }

    #[test]
    fn hard_breaks_and_strikethrough() {
        assert_eq!(roundtrip("a\\\nb ~~c~~\n"), "a\\\nb ~~c~~\n");
    }
}
