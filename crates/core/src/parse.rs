//! Markdown/MDX parsing into mdast.

use crate::DocError;
use markdown::mdast::Node;
use markdown::message::{Message, Place};
use serde::{Deserialize, Serialize};

/// Source dialect of a documentation file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSyntax {
    /// MDX: JSX components, ESM and expressions.
    #[default]
    Mdx,
    /// Plain Markdown with raw HTML.
    Markdown,
}

impl SourceSyntax {
    /// Picks the dialect from a file extension (`md` is Markdown, anything else MDX).
    pub fn from_extension(extension: Option<&str>) -> Self {
        match extension {
            Some(ext) if ext.eq_ignore_ascii_case("md") => Self::Markdown,
            _ => Self::Mdx,
        }
    }
}

/// Parser options for building markdown-rs parse options.
#[derive(Clone, Copy, Debug)]
pub struct ParseOptions {
    /// Enable MDX constructs (JSX, ESM, expressions).
    pub mdx: bool,
    /// Enable GitHub Flavored Markdown constructs.
    pub gfm: bool,
    /// Allow raw HTML nodes in the AST.
    pub raw_html: bool,
    /// Enable math constructs ($inline$ and $$block$$).
    pub math: bool,
}

impl ParseOptions {
    /// Markdown-friendly defaults (no MDX, raw HTML kept).
    pub const fn markdown() -> Self {
        Self {
            mdx: false,
            gfm: true,
            raw_html: true,
            math: false,
        }
    }

    /// MDX-friendly defaults (JSX/ESM/expression enabled).
    pub const fn mdx() -> Self {
        Self {
            mdx: true,
            gfm: true,
            raw_html: false,
            math: false,
        }
    }

    /// Options for a source dialect.
    pub const fn for_syntax(syntax: SourceSyntax) -> Self {
        match syntax {
            SourceSyntax::Mdx => Self::mdx(),
            SourceSyntax::Markdown => Self::markdown(),
        }
    }

    /// Convert to markdown-rs `ParseOptions`.
    pub fn to_markdown(self) -> markdown::ParseOptions {
        let mut constructs = markdown::Constructs {
            // Frontmatter is stripped before parsing; a surviving `---` is a rule.
            frontmatter: false,
            // Content nested in components is commonly indented for readability.
            code_indented: !self.mdx,
            // `<...>` belongs to JSX in MDX.
            autolink: !self.mdx,
            html_flow: self.raw_html,
            html_text: self.raw_html,
            ..Default::default()
        };

        if self.gfm {
            constructs.gfm_autolink_literal = true;
            constructs.gfm_footnote_definition = true;
            constructs.gfm_label_start_footnote = true;
            constructs.gfm_strikethrough = true;
            constructs.gfm_table = true;
            constructs.gfm_task_list_item = true;
        }

        if self.mdx {
            constructs.mdx_esm = true;
            constructs.mdx_expression_flow = true;
            constructs.mdx_expression_text = true;
            constructs.mdx_jsx_flow = true;
            constructs.mdx_jsx_text = true;
        }

        if self.math {
            constructs.math_flow = true;
            constructs.math_text = true;
        }

        markdown::ParseOptions {
            constructs,
            math_text_single_dollar: self.math,
            // ESM is only recognized when a parser is present; statements are
            // dropped later, so any well-formed block is accepted.
            mdx_esm_parse: self
                .mdx
                .then(|| Box::new(accept_esm) as Box<markdown::MdxEsmParse>),
            ..markdown::ParseOptions::default()
        }
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::mdx()
    }
}

/// Parse markdown into an MDAST tree.
///
/// Unbalanced or malformed component markup is a hard error.
pub fn parse_mdast(input: &str, options: &ParseOptions) -> Result<Node, DocError> {
    markdown::to_mdast(input, &options.to_markdown()).map_err(|err| {
        let (line, column) = message_location(&err);
        DocError::conversion_failed(err.reason.clone(), line, column)
    })
}

fn accept_esm(_source: &str) -> markdown::MdxSignal {
    markdown::MdxSignal::Ok
}

fn message_location(message: &Message) -> (usize, usize) {
    match &message.place {
        Some(place) => match place.as_ref() {
            Place::Point(point) => (point.line, point.column),
            Place::Position(position) => (position.start.line, position.start.column),
        },
        None => (1, 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_components_and_esm() {
        let tree = parse_mdast(
            "import { A } from \"./a\";\n\n<Note>Hi</Note>\n",
            &ParseOptions::mdx(),
        )
        .unwrap();
        let Node::Root(root) = tree else {
            panic!("expected root");
        };
        assert!(matches!(root.children[0], Node::MdxjsEsm(_)));
    }

    #[test]
    fn esm_needs_mdx_mode() {
        let tree = parse_mdast("import A from \"a\";\n", &ParseOptions::markdown()).unwrap();
        let Node::Root(root) = tree else {
            panic!("expected root");
        };
        assert!(matches!(root.children[0], Node::Paragraph(_)));
    }

    #[test]
    fn unclosed_component_is_a_conversion_error() {
        let err = parse_mdast("Hello\n\n<Note>\n\nnever closed", &ParseOptions::mdx()).unwrap_err();
        match err {
            DocError::ConversionFailed { location, .. } => assert!(location.line >= 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn markdown_mode_keeps_raw_html() {
        let tree = parse_mdast("<div>raw</div>\n", &ParseOptions::markdown()).unwrap();
        let Node::Root(root) = tree else {
            panic!("expected root");
        };
        assert!(matches!(root.children[0], Node::Html(_)));
    }

    #[test]
    fn syntax_from_extension() {
        assert_eq!(SourceSyntax::from_extension(Some("md")), SourceSyntax::Markdown);
        assert_eq!(SourceSyntax::from_extension(Some("MDX")), SourceSyntax::Mdx);
        assert_eq!(SourceSyntax::from_extension(None), SourceSyntax::Mdx);
    }
}
