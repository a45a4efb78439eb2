//! End-to-end conversion of one documentation source to plain Markdown.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{ConvertWarning, Diagnostics, DocError};
use crate::frontmatter::{parse_frontmatter, split_frontmatter};
use crate::links::{DEFAULT_DOCS_PREFIX, DEFAULT_MARKDOWN_PREFIX, LinkRewriter};
use crate::parse::{ParseOptions, SourceSyntax, parse_mdast};
use crate::serialize::{SerializeOptions, to_markdown};
use crate::snippet::{SnippetSource, inline_snippets};
use crate::transform::transform_tree;

/// Conversion settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Source dialect.
    pub syntax: SourceSyntax,
    /// Splice `!snippet:path=` references when a snippet source is given.
    pub inline_snippets: bool,
    /// Point internal documentation links at the Markdown endpoint.
    pub rewrite_links: bool,
    /// Prefix of rendered documentation pages.
    pub link_prefix: String,
    /// Prefix of the Markdown endpoint.
    pub markdown_prefix: String,
    /// Bullet for unordered lists.
    pub bullet: char,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            syntax: SourceSyntax::Mdx,
            inline_snippets: true,
            rewrite_links: false,
            link_prefix: DEFAULT_DOCS_PREFIX.to_string(),
            markdown_prefix: DEFAULT_MARKDOWN_PREFIX.to_string(),
            bullet: '-',
        }
    }
}

impl ConvertOptions {
    /// Options used by the `/docs-markdown` endpoint: links rewritten.
    pub fn for_endpoint() -> Self {
        Self {
            rewrite_links: true,
            ..Self::default()
        }
    }

    fn link_rewriter(&self) -> Result<Option<LinkRewriter>, DocError> {
        if !self.rewrite_links {
            return Ok(None);
        }
        LinkRewriter::new(&self.link_prefix, &self.markdown_prefix)
            .map(Some)
            .map_err(|err| DocError::InvalidOptions(err.to_string()))
    }
}

/// Output of a successful conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedDocument {
    /// Plain Markdown without frontmatter, ESM or component tags.
    pub markdown: String,
    /// Frontmatter metadata as a JSON object (`{}` when absent or invalid).
    pub frontmatter: JsonValue,
    /// Non-fatal problems met along the way.
    pub diagnostics: Diagnostics,
}

/// Converts an MDX document to plain Markdown.
///
/// Malformed component markup fails the whole document; missing snippets
/// and invalid frontmatter are reported in the diagnostics instead.
pub fn convert(
    source: &str,
    options: &ConvertOptions,
    snippets: Option<&dyn SnippetSource>,
) -> Result<ConvertedDocument, DocError> {
    let rewriter = options.link_rewriter()?;
    let mut diagnostics = Diagnostics::new();

    let split = split_frontmatter(source);
    let frontmatter = match split.raw.map(parse_frontmatter) {
        Some(Ok(value)) => value,
        Some(Err(err)) => {
            log::warn!("ignoring frontmatter: {err}");
            diagnostics.add_warning(ConvertWarning::InvalidFrontmatter {
                message: err.to_string(),
            });
            empty_object()
        }
        None => empty_object(),
    };

    let body = match snippets {
        Some(snippets) if options.inline_snippets => {
            Cow::Owned(inline_snippets(split.body, snippets, &mut diagnostics))
        }
        _ => Cow::Borrowed(split.body),
    };

    let mut tree = parse_mdast(&body, &ParseOptions::for_syntax(options.syntax))?;
    transform_tree(&mut tree);
    if let Some(rewriter) = rewriter {
        rewriter.rewrite_tree(&mut tree);
    }

    let markdown = to_markdown(
        &tree,
        &SerializeOptions {
            bullet: options.bullet,
        },
    );

    Ok(ConvertedDocument {
        markdown: markdown.trim_end().to_string(),
        frontmatter,
        diagnostics,
    })
}

/// Converts with default options and no snippet source, returning only the Markdown.
pub fn convert_mdx_to_markdown(source: &str) -> Result<String, DocError> {
    convert(source, &ConvertOptions::default(), None).map(|doc| doc.markdown)
}

fn empty_object() -> JsonValue {
    JsonValue::Object(Default::default())
}
