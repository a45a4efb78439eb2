#![deny(missing_docs)]
//! docmd core: converts MDX documentation sources into plain Markdown.
//!
//! The pipeline strips frontmatter, inlines snippet files, parses MDX,
//! rewrites documentation components into Markdown, serializes the tree and
//! optionally points internal links at the Markdown endpoint.

/// Code fence detection utilities.
pub mod code_fence;
/// Component catalog and rewrite rules.
pub mod components;
/// End-to-end conversion entry points.
pub mod convert;
/// Documentation directory resolution and batch conversion.
pub mod docs;
/// Core error and diagnostic types.
pub mod error;
/// YAML frontmatter extraction helpers.
pub mod frontmatter;
/// Internal link rewriting.
pub mod links;
/// Markdown/MDX parsing.
pub mod parse;
/// Markdown serialization.
pub mod serialize;
/// Snippet file inlining.
pub mod snippet;
/// Tree transformation.
pub mod transform;

pub use components::{Attributes, ComponentKind, Invocation};
pub use convert::{ConvertOptions, ConvertedDocument, convert, convert_mdx_to_markdown};
pub use docs::{
    BatchItem, BatchOutcome, CorpusDocument, DocsRoot, convert_batch, convert_file, render_llms_full,
    sanitize_doc_path,
};
pub use error::{ConvertWarning, Diagnostics, DocError, SourceLocation};
pub use frontmatter::{FrontmatterError, parse_frontmatter, split_frontmatter, strip_frontmatter};
pub use links::{LinkRewriteError, LinkRewriter, rewrite_doc_links};
pub use parse::{ParseOptions, SourceSyntax, parse_mdast};
pub use serialize::{SerializeOptions, to_markdown};
pub use snippet::{
    FsSnippetSource, SnippetError, SnippetReference, SnippetSource, format_snippet_content,
    inline_snippets,
};
pub use transform::transform_tree;
