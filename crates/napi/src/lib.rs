#![deny(missing_docs)]
//! Node.js bindings for the docmd conversion pipeline.
//!
//! The documentation site calls these from its `/docs-markdown/[...path]`
//! route and from build scripts that pre-render every page.

use docmd_core::{
    ConvertOptions, DocError, DocsRoot, FsSnippetSource, LinkRewriter, SnippetSource, convert,
    format_snippet_content, render_llms_full, split_frontmatter,
};
use napi::bindgen_prelude::*;
use napi_derive::napi;

/// Batch processing types and functions.
pub mod batch;
/// NAPI-exposed data structures.
pub mod types;
pub use batch::*;
pub use types::*;

/// Extracts YAML frontmatter without converting the document.
#[napi]
pub fn parse_frontmatter(content: String) -> napi::Result<FrontmatterResult> {
    let split = split_frontmatter(&content);
    let parsed = match split.raw {
        Some(raw) => docmd_core::parse_frontmatter(raw),
        None => Ok(empty_frontmatter()),
    };
    Ok(match parsed {
        Ok(frontmatter) => FrontmatterResult {
            frontmatter,
            errors: Vec::new(),
        },
        Err(err) => FrontmatterResult {
            frontmatter: empty_frontmatter(),
            errors: vec![err.to_string()],
        },
    })
}

/// Converts an MDX (or Markdown) string to plain Markdown.
///
/// # Example (JavaScript)
///
/// ```javascript
/// const { convertMdxToMarkdown } = require('docmd-napi');
///
/// const { markdown } = convertMdxToMarkdown('<Note>Read this.</Note>');
/// // markdown === '> **Note:** Read this.'
/// ```
#[napi(js_name = "convertMdxToMarkdown")]
pub fn convert_mdx_to_markdown(
    source: String,
    config: Option<ConvertConfig>,
) -> napi::Result<ConvertResult> {
    let config = config.unwrap_or_default();
    let options = config.to_options(ConvertOptions::default())?;
    let snippets = snippet_source(&config);
    convert(&source, &options, snippets.as_ref().map(as_source))
        .map(ConvertResult::from)
        .map_err(convert_error)
}

/// Resolves a logical documentation path under `docsRoot` and converts it.
///
/// Defaults follow the Markdown endpoint: internal links point at
/// `/docs-markdown`. Missing pages fail with `Document not found`, paths that
/// escape the root with `Access denied`.
#[napi(js_name = "convertDoc")]
pub fn convert_doc(
    docs_root: String,
    logical_path: String,
    config: Option<ConvertConfig>,
) -> napi::Result<ConvertResult> {
    let config = config.unwrap_or_default();
    let options = config.to_options(ConvertOptions::for_endpoint())?;
    let snippets = snippet_source(&config);
    DocsRoot::new(docs_root)
        .convert(&logical_path, &options, snippets.as_ref().map(as_source))
        .map(ConvertResult::from)
        .map_err(convert_error)
}

/// Lists the logical path of every page under `docsRoot`, sorted.
#[napi(js_name = "listDocs")]
pub fn list_docs(docs_root: String) -> napi::Result<Vec<String>> {
    DocsRoot::new(docs_root).discover().map_err(convert_error)
}

/// Converts every page under `docsRoot` into one `llms-full.txt` corpus.
///
/// `site` names the heading and defaults to `Inngest`.
#[napi(js_name = "buildLlmsFull")]
pub fn build_llms_full(
    docs_root: String,
    site: Option<String>,
    config: Option<ConvertConfig>,
) -> napi::Result<String> {
    let config = config.unwrap_or_default();
    let options = config.to_options(ConvertOptions::for_endpoint())?;
    let snippets = snippet_source(&config);
    let corpus = DocsRoot::new(docs_root)
        .convert_all(&options, snippets.as_ref().map(as_source))
        .map_err(convert_error)?;
    Ok(render_llms_full(site.as_deref().unwrap_or("Inngest"), &corpus))
}

/// Converts many documents in parallel using Rayon.
///
/// Results keep the input order; one failing document does not stop the
/// others.
///
/// # Example (JavaScript)
///
/// ```javascript
/// const { convertBatch } = require('docmd-napi');
///
/// const result = convertBatch(
///   [{ id: 'a', source: '# A' }, { id: 'b', source: '<Note>B</Note>' }],
///   { maxThreads: 4 },
/// );
/// console.log(`Converted ${result.stats.succeeded}/${result.stats.total}`);
/// ```
#[napi(js_name = "convertBatch")]
pub fn convert_batch(
    inputs: Vec<BatchInput>,
    options: Option<BatchOptions>,
) -> napi::Result<BatchProcessingResult> {
    batch::run_batch(inputs, options.unwrap_or_default())
}

/// De-indents snippet content and trims it to its `!snippet:start` region.
#[napi(js_name = "formatSnippet")]
pub fn format_snippet(content: String) -> String {
    format_snippet_content(&content)
}

/// Rewrites internal documentation links outside fenced code.
///
/// `from` defaults to `/docs`, `to` to `/docs-markdown`.
#[napi(js_name = "rewriteDocLinks")]
pub fn rewrite_doc_links(
    text: String,
    from: Option<String>,
    to: Option<String>,
) -> napi::Result<String> {
    let from = from.as_deref().unwrap_or(docmd_core::links::DEFAULT_DOCS_PREFIX);
    let to = to
        .as_deref()
        .unwrap_or(docmd_core::links::DEFAULT_MARKDOWN_PREFIX);
    let rewriter = LinkRewriter::new(from, to)
        .map_err(|err| Error::new(Status::InvalidArg, err.to_string()))?;
    Ok(rewriter.rewrite(&text))
}

fn snippet_source(config: &ConvertConfig) -> Option<FsSnippetSource> {
    config.snippet_root.as_deref().map(FsSnippetSource::new)
}

fn as_source(source: &FsSnippetSource) -> &dyn SnippetSource {
    source
}

fn empty_frontmatter() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

/// Maps core errors onto NAPI statuses.
fn convert_error(err: DocError) -> Error {
    match err {
        DocError::ConversionFailed { .. } | DocError::InvalidOptions(_) => {
            Error::new(Status::InvalidArg, err.to_string())
        }
        // Callers match on the message prefix to answer 404 / 403.
        DocError::NotFound { .. } | DocError::AccessDenied { .. } | DocError::Io(_) => {
            Error::from_reason(err.to_string())
        }
    }
}
