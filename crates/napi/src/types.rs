//! NAPI-exposed data structures.

use docmd_core::{ConvertOptions, ConvertWarning, ConvertedDocument, SourceSyntax};
use napi_derive::napi;
use serde_json::Value as JsonValue;

/// Frontmatter extraction result.
#[napi(object)]
#[derive(Debug, Clone)]
pub struct FrontmatterResult {
    /// Structured frontmatter data represented as JSON.
    pub frontmatter: JsonValue,
    /// Any syntax or parsing errors surfaced by the extractor.
    pub errors: Vec<String>,
}

/// Source dialect.
#[napi(string_enum)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileInputType {
    /// Standard Markdown (.md) with raw HTML.
    Markdown,
    /// MDX (.mdx) with components, ESM and expressions.
    Mdx,
}

impl From<FileInputType> for SourceSyntax {
    fn from(value: FileInputType) -> Self {
        match value {
            FileInputType::Markdown => SourceSyntax::Markdown,
            FileInputType::Mdx => SourceSyntax::Mdx,
        }
    }
}

/// Conversion options; every field is optional.
#[napi(object)]
#[derive(Debug, Clone, Default)]
pub struct ConvertConfig {
    /// Source dialect (defaults to MDX).
    pub file_type: Option<FileInputType>,
    /// Inline `!snippet:path=` references found under `snippetRoot` (defaults to true).
    pub inline_snippets: Option<bool>,
    /// Directory snippet paths are resolved against.
    pub snippet_root: Option<String>,
    /// Rewrite `/docs/...` links to the Markdown endpoint.
    pub rewrite_links: Option<bool>,
    /// Prefix of rendered documentation pages (`/docs`).
    pub link_prefix: Option<String>,
    /// Prefix of the Markdown endpoint (`/docs-markdown`).
    pub markdown_prefix: Option<String>,
    /// List bullet: `-`, `*` or `+`.
    pub bullet: Option<String>,
}

impl ConvertConfig {
    pub(crate) fn to_options(&self, base: ConvertOptions) -> napi::Result<ConvertOptions> {
        let bullet = match self.bullet.as_deref() {
            None => base.bullet,
            Some(value) => {
                let mut chars = value.chars();
                match (chars.next(), chars.next()) {
                    (Some(c @ ('-' | '*' | '+')), None) => c,
                    _ => {
                        return Err(napi::Error::new(
                            napi::Status::InvalidArg,
                            format!("bullet must be one of '-', '*' or '+', got {value:?}"),
                        ));
                    }
                }
            }
        };

        Ok(ConvertOptions {
            syntax: self.file_type.map(SourceSyntax::from).unwrap_or(base.syntax),
            inline_snippets: self.inline_snippets.unwrap_or(base.inline_snippets),
            rewrite_links: self.rewrite_links.unwrap_or(base.rewrite_links),
            link_prefix: self.link_prefix.clone().unwrap_or(base.link_prefix),
            markdown_prefix: self.markdown_prefix.clone().unwrap_or(base.markdown_prefix),
            bullet,
        })
    }
}

/// Non-fatal problem met during conversion.
#[napi(object)]
#[derive(Debug, Clone)]
pub struct ConvertDiagnostic {
    /// `unresolved-snippet` or `invalid-frontmatter`.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
    /// Line in the document body, when known.
    pub line: Option<u32>,
    /// Snippet path, for unresolved snippets.
    pub path: Option<String>,
}

impl From<&ConvertWarning> for ConvertDiagnostic {
    fn from(warning: &ConvertWarning) -> Self {
        match warning {
            ConvertWarning::UnresolvedSnippet { line, path, .. } => Self {
                kind: "unresolved-snippet".to_string(),
                message: warning.to_string(),
                line: Some(*line as u32),
                path: Some(path.clone()),
            },
            ConvertWarning::InvalidFrontmatter { .. } => Self {
                kind: "invalid-frontmatter".to_string(),
                message: warning.to_string(),
                line: None,
                path: None,
            },
        }
    }
}

/// Converted document returned to JavaScript.
#[napi(object)]
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// Plain Markdown.
    pub markdown: String,
    /// Frontmatter metadata (`{}` when absent).
    pub frontmatter: JsonValue,
    /// Non-fatal problems.
    pub diagnostics: Vec<ConvertDiagnostic>,
}

impl From<ConvertedDocument> for ConvertResult {
    fn from(doc: ConvertedDocument) -> Self {
        Self {
            diagnostics: doc
                .diagnostics
                .warnings
                .iter()
                .map(ConvertDiagnostic::from)
                .collect(),
            markdown: doc.markdown,
            frontmatter: doc.frontmatter,
        }
    }
}
