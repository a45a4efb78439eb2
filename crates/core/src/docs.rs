//! Documentation tree on disk: path resolution, discovery and batch conversion.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::convert::{ConvertOptions, ConvertedDocument, convert};
use crate::error::DocError;
use crate::parse::SourceSyntax;
use crate::snippet::SnippetSource;

const SOURCE_EXTENSIONS: &[&str] = &["mdx", "md"];

/// Root directory of documentation sources (e.g. `pages/docs`).
#[derive(Debug, Clone)]
pub struct DocsRoot {
    dir: PathBuf,
}

impl DocsRoot {
    /// Creates a root for `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The documentation directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolves a logical path such as `guides/flow-control` to a source file.
    ///
    /// Candidates are tried in order: `{path}.mdx`, `{path}/index.mdx`,
    /// `{path}.md`. A candidate that resolves (through symlinks) outside the
    /// root is refused.
    pub fn resolve(&self, logical_path: &str) -> Result<PathBuf, DocError> {
        let sanitized = sanitize_doc_path(logical_path);
        let candidates = if sanitized.is_empty() {
            vec!["index.mdx".to_string(), "index.md".to_string()]
        } else {
            vec![
                format!("{sanitized}.mdx"),
                format!("{sanitized}/index.mdx"),
                format!("{sanitized}.md"),
            ]
        };

        let found = candidates
            .iter()
            .map(|candidate| self.dir.join(candidate))
            .find(|path| path.is_file())
            .ok_or_else(|| DocError::NotFound {
                path: logical_path.to_string(),
            })?;

        let root = self.dir.canonicalize()?;
        let resolved = found.canonicalize()?;
        if !resolved.starts_with(&root) {
            return Err(DocError::AccessDenied { path: resolved });
        }
        Ok(resolved)
    }

    /// Lists the logical paths of every source file, sorted.
    ///
    /// `index` files map to their directory; the root index maps to `""`.
    pub fn discover(&self) -> Result<Vec<String>, DocError> {
        let mut paths: Vec<String> = self
            .source_files()?
            .iter()
            .map(|relative| logical_path(relative))
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    /// Converts every source file for the aggregate corpus, sorted by path.
    pub fn convert_all(
        &self,
        options: &ConvertOptions,
        snippets: Option<&dyn SnippetSource>,
    ) -> Result<Vec<CorpusDocument>, DocError> {
        let mut files = self.source_files()?;
        files.sort();
        files
            .into_par_iter()
            .map(|relative| {
                let doc = convert_file(&self.dir.join(&relative), options, snippets)?;
                Ok(CorpusDocument {
                    path: relative_display(&relative),
                    title: frontmatter_str(&doc.frontmatter, "title"),
                    description: frontmatter_str(&doc.frontmatter, "description"),
                    markdown: doc.markdown,
                })
            })
            .collect()
    }

    // Symlinks are not followed, so nothing outside the root is listed.
    fn source_files(&self) -> Result<Vec<PathBuf>, DocError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.dir).follow_links(false) {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let is_source = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext));
            if !is_source {
                continue;
            }
            let Ok(relative) = path.strip_prefix(&self.dir) else {
                continue;
            };
            files.push(relative.to_path_buf());
        }
        Ok(files)
    }

    /// Resolves and converts one logical path.
    pub fn convert(
        &self,
        logical_path: &str,
        options: &ConvertOptions,
        snippets: Option<&dyn SnippetSource>,
    ) -> Result<ConvertedDocument, DocError> {
        let path = self.resolve(logical_path)?;
        convert_file(&path, options, snippets)
    }
}

/// Strips a leading `/docs` segment, `..` sequences and leading slashes.
pub fn sanitize_doc_path(path: &str) -> String {
    let path = path.trim();
    let path = match path.strip_prefix("/docs") {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    };
    let without_parents = path.replace("..", "");
    without_parents
        .trim_start_matches('/')
        .trim_end_matches('/')
        .to_string()
}

/// Reads and converts one source file; the extension picks the dialect.
pub fn convert_file(
    path: &Path,
    options: &ConvertOptions,
    snippets: Option<&dyn SnippetSource>,
) -> Result<ConvertedDocument, DocError> {
    let source = std::fs::read_to_string(path)?;
    let options = ConvertOptions {
        syntax: SourceSyntax::from_extension(path.extension().and_then(|ext| ext.to_str())),
        ..options.clone()
    };
    convert(&source, &options, snippets).map_err(|err| err.with_file(path.display().to_string()))
}

/// One document of a batch.
#[derive(Debug, Clone)]
pub struct BatchItem {
    /// Caller-chosen identifier, echoed in the outcome.
    pub id: String,
    /// Document source.
    pub source: String,
    /// Dialect override; defaults to the batch options.
    pub syntax: Option<SourceSyntax>,
}

/// Result for one batch item.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Identifier of the input.
    pub id: String,
    /// Conversion result.
    pub result: Result<ConvertedDocument, DocError>,
}

/// Converts documents in parallel; outcomes keep input order.
pub fn convert_batch(
    items: Vec<BatchItem>,
    options: &ConvertOptions,
    snippets: Option<&dyn SnippetSource>,
) -> Vec<BatchOutcome> {
    items
        .into_par_iter()
        .map(|item| {
            let result = match item.syntax {
                Some(syntax) if syntax != options.syntax => {
                    let options = ConvertOptions {
                        syntax,
                        ..options.clone()
                    };
                    convert(&item.source, &options, snippets)
                }
                _ => convert(&item.source, options, snippets),
            };
            if let Err(err) = &result {
                log::debug!("batch item {} failed: {err}", item.id);
            }
            BatchOutcome {
                id: item.id,
                result,
            }
        })
        .collect()
}

/// One converted page of the aggregate corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusDocument {
    /// Source file path relative to the root, `/`-separated.
    pub path: String,
    /// Frontmatter `title`, if it is a string.
    pub title: Option<String>,
    /// Frontmatter `description`, if it is a string.
    pub description: Option<String>,
    /// Converted Markdown.
    pub markdown: String,
}

/// Renders the single-file corpus served as `llms-full.txt`.
///
/// Each document gets a `=== Document: <path> ===` header followed by its
/// title and description; documents are separated by `---` lines.
pub fn render_llms_full(site: &str, docs: &[CorpusDocument]) -> String {
    let mut out = format!("# {site} Documentation for LLMs\n\nTotal documents: {}\n\n", docs.len());
    let sections: Vec<String> = docs
        .iter()
        .map(|doc| {
            let mut section = format!("=== Document: {} ===\n", doc.path);
            if let Some(title) = &doc.title {
                section.push_str(&format!("Title: {title}\n"));
            }
            if let Some(description) = &doc.description {
                section.push_str(&format!("Description: {description}\n"));
            }
            section.push('\n');
            section.push_str(&doc.markdown);
            section.push('\n');
            section
        })
        .collect();
    out.push_str(&sections.join("\n---\n"));
    out
}

fn frontmatter_str(frontmatter: &serde_json::Value, key: &str) -> Option<String> {
    frontmatter.get(key).and_then(|value| value.as_str()).map(str::to_string)
}

fn relative_display(relative: &Path) -> String {
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn logical_path(relative: &Path) -> String {
    let without_ext = relative.with_extension("");
    let mut segments: Vec<String> = without_ext
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    if segments.last().is_some_and(|last| last == "index") {
        segments.pop();
    }
    segments.join("/")
}
