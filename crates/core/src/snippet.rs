//! Snippet inlining for fenced code blocks.
//!
//! A fenced block whose first line is `!snippet:path=<path>` is replaced by
//! the contents of that file, trimmed to the region between the
//! `!snippet:start` / `!snippet:end` markers and de-indented.

use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::code_fence::{
    FenceEvent, FenceState, advance_fence_state, fence_language, longest_marker_run,
};
use crate::error::{ConvertWarning, Diagnostics};

/// Prefix of the reference line inside a fenced block.
pub const SNIPPET_MARKER: &str = "!snippet:path=";

const START_MARKERS: &[&str] = &["# !snippet:start", "// !snippet:start"];
const END_MARKERS: &[&str] = &["# !snippet:end", "// !snippet:end"];

/// A request to inline an external file into a code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetReference {
    /// Path relative to the project root.
    pub path: String,
}

impl SnippetReference {
    /// Parses a `!snippet:path=...` line.
    pub fn parse(line: &str) -> Option<Self> {
        let path = line.trim().strip_prefix(SNIPPET_MARKER)?.trim();
        if path.is_empty() {
            return None;
        }
        Some(Self {
            path: path.to_string(),
        })
    }
}

/// Errors produced while reading a snippet file.
#[derive(Debug, Error)]
pub enum SnippetError {
    /// The file does not exist.
    #[error("snippet not found: {0}")]
    NotFound(String),
    /// The path is absolute or climbs out of the project root.
    #[error("snippet path is outside the project root: {0}")]
    OutsideRoot(String),
    /// Any other read failure.
    #[error("failed to read snippet {path}: {source}")]
    Io {
        /// Snippet path as referenced.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Provides snippet file contents by path.
pub trait SnippetSource: Sync {
    /// Read the snippet at `path` (relative to the project root).
    fn read_snippet(&self, path: &str) -> Result<String, SnippetError>;
}

impl<F> SnippetSource for F
where
    F: Fn(&str) -> Result<String, SnippetError> + Sync,
{
    fn read_snippet(&self, path: &str) -> Result<String, SnippetError> {
        (self)(path)
    }
}

/// Reads snippets from a directory on disk.
#[derive(Debug, Clone)]
pub struct FsSnippetSource {
    root: PathBuf,
}

impl FsSnippetSource {
    /// Creates a source rooted at the project directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, SnippetError> {
        let relative = Path::new(path.trim_start_matches('/'));
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained {
            return Err(SnippetError::OutsideRoot(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl SnippetSource for FsSnippetSource {
    fn read_snippet(&self, path: &str) -> Result<String, SnippetError> {
        let full_path = self.resolve(path)?;
        std::fs::read_to_string(&full_path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                SnippetError::NotFound(path.to_string())
            } else {
                SnippetError::Io {
                    path: path.to_string(),
                    source,
                }
            }
        })
    }
}

/// Replaces snippet reference blocks with the referenced file contents.
///
/// Unresolvable references become a one-line placeholder comment naming the
/// path; the failure is logged and recorded in `diagnostics`.
pub fn inline_snippets(
    input: &str,
    source: &dyn SnippetSource,
    diagnostics: &mut Diagnostics,
) -> String {
    let lines: Vec<&str> = input.split('\n').collect();
    let mut output: Vec<String> = Vec::with_capacity(lines.len());
    let mut state = FenceState::default();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let outcome = advance_fence_state(line, state);

        if outcome.event == FenceEvent::Open
            && let Some(reference) = lines.get(i + 1).and_then(|l| SnippetReference::parse(l))
            && let Some(close) = find_closing_fence(&lines, i + 1, outcome.next_state)
        {
            let body = match source.read_snippet(&reference.path) {
                Ok(content) => format_snippet_content(&content),
                Err(err) => {
                    log::warn!("Failed to load snippet {}: {}", reference.path, err);
                    diagnostics.add_warning(ConvertWarning::UnresolvedSnippet {
                        line: i + 2,
                        path: reference.path.clone(),
                        reason: err.to_string(),
                    });
                    failed_snippet_placeholder(fence_language(line), &reference.path)
                }
            };

            let marker = outcome.next_state.marker.unwrap_or('`');
            let length = outcome
                .next_state
                .length
                .max(longest_marker_run(&body, marker) + 1);
            let indent = &line[..line.len() - line.trim_start().len()];
            let info = &line.trim_start()[outcome.next_state.length..];
            let fence = marker.to_string().repeat(length);

            output.push(format!("{indent}{fence}{info}"));
            for body_line in body.split('\n') {
                if body_line.is_empty() {
                    output.push(String::new());
                } else {
                    output.push(format!("{indent}{body_line}"));
                }
            }
            output.push(format!("{indent}{fence}"));

            i = close + 1;
            state = FenceState::default();
            continue;
        }

        output.push(line.to_string());
        state = outcome.next_state;
        i += 1;
    }

    output.join("\n")
}

fn find_closing_fence(lines: &[&str], from: usize, mut state: FenceState) -> Option<usize> {
    for (offset, line) in lines[from..].iter().enumerate() {
        let outcome = advance_fence_state(line, state);
        if outcome.event == FenceEvent::Close {
            return Some(from + offset);
        }
        state = outcome.next_state;
    }
    None
}

/// Formats a snippet file for inlining.
///
/// Blank-line runs collapse to one line, the start marker discards what came
/// before it, the end marker discards what follows, surrounding blank lines
/// are trimmed, and the first line's indentation is removed from every line
/// that shares it.
pub fn format_snippet_content(content: &str) -> String {
    let source_lines: Vec<&str> = content.split('\n').collect();
    let mut parsed: Vec<&str> = Vec::new();

    for (i, line) in source_lines.iter().enumerate() {
        if i > 0 && line.trim().is_empty() && source_lines[i - 1].trim().is_empty() {
            continue;
        }
        if is_snippet_start(line) {
            parsed.clear();
            continue;
        }
        if is_snippet_end(line) {
            break;
        }
        parsed.push(line);
    }

    let first = parsed.iter().position(|l| !l.trim().is_empty());
    let last = parsed.iter().rposition(|l| !l.trim().is_empty());
    let parsed = match (first, last) {
        (Some(first), Some(last)) => &parsed[first..=last],
        _ => return String::new(),
    };

    let first_line = parsed[0];
    let prefix = &first_line[..first_line.len() - first_line.trim_start().len()];

    let mut formatted = String::with_capacity(content.len());
    for (i, line) in parsed.iter().copied().enumerate() {
        if i > 0 {
            formatted.push('\n');
        }
        let line = line.strip_prefix(prefix).unwrap_or(line);
        write!(formatted, "{}", line).ok();
    }
    formatted
}

/// Whether the line is a snippet start marker.
pub fn is_snippet_start(line: &str) -> bool {
    START_MARKERS.contains(&line.trim())
}

/// Whether the line is a snippet end marker.
pub fn is_snippet_end(line: &str) -> bool {
    END_MARKERS.contains(&line.trim())
}

/// Comment syntax used for the failure placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentStyle {
    Line(&'static str),
    Block(&'static str, &'static str),
}

fn comment_style(language: Option<&str>) -> CommentStyle {
    let language = language.map(str::to_ascii_lowercase);
    match language.as_deref() {
        Some(
            "py" | "python" | "sh" | "bash" | "shell" | "zsh" | "rb" | "ruby" | "yaml" | "yml"
            | "toml" | "r" | "perl" | "dockerfile" | "makefile" | "powershell" | "ps1",
        ) => CommentStyle::Line("#"),
        Some("sql" | "lua" | "haskell" | "hs") => CommentStyle::Line("--"),
        Some("html" | "xml" | "svg" | "md" | "markdown" | "mdx" | "vue") => {
            CommentStyle::Block("<!--", "-->")
        }
        Some("css" | "scss" | "less") => CommentStyle::Block("/*", "*/"),
        Some("ini") => CommentStyle::Line(";"),
        _ => CommentStyle::Line("//"),
    }
}

/// Placeholder body for a snippet that could not be loaded.
pub fn failed_snippet_placeholder(language: Option<&str>, path: &str) -> String {
    let message = format!("Failed to load snippet: {path}");
    match comment_style(language) {
        CommentStyle::Line(prefix) => format!("{prefix} {message}"),
        CommentStyle::Block(open, close) => format!("{open} {message} {close}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing(path: &str) -> Result<String, SnippetError> {
        Err(SnippetError::NotFound(path.to_string()))
    }

    #[test]
    fn parses_reference_line() {
        assert_eq!(
            SnippetReference::parse("!snippet:path=snippets/py/a.py "),
            Some(SnippetReference {
                path: "snippets/py/a.py".to_string()
            })
        );
        assert_eq!(SnippetReference::parse("!snippet:path="), None);
        assert_eq!(SnippetReference::parse("print('x')"), None);
    }

    #[test]
    fn deindents_uniform_prefix() {
        let content = "    def handler():\n        return 1\n\n    handler()";
        assert_eq!(
            format_snippet_content(content),
            "def handler():\n    return 1\n\nhandler()"
        );
    }

    #[test]
    fn keeps_lines_without_prefix() {
        let content = "    a = 1\n  b = 2\n    c = 3";
        assert_eq!(format_snippet_content(content), "a = 1\n  b = 2\nc = 3");
    }

    #[test]
    fn extracts_marked_region() {
        let content = "import x\n\n// !snippet:start\nconst a = 1;\n// !snippet:end\nexport {};";
        assert_eq!(format_snippet_content(content), "const a = 1;");

        let python = "import os\n  # !snippet:start\n    print(os.name)\n  # !snippet:end\n";
        assert_eq!(format_snippet_content(python), "print(os.name)");
    }

    #[test]
    fn collapses_blank_runs_and_trims() {
        let content = "\n\n\nfirst\n\n\n\nsecond\n\n";
        assert_eq!(format_snippet_content(content), "first\n\nsecond");
    }

    #[test]
    fn empty_content_formats_to_empty() {
        assert_eq!(format_snippet_content(""), "");
        assert_eq!(format_snippet_content("\n  \n"), "");
    }

    #[test]
    fn inlines_and_keeps_opener_attributes() {
        let source = |path: &str| -> Result<String, SnippetError> {
            assert_eq!(path, "snippets/ts/a.ts");
            Ok("  const a = 1;\n  a;\n".to_string())
        };
        let input = "Before\n\n```ts title=\"a.ts\"\n!snippet:path=snippets/ts/a.ts\n```\n\nAfter";
        let mut diagnostics = Diagnostics::new();
        let out = inline_snippets(input, &source, &mut diagnostics);
        assert_eq!(
            out,
            "Before\n\n```ts title=\"a.ts\"\nconst a = 1;\na;\n```\n\nAfter"
        );
        assert!(!diagnostics.has_warnings());
    }

    #[test]
    fn missing_file_yields_placeholder() {
        let input = "```go\n!snippet:path=snippets/go/nope.go\n```";
        let mut diagnostics = Diagnostics::new();
        let out = inline_snippets(input, &missing, &mut diagnostics);
        assert_eq!(
            out,
            "```go\n// Failed to load snippet: snippets/go/nope.go\n```"
        );
        assert_eq!(diagnostics.unresolved_snippets(), 1);
        assert_eq!(
            diagnostics.warnings[0],
            ConvertWarning::UnresolvedSnippet {
                line: 2,
                path: "snippets/go/nope.go".to_string(),
                reason: "snippet not found: snippets/go/nope.go".to_string(),
            }
        );
    }

    #[test]
    fn placeholder_follows_language_comments() {
        assert_eq!(
            failed_snippet_placeholder(Some("py"), "a.py"),
            "# Failed to load snippet: a.py"
        );
        assert_eq!(
            failed_snippet_placeholder(Some("SQL"), "q.sql"),
            "-- Failed to load snippet: q.sql"
        );
        assert_eq!(
            failed_snippet_placeholder(Some("html"), "p.html"),
            "<!-- Failed to load snippet: p.html -->"
        );
        assert_eq!(
            failed_snippet_placeholder(None, "x"),
            "// Failed to load snippet: x"
        );
    }

    #[test]
    fn widens_fence_around_nested_fences() {
        let source = |_: &str| -> Result<String, SnippetError> {
            Ok("# Title\n\n```sh\nls\n```".to_string())
        };
        let input = "```md\n!snippet:path=README.md\n```";
        let out = inline_snippets(input, &source, &mut Diagnostics::new());
        assert_eq!(out, "````md\n# Title\n\n```sh\nls\n```\n````");
    }

    #[test]
    fn indents_body_of_indented_fence() {
        let source = |_: &str| -> Result<String, SnippetError> { Ok("a\n\nb".to_string()) };
        let input = "1. Step\n\n   ```py\n   !snippet:path=a.py\n   ```";
        let out = inline_snippets(input, &source, &mut Diagnostics::new());
        assert_eq!(out, "1. Step\n\n   ```py\n   a\n\n   b\n   ```");
    }

    #[test]
    fn leaves_other_blocks_alone() {
        let input = "```py\nprint(1)\n!snippet:path=a.py\n```\n\n!snippet:path=b.py\n\n```py\n!snippet:path=c.py";
        let out = inline_snippets(input, &missing, &mut Diagnostics::new());
        assert_eq!(out, input);
    }

    #[test]
    fn fs_source_rejects_escaping_paths() {
        let source = FsSnippetSource::new("/srv/site");
        assert!(matches!(
            source.read_snippet("../etc/passwd"),
            Err(SnippetError::OutsideRoot(_))
        ));
        assert_eq!(
            source.resolve("/snippets/a.py").unwrap(),
            PathBuf::from("/srv/site/snippets/a.py")
        );
    }

    #[test]
    fn fs_source_reports_missing_files() {
        let source = FsSnippetSource::new(env!("CARGO_MANIFEST_DIR"));
        assert!(matches!(
            source.read_snippet("tests/fixtures/snippets/none.py"),
            Err(SnippetError::NotFound(_))
        ));
        let content = source
            .read_snippet("tests/fixtures/snippets/py/send_event.py")
            .expect("fixture snippet should exist");
        assert!(content.contains("!snippet:start"));
    }
}
