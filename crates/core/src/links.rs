//! Internal documentation link rewriting.
//!
//! Links such as `(/docs/guides/flow-control)` are pointed at the plain-text
//! variant of the same page (`/docs-markdown/guides/flow-control`). External
//! URLs and code are left alone.

use markdown::mdast::Node;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;

use crate::code_fence::{FenceState, advance_fence_state};

/// Default prefix of rendered documentation pages.
pub const DEFAULT_DOCS_PREFIX: &str = "/docs";
/// Default prefix of the plain-text documentation endpoint.
pub const DEFAULT_MARKDOWN_PREFIX: &str = "/docs-markdown";

static DEFAULT_REWRITER: Lazy<LinkRewriter> = Lazy::new(|| {
    LinkRewriter::new(DEFAULT_DOCS_PREFIX, DEFAULT_MARKDOWN_PREFIX)
        .unwrap_or_else(|err| unreachable!("default link prefixes are valid: {err}"))
});

/// Invalid link rewriter configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkRewriteError {
    /// The source prefix must be an absolute path without whitespace.
    #[error("link prefix must start with '/' and contain no whitespace: {0:?}")]
    InvalidPrefix(String),
    /// One prefix extends the other, so a second pass would rewrite again.
    #[error("prefixes {from:?} and {to:?} overlap")]
    Recursive {
        /// Source prefix.
        from: String,
        /// Target prefix.
        to: String,
    },
}

/// Rewrites one path prefix to another inside Markdown text.
#[derive(Debug, Clone)]
pub struct LinkRewriter {
    pattern: Regex,
    from: String,
    to: String,
}

impl LinkRewriter {
    /// Creates a rewriter from `from` to `to`.
    ///
    /// Rejects prefixes where one extends the other (`/docs` and
    /// `/docs/md`, or `/x/y` and `/x`), so rewriting stays idempotent.
    pub fn new(from: &str, to: &str) -> Result<Self, LinkRewriteError> {
        for prefix in [from, to] {
            if !is_valid_prefix(prefix) {
                return Err(LinkRewriteError::InvalidPrefix(prefix.to_string()));
            }
        }
        if extends(to, from) || extends(from, to) {
            return Err(LinkRewriteError::Recursive {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let pattern = Regex::new(&format!(
            r#"(^|[\s(\[<"'])({})([^)\s]*)"#,
            regex::escape(from)
        ))
        .map_err(|_| LinkRewriteError::InvalidPrefix(from.to_string()))?;

        Ok(Self {
            pattern,
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    /// New target for `url` when it starts with the source prefix.
    pub fn rewrite_url(&self, url: &str) -> Option<String> {
        let tail = url.strip_prefix(self.from.as_str())?;
        let matches = tail.chars().next().is_none_or(starts_path_tail);
        matches.then(|| format!("{}{tail}", self.to))
    }

    /// Rewrites link, image and definition targets plus bare paths in text
    /// and raw HTML. Code nodes are never touched.
    pub fn rewrite_tree(&self, node: &mut Node) {
        match node {
            Node::Link(link) => self.rewrite_target(&mut link.url),
            Node::Image(image) => self.rewrite_target(&mut image.url),
            Node::Definition(definition) => self.rewrite_target(&mut definition.url),
            Node::Text(text) => text.value = self.rewrite_line(&text.value),
            Node::Html(html) => html.value = self.rewrite_line(&html.value),
            _ => {}
        }
        if let Some(children) = node.children_mut() {
            for child in children {
                self.rewrite_tree(child);
            }
        }
    }

    fn rewrite_target(&self, url: &mut String) {
        if let Some(rewritten) = self.rewrite_url(url) {
            *url = rewritten;
        }
    }

    /// Rewrites every matching link in Markdown text outside fenced code.
    ///
    /// Fences nested in lists or blockquotes are recognized too: container
    /// prefixes are dropped before fence detection.
    pub fn rewrite(&self, text: &str) -> String {
        let mut state = FenceState::default();
        let mut output = String::with_capacity(text.len() + 64);

        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                output.push('\n');
            }
            let outcome = advance_fence_state(container_content(line), state);
            state = outcome.next_state;
            if outcome.in_fence() {
                output.push_str(line);
            } else {
                output.push_str(&self.rewrite_line(line));
            }
        }

        output
    }

    fn rewrite_line(&self, line: &str) -> String {
        self.pattern
            .replace_all(line, |caps: &Captures<'_>| {
                let tail = &caps[3];
                if tail.is_empty() || tail.chars().next().is_some_and(starts_path_tail) {
                    format!("{}{}{}", &caps[1], self.to, tail)
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned()
    }
}

impl Default for LinkRewriter {
    fn default() -> Self {
        DEFAULT_REWRITER.clone()
    }
}

/// Rewrites `/docs/...` links to `/docs-markdown/...`.
pub fn rewrite_doc_links(text: &str) -> String {
    DEFAULT_REWRITER.rewrite(text)
}

fn is_valid_prefix(prefix: &str) -> bool {
    prefix.len() > 1 && prefix.starts_with('/') && !prefix.chars().any(char::is_whitespace)
}

fn starts_path_tail(c: char) -> bool {
    matches!(c, '/' | '#' | '?')
}

/// Whether `longer` is `shorter` followed by a path, fragment or query.
fn extends(longer: &str, shorter: &str) -> bool {
    longer
        .strip_prefix(shorter)
        .and_then(|rest| rest.chars().next())
        .is_some_and(starts_path_tail)
}

/// Line content with blockquote markers and indentation removed.
fn container_content(line: &str) -> &str {
    let mut rest = line.trim_start();
    while let Some(inner) = rest.strip_prefix('>') {
        rest = inner.trim_start();
    }
    rest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_markdown_links() {
        assert_eq!(
            rewrite_doc_links("See [events](/docs/events) and [flow](/docs/guides/flow-control#x)."),
            "See [events](/docs-markdown/events) and [flow](/docs-markdown/guides/flow-control#x)."
        );
    }

    #[test]
    fn rewrites_bare_and_root_paths() {
        assert_eq!(
            rewrite_doc_links("Open /docs/quick-start or [home](/docs)."),
            "Open /docs-markdown/quick-start or [home](/docs-markdown)."
        );
    }

    #[test]
    fn leaves_external_and_lookalike_paths() {
        let input = "[ext](https://example.com/docs/events) [x](/docsify/a) [y](/api/docs/z)";
        assert_eq!(rewrite_doc_links(input), input);
    }

    #[test]
    fn leaves_fenced_code_alone() {
        let input = "```ts\nfetch(\"/docs/events\")\n```\n[a](/docs/a)";
        assert_eq!(
            rewrite_doc_links(input),
            "```ts\nfetch(\"/docs/events\")\n```\n[a](/docs-markdown/a)"
        );
    }

    #[test]
    fn leaves_nested_fences_alone() {
        let input = "- a\n  - b\n\n    ```js\n    fetch(\"/docs/events\")\n    ```\n\n[a](/docs/a)";
        assert_eq!(
            rewrite_doc_links(input),
            "- a\n  - b\n\n    ```js\n    fetch(\"/docs/events\")\n    ```\n\n[a](/docs-markdown/a)"
        );

        let quoted = "> ```\n> fetch(\"/docs/x\")\n> ```\n> See [x](/docs/x).";
        assert_eq!(
            rewrite_doc_links(quoted),
            "> ```\n> fetch(\"/docs/x\")\n> ```\n> See [x](/docs-markdown/x)."
        );
    }

    #[test]
    fn rewrites_urls_by_prefix() {
        let rewriter = LinkRewriter::default();
        assert_eq!(rewriter.rewrite_url("/docs/a#b").as_deref(), Some("/docs-markdown/a#b"));
        assert_eq!(rewriter.rewrite_url("/docs").as_deref(), Some("/docs-markdown"));
        assert_eq!(rewriter.rewrite_url("/docsify"), None);
        assert_eq!(rewriter.rewrite_url("https://example.com/docs/a"), None);
        assert_eq!(rewriter.rewrite_url("/docs-markdown/a"), None);
    }

    #[test]
    fn is_idempotent() {
        let inputs = [
            "[a](/docs/a) (/docs/b) /docs",
            "text with /docs-markdown/x already",
            "<a href=\"/docs/c\">c</a>",
            "",
            "```\n/docs/x\n```",
        ];
        for input in inputs {
            let once = rewrite_doc_links(input);
            assert_eq!(rewrite_doc_links(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn custom_prefixes() {
        let rewriter = LinkRewriter::new("/reference", "/reference.md").unwrap();
        assert_eq!(
            rewriter.rewrite("[r](/reference/api)"),
            "[r](/reference.md/api)"
        );
    }

    #[test]
    fn rejects_recursive_and_invalid_prefixes() {
        assert_eq!(
            LinkRewriter::new("/docs", "/docs/md").unwrap_err(),
            LinkRewriteError::Recursive {
                from: "/docs".to_string(),
                to: "/docs/md".to_string(),
            }
        );
        assert!(matches!(
            LinkRewriter::new("/x/y", "/x"),
            Err(LinkRewriteError::Recursive { .. })
        ));
        assert!(matches!(
            LinkRewriter::new("docs", "/md"),
            Err(LinkRewriteError::InvalidPrefix(_))
        ));
        assert!(matches!(
            LinkRewriter::new("/docs", "/a b"),
            Err(LinkRewriteError::InvalidPrefix(_))
        ));
    }
}
