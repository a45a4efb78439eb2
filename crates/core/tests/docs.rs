use std::path::PathBuf;

use docmd_core::{ConvertOptions, DocError, DocsRoot, FsSnippetSource, render_llms_full};

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn docs() -> DocsRoot {
    DocsRoot::new(fixtures().join("docs"))
}

#[test]
fn discovers_logical_paths() {
    assert_eq!(
        docs().discover().unwrap(),
        vec![
            "",
            "guides",
            "guides/debounce",
            "guides/flow-control",
            "quick-start",
            "reference/events",
        ]
    );
}

#[test]
fn resolves_candidates_in_order() {
    let root = docs();
    assert!(root.resolve("quick-start").unwrap().ends_with("quick-start.mdx"));
    assert!(root.resolve("/docs/guides").unwrap().ends_with("guides/index.mdx"));
    assert!(root.resolve("reference/events").unwrap().ends_with("reference/events.md"));
    assert!(root.resolve("").unwrap().ends_with("index.mdx"));
}

#[test]
fn traversal_never_leaves_the_root() {
    let err = docs().resolve("../../Cargo").unwrap_err();
    assert!(matches!(err, DocError::NotFound { .. }), "{err:?}");

    let err = docs().resolve("guides/missing").unwrap_err();
    assert!(matches!(err, DocError::NotFound { ref path } if path == "guides/missing"));
}

#[cfg(unix)]
#[test]
fn symlinks_out_of_the_root_are_denied() {
    let base = std::env::temp_dir().join(format!("docmd-symlink-{}", std::process::id()));
    let docs_dir = base.join("docs");
    std::fs::create_dir_all(&docs_dir).unwrap();
    std::fs::write(base.join("secret.mdx"), "# Secret").unwrap();
    let link = docs_dir.join("leak.mdx");
    let _ = std::fs::remove_file(&link);
    std::os::unix::fs::symlink(base.join("secret.mdx"), &link).unwrap();

    let err = DocsRoot::new(&docs_dir).resolve("leak").unwrap_err();
    assert!(matches!(err, DocError::AccessDenied { .. }), "{err:?}");

    std::fs::remove_dir_all(&base).ok();
}

#[test]
fn converts_mdx_page_for_the_endpoint() {
    let doc = docs()
        .convert("quick-start", &ConvertOptions::for_endpoint(), None)
        .unwrap();
    assert_eq!(doc.frontmatter["title"], "Quick start");
    assert_eq!(
        doc.markdown,
        "# Quick start\n\n### Install the SDK\n\nAdd the package to your project.\n\n### Send an event\n\nCall `send` from your backend.\n\n[Next: flow control](/docs-markdown/guides/flow-control)"
    );
}

#[test]
fn converts_guide_sections() {
    let doc = docs().convert("guides", &ConvertOptions::default(), None).unwrap();
    assert_eq!(
        doc.markdown,
        "# Guides\n\n#### TypeScript\n\nUse the TypeScript SDK.\n\n#### Python\n\nUse the Python SDK."
    );
}

#[test]
fn converts_page_with_snippet() {
    let snippets = FsSnippetSource::new(fixtures());
    let doc = docs()
        .convert("guides/debounce", &ConvertOptions::for_endpoint(), Some(&snippets))
        .unwrap();
    insta::assert_snapshot!(doc.markdown, @r#"
    # Debounce

    Send the event:

    ```py title="send.py"
    await client.send(
        inngest.Event(
            name="app/user.signup",
            data={"user_id": "u_123"},
        )
    )
    ```

    > **Tip:** Debounce delays execution until events stop arriving.

    Read more in the [reference](/docs-markdown/reference/events).
    "#);
}

#[test]
fn markdown_pages_keep_raw_html() {
    let doc = docs()
        .convert("reference/events", &ConvertOptions::for_endpoint(), None)
        .unwrap();
    assert_eq!(
        doc.markdown,
        "# Events\n\n<div class=\"badge\">beta</div>\n\nEvents are JSON objects. See [sending events](/docs-markdown/guides/debounce)."
    );
}

#[test]
fn conversion_errors_name_the_file() {
    let base = std::env::temp_dir().join(format!("docmd-broken-{}", std::process::id()));
    std::fs::create_dir_all(&base).unwrap();
    std::fs::write(base.join("broken.mdx"), "# Broken\n\n<Note>\n\nunclosed").unwrap();

    let err = DocsRoot::new(&base)
        .convert("broken", &ConvertOptions::default(), None)
        .unwrap_err();
    match err {
        DocError::ConversionFailed { location, .. } => {
            assert!(location.file.unwrap().ends_with("broken.mdx"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    std::fs::remove_dir_all(&base).ok();
}

#[test]
fn builds_the_llms_full_corpus() {
    let snippets = FsSnippetSource::new(fixtures());
    let corpus = docs()
        .convert_all(&ConvertOptions::for_endpoint(), Some(&snippets))
        .unwrap();
    let paths: Vec<&str> = corpus.iter().map(|doc| doc.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "guides/debounce.mdx",
            "guides/flow-control.mdx",
            "guides/index.mdx",
            "index.mdx",
            "quick-start.mdx",
            "reference/events.md",
        ]
    );
    let flow = &corpus[1];
    assert_eq!(flow.title.as_deref(), Some("Flow control"));
    assert_eq!(flow.description.as_deref(), Some("Manage how functions run."));
    assert_eq!(corpus[3].title.as_deref(), Some("Documentation"));
    assert_eq!(corpus[5].title, None);

    let full = render_llms_full("Inngest", &corpus);
    assert!(full.starts_with("# Inngest Documentation for LLMs\n\nTotal documents: 6\n\n=== Document: guides/debounce.mdx ===\nTitle: Debounce\n\n# Debounce"));
    assert!(full.contains("\n\n---\n=== Document: guides/flow-control.mdx ===\nTitle: Flow control\nDescription: Manage how functions run.\n\n"));
    assert_eq!(full.matches("=== Document: ").count(), 6);
}
