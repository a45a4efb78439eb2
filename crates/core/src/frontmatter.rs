use serde_json::Value as JsonValue;
use thiserror::Error;

/// A document split into its frontmatter block and Markdown body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontmatterSplit<'a> {
    /// Text between the `---` delimiters, when a closed block exists.
    pub raw: Option<&'a str>,
    /// Remaining document content.
    pub body: &'a str,
}

/// Errors emitted while parsing frontmatter metadata.
#[derive(Debug, Error)]
pub enum FrontmatterError {
    /// YAML failed to parse.
    #[error("Frontmatter parse error: {0}")]
    Parse(String),
    /// Top-level YAML node was not a mapping.
    #[error("Frontmatter must be a YAML mapping at the top level")]
    InvalidRootType,
}

/// Splits a leading `---` block from the document.
///
/// The opening delimiter must be the very first line (after an optional BOM).
/// An unterminated block is not frontmatter: the input comes back unchanged.
pub fn split_frontmatter(input: &str) -> FrontmatterSplit<'_> {
    let unchanged = FrontmatterSplit {
        raw: None,
        body: input,
    };
    let without_bom = strip_bom(input);

    let Some((first, block_start)) = next_line(without_bom, 0) else {
        return unchanged;
    };
    if !is_yaml_fence(first) {
        return unchanged;
    }

    let mut scan_cursor = block_start;
    while let Some((line, next_cursor)) = next_line(without_bom, scan_cursor) {
        if is_yaml_fence(line) {
            let raw = without_bom[block_start..scan_cursor].trim_end_matches(['\r', '\n']);
            let body = without_bom[next_cursor..].trim_start_matches(['\r', '\n']);
            return FrontmatterSplit {
                raw: Some(raw),
                body,
            };
        }
        scan_cursor = next_cursor;
    }

    unchanged
}

/// Removes a leading frontmatter block, returning the body.
pub fn strip_frontmatter(input: &str) -> &str {
    split_frontmatter(input).body
}

/// Parses a raw frontmatter block as a YAML mapping.
pub fn parse_frontmatter(block: &str) -> Result<JsonValue, FrontmatterError> {
    if block.trim().is_empty() {
        return Ok(JsonValue::Object(Default::default()));
    }

    let yaml_value: serde_yaml::Value =
        serde_yaml::from_str(block).map_err(|err| FrontmatterError::Parse(err.to_string()))?;
    let json_value =
        serde_json::to_value(yaml_value).map_err(|err| FrontmatterError::Parse(err.to_string()))?;

    match json_value {
        JsonValue::Null => Ok(JsonValue::Object(Default::default())),
        JsonValue::Object(_) => Ok(json_value),
        _ => Err(FrontmatterError::InvalidRootType),
    }
}

fn strip_bom(input: &str) -> &str {
    input.strip_prefix('\u{feff}').unwrap_or(input)
}

fn next_line(input: &str, start: usize) -> Option<(&str, usize)> {
    if start >= input.len() {
        return None;
    }

    let bytes = &input.as_bytes()[start..];
    if let Some(pos) = bytes.iter().position(|b| *b == b'\n') {
        let line_end = start + pos;
        let line = &input[start..line_end];
        Some((line, line_end + 1))
    } else {
        Some((&input[start..], input.len()))
    }
}

fn is_yaml_fence(line: &str) -> bool {
    line.trim_end_matches('\r') == "---"
}
