use std::path::PathBuf;
use thiserror::Error;

/// Source location information for error reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Optional file path
    pub file: Option<String>,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

impl SourceLocation {
    /// Create a new source location
    pub fn new(line: usize, column: usize) -> Self {
        Self {
            file: None,
            line,
            column,
        }
    }

    /// Create a source location with file information
    pub fn with_file(file: String, line: usize, column: usize) -> Self {
        Self {
            file: Some(file),
            line,
            column,
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}:{}:{}", file, self.line, self.column)
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// Errors surfaced to callers of the conversion pipeline.
#[derive(Debug, Error)]
pub enum DocError {
    /// IO error while reading a source document.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// No source file exists for the logical documentation path.
    #[error("Document not found: {path}")]
    NotFound {
        /// Logical path as requested by the caller.
        path: String,
    },
    /// The resolved file lies outside the documentation root.
    #[error("Access denied: {}", path.display())]
    AccessDenied {
        /// Resolved file path.
        path: PathBuf,
    },
    /// The MDX source could not be parsed (unbalanced or malformed component markup).
    #[error("Conversion failed at {location}: {message}")]
    ConversionFailed {
        /// Parser message.
        message: String,
        /// Source location
        location: SourceLocation,
    },
    /// Invalid conversion options.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

impl DocError {
    /// Create a conversion error with location
    pub fn conversion_failed(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::ConversionFailed {
            message: message.into(),
            location: SourceLocation::new(line, column),
        }
    }

    /// Attach a file path to the location of a conversion error.
    pub fn with_file(self, file: impl Into<String>) -> Self {
        match self {
            Self::ConversionFailed { message, location } => Self::ConversionFailed {
                message,
                location: SourceLocation::with_file(file.into(), location.line, location.column),
            },
            other => other,
        }
    }
}

/// Non-fatal warnings collected while converting a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertWarning {
    /// A snippet reference could not be resolved; a placeholder was emitted.
    UnresolvedSnippet {
        /// Line of the snippet marker in the document body (1-indexed).
        line: usize,
        /// Snippet path as written in the marker.
        path: String,
        /// Why the snippet could not be read.
        reason: String,
    },
    /// The frontmatter block is not valid YAML; metadata was left empty.
    InvalidFrontmatter {
        /// Parser message.
        message: String,
    },
}

impl std::fmt::Display for ConvertWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvertWarning::UnresolvedSnippet { line, path, reason } => {
                write!(f, "line {}: failed to load snippet {}: {}", line, path, reason)
            }
            ConvertWarning::InvalidFrontmatter { message } => {
                write!(f, "invalid frontmatter: {}", message)
            }
        }
    }
}

/// Collection of conversion diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// List of non-fatal warnings
    pub warnings: Vec<ConvertWarning>,
}

impl Diagnostics {
    /// Create a new empty diagnostics collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a warning to the diagnostics collection
    pub fn add_warning(&mut self, warning: ConvertWarning) {
        self.warnings.push(warning);
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Number of unresolved snippet references.
    pub fn unresolved_snippets(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, ConvertWarning::UnresolvedSnippet { .. }))
            .count()
    }
}
