//! Batch conversion types and the parallel driver.

use std::time::Instant;

use docmd_core::{BatchItem, ConvertOptions, FsSnippetSource, SnippetSource, convert_batch};
use napi_derive::napi;

use crate::types::{ConvertConfig, ConvertResult, FileInputType};

/// Input for batch processing - a single document to convert.
#[napi(object)]
#[derive(Debug, Clone)]
pub struct BatchInput {
    /// Document identifier (typically the logical path).
    pub id: String,
    /// MDX or Markdown source.
    pub source: String,
    /// Dialect override for this document.
    pub file_type: Option<FileInputType>,
}

/// Result for a single document in a batch.
#[napi(object)]
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Identifier matching the input.
    pub id: String,
    /// Conversion result (present on success).
    pub result: Option<ConvertResult>,
    /// Error message (present on failure).
    pub error: Option<String>,
}

/// Statistics for batch processing.
#[napi(object)]
#[derive(Debug, Clone)]
pub struct BatchStats {
    /// Total number of documents processed.
    pub total: u32,
    /// Number of successful conversions.
    pub succeeded: u32,
    /// Number of failed conversions.
    pub failed: u32,
    /// Total processing time in milliseconds.
    pub processing_time_ms: f64,
}

/// Options for batch processing.
#[napi(object)]
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Maximum number of threads to use. Defaults to number of CPU cores.
    pub max_threads: Option<u32>,
    /// Conversion options applied to every document.
    pub config: Option<ConvertConfig>,
}

/// Results in input order plus statistics.
#[napi(object)]
#[derive(Debug, Clone)]
pub struct BatchProcessingResult {
    /// Individual results for each input document.
    pub results: Vec<BatchResult>,
    /// Processing statistics.
    pub stats: BatchStats,
}

pub(crate) fn run_batch(
    inputs: Vec<BatchInput>,
    options: BatchOptions,
) -> napi::Result<BatchProcessingResult> {
    let start = Instant::now();
    let config = options.config.unwrap_or_default();
    let convert_options = config.to_options(ConvertOptions::default())?;
    let snippets = config.snippet_root.as_deref().map(FsSnippetSource::new);

    let items: Vec<BatchItem> = inputs
        .into_iter()
        .map(|input| BatchItem {
            id: input.id,
            source: input.source,
            syntax: input.file_type.map(Into::into),
        })
        .collect();
    let total = items.len() as u32;

    // Configure thread pool if max_threads is specified
    let pool = options.max_threads.and_then(|max_threads| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(max_threads as usize)
            .build()
            .ok()
    });

    let run = || {
        convert_batch(
            items,
            &convert_options,
            snippets.as_ref().map(|s| s as &dyn SnippetSource),
        )
    };
    let outcomes = match pool {
        Some(pool) => pool.install(run),
        None => run(),
    };

    let results: Vec<BatchResult> = outcomes
        .into_iter()
        .map(|outcome| match outcome.result {
            Ok(doc) => BatchResult {
                id: outcome.id,
                result: Some(doc.into()),
                error: None,
            },
            Err(err) => BatchResult {
                id: outcome.id,
                result: None,
                error: Some(err.to_string()),
            },
        })
        .collect();
    let failed = results.iter().filter(|r| r.error.is_some()).count() as u32;

    Ok(BatchProcessingResult {
        results,
        stats: BatchStats {
            total,
            succeeded: total - failed,
            failed,
            processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_per_item_errors_in_order() {
        let inputs = vec![
            BatchInput {
                id: "ok".to_string(),
                source: "<Note>Fine.</Note>".to_string(),
                file_type: None,
            },
            BatchInput {
                id: "broken".to_string(),
                source: "<Note>\n\nunclosed".to_string(),
                file_type: None,
            },
            BatchInput {
                id: "html".to_string(),
                source: "<br>".to_string(),
                file_type: Some(FileInputType::Markdown),
            },
        ];
        let result = run_batch(
            inputs,
            BatchOptions {
                max_threads: Some(2),
                config: None,
            },
        )
        .unwrap();

        assert_eq!(result.stats.total, 3);
        assert_eq!(result.stats.failed, 1);
        assert_eq!(result.stats.succeeded, 2);
        let ids: Vec<_> = result.results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["ok", "broken", "html"]);
        assert_eq!(
            result.results[0].result.as_ref().unwrap().markdown,
            "> **Note:** Fine."
        );
        assert!(result.results[1].error.is_some());
        assert_eq!(result.results[2].result.as_ref().unwrap().markdown, "<br>");
    }
}
