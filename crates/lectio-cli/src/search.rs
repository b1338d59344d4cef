//! Search execution for the CLI: live, streamed, and local modes.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use lectio_core::index::{ContentType, DocumentMeta};
use lectio_core::live::sse;
use lectio_core::search::{SearchEngine, SearchResult};
use lectio_core::{LiveSearchConfig, LiveSearchEngine, SearchError};

/// Runs one live search to completion.
pub async fn execute_live(
    query: &str,
    limit: usize,
    config: LiveSearchConfig,
    cancel: &CancellationToken,
) -> Result<SearchResult> {
    let engine = LiveSearchEngine::new(config);
    engine
        .search(query, limit, cancel)
        .await
        .map_err(|e| match e {
            SearchError::Cancelled => anyhow!("search cancelled"),
        })
}

/// Runs a streamed live search, writing each phase to stdout as a
/// server-sent event, flushed as soon as it is available.
pub async fn execute_streamed(
    query: &str,
    limit: usize,
    config: LiveSearchConfig,
    cancel: &CancellationToken,
) -> Result<()> {
    let engine = LiveSearchEngine::new(config);
    let (tx, mut rx) = mpsc::channel(2);

    let mut stdout = tokio::io::stdout();
    let search = engine.search_streamed(query, limit, tx, cancel);
    tokio::pin!(search);

    let mut search_done = false;
    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(event) => sse::write_event(&mut stdout, &event)
                        .await
                        .context("writing event stream")?,
                    None => break,
                }
            }
            outcome = &mut search, if !search_done => {
                outcome.map_err(|e| match e {
                    SearchError::Cancelled => anyhow!("search cancelled"),
                })?;
                search_done = true;
            }
        }
    }
    Ok(())
}

/// Indexes a directory of documents and searches it.
///
/// Markdown and plain text files are indexed verbatim; HTML files go
/// through the extractor. Anything else is skipped.
pub fn execute_local(query: &str, limit: usize, index_dir: &Path) -> Result<SearchResult> {
    let engine = SearchEngine::new();
    let entries = fs::read_dir(index_dir)
        .with_context(|| format!("reading index directory {}", index_dir.display()))?;

    let mut indexed = 0usize;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let content_type = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("md") | Some("markdown") | Some("txt") => ContentType::Markdown,
            Some("html") | Some("htm") => ContentType::Html,
            other => {
                warn!("skipping {:?}: unsupported extension {:?}", path, other);
                continue;
            }
        };
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("skipping {:?}: {}", path, e);
                continue;
            }
        };
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let id = path.display().to_string();
        let meta =
            DocumentMeta::local(id, title, content_type).with_source_path(path.clone());
        engine.index_text(meta, &content);
        indexed += 1;
    }
    info!("indexed {} documents from {}", indexed, index_dir.display());

    Ok(engine.search(query, limit, None))
}
