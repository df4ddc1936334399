// src/ocr/gather.rs
use std::ops::RangeInclusive;
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};

use super::source::ArtifactSource;
use crate::config::SegmenterConfig;
use crate::segmentation::PageSignal;
use crate::signals::PageSignalExtractor;
use crate::utils::error::SignalError;

#[derive(Debug, Clone, Copy)]
pub struct GatherOptions {
    /// Upper bound on pages fetched at once.
    pub concurrency: usize,
    pub page_timeout: Duration,
}

impl From<&SegmenterConfig> for GatherOptions {
    fn from(config: &SegmenterConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            page_timeout: config.page_timeout,
        }
    }
}

impl Default for GatherOptions {
    fn default() -> Self {
        Self::from(&SegmenterConfig::default())
    }
}

/// Fetches one page's artifacts and runs the extractor over them.
/// A timed-out fetch is reported as such, never as an empty page.
pub async fn page_signal<S>(
    source: &S,
    extractor: &dyn PageSignalExtractor,
    page: usize,
    timeout: Duration,
) -> PageSignal
where
    S: ArtifactSource + ?Sized,
{
    match tokio::time::timeout(timeout, source.page_artifacts(page)).await {
        Ok(Ok(artifacts)) => {
            let candidates = extractor.extract_page(artifacts.as_ref());
            tracing::debug!("Page {}: candidates {:?}", page, candidates.as_slice());
            Ok(candidates)
        }
        Ok(Err(e)) => {
            tracing::warn!("Page {}: artifact source failed: {}", page, e);
            Err(e)
        }
        Err(_) => {
            tracing::warn!("Page {}: artifact source timed out after {:?}", page, timeout);
            Err(SignalError::Timeout { page, after: timeout })
        }
    }
}

/// Page signals for `pages`, fetched up to `concurrency` at a time but
/// yielded strictly in page order.
pub fn signal_stream<'a, S>(
    source: &'a S,
    extractor: &'a dyn PageSignalExtractor,
    pages: RangeInclusive<usize>,
    options: GatherOptions,
) -> impl Stream<Item = PageSignal> + 'a
where
    S: ArtifactSource + ?Sized + 'a,
{
    stream::iter(pages)
        .map(move |page| page_signal(source, extractor, page, options.page_timeout))
        .buffered(options.concurrency.max(1))
}

/// Collects every page's signal, failures included, in page order.
pub async fn gather_signals<S>(
    source: &S,
    extractor: &dyn PageSignalExtractor,
    options: GatherOptions,
) -> Vec<PageSignal>
where
    S: ArtifactSource + ?Sized,
{
    signal_stream(source, extractor, 1..=source.page_count(), options)
        .collect()
        .await
}
