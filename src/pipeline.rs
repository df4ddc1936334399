// src/pipeline.rs
//! One document through signal gathering and the segmentation fold.

use futures::StreamExt;

use crate::ocr::{signal_stream, ArtifactSource, GatherOptions};
use crate::segmentation::{PageTrace, SegmentationResult, Segmenter};
use crate::signals::PageSignalExtractor;
use crate::utils::error::SegmentError;

#[derive(Debug, Clone)]
pub struct SegmentationRun {
    pub result: SegmentationResult,
    pub trace: Vec<PageTrace>,
    pub page_count: usize,
}

/// Segments a whole document, page 1 onward.
pub async fn segment_document<S>(
    source: &S,
    extractor: &dyn PageSignalExtractor,
    options: GatherOptions,
) -> Result<SegmentationRun, SegmentError>
where
    S: ArtifactSource + ?Sized,
{
    resume_document(Segmenter::new(), source, extractor, options).await
}

/// Continues a fold from `segmenter.next_page()`, typically the checkpoint
/// of an earlier failed run, so only the unresolved tail is re-fetched.
pub async fn resume_document<S>(
    mut segmenter: Segmenter,
    source: &S,
    extractor: &dyn PageSignalExtractor,
    options: GatherOptions,
) -> Result<SegmentationRun, SegmentError>
where
    S: ArtifactSource + ?Sized,
{
    let page_count = source.page_count();
    let first_page = segmenter.next_page();
    tracing::info!(
        "Segmenting pages {}-{} with '{}' extractor (concurrency {})",
        first_page,
        page_count,
        extractor.strategy(),
        options.concurrency
    );

    let mut signals = std::pin::pin!(signal_stream(source, extractor, first_page..=page_count, options));
    while let Some(signal) = signals.next().await {
        match signal {
            Ok(candidates) => {
                segmenter.push(candidates);
            }
            Err(cause) => {
                let remaining = page_count - segmenter.next_page();
                return Err(segmenter.fail(cause, remaining));
            }
        }
    }

    let (result, trace) = segmenter.finish_with_trace();
    tracing::info!(
        "Segmentation finished: {} account run(s), {} page(s) dropped",
        result.len(),
        result.dropped_pages().len()
    );
    Ok(SegmentationRun { result, trace, page_count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SegmenterConfig;
    use crate::ocr::{gather_signals, LoadedArtifactSource};
    use crate::segmentation::{SectionRanges, UnresolvedTail};
    use crate::signals::{build_extractor, PageArtifacts};
    use crate::utils::error::SignalError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn form_page(account: &str) -> Option<PageArtifacts> {
        let mut artifacts = PageArtifacts::default();
        artifacts.form_fields.insert("Account Number".to_string(), account.to_string());
        Some(artifacts)
    }

    fn text_page(line: &str) -> Option<PageArtifacts> {
        Some(PageArtifacts {
            lines: vec![line.to_string()],
            ..Default::default()
        })
    }

    fn ranges(extraction: &str, attachments: &str) -> SectionRanges {
        SectionRanges {
            extraction: extraction.to_string(),
            attachments: attachments.to_string(),
        }
    }

    #[derive(Clone, Copy)]
    enum Behaviour {
        Fail,
        Hang,
        Slow(u64),
    }

    /// Wraps a loaded source, misbehaving on selected pages.
    struct FlakySource {
        inner: LoadedArtifactSource,
        page: usize,
        behaviour: Behaviour,
        healed: AtomicBool,
    }

    impl FlakySource {
        fn new(pages: Vec<Option<PageArtifacts>>, page: usize, behaviour: Behaviour) -> Self {
            Self {
                inner: LoadedArtifactSource::new(pages),
                page,
                behaviour,
                healed: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl ArtifactSource for FlakySource {
        fn page_count(&self) -> usize {
            self.inner.page_count()
        }

        async fn page_artifacts(&self, page: usize) -> Result<Option<PageArtifacts>, SignalError> {
            if page == self.page && !self.healed.load(Ordering::SeqCst) {
                match self.behaviour {
                    Behaviour::Fail => return Err(SignalError::Source("forms service returned 503".to_string())),
                    Behaviour::Hang => tokio::time::sleep(Duration::from_secs(3600)).await,
                    Behaviour::Slow(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
                }
            }
            self.inner.page_artifacts(page).await
        }
    }

    fn packet() -> Vec<Option<PageArtifacts>> {
        vec![
            None,
            form_page("1234-5678"),
            text_page("Account No: 12345678"),
            text_page("Pay stub, no marker"),
            None,
            form_page("99 88 77 66"),
            text_page("Driver license"),
        ]
    }

    #[test]
    fn test_segment_document_end_to_end() {
        let source = LoadedArtifactSource::new(packet());
        let extractor = build_extractor(&SegmenterConfig::default()).unwrap();

        let run = tokio_test::block_on(segment_document(&source, extractor.as_ref(), GatherOptions::default())).unwrap();
        assert_eq!(run.page_count, 7);
        assert_eq!(run.trace.len(), 7);
        assert_eq!(
            run.result.descriptor_entries(),
            vec![
                ("12345678".to_string(), ranges("2-3", "4-5")),
                ("99887766".to_string(), ranges("6", "7")),
            ]
        );
        assert_eq!(run.result.dropped_pages(), &[1]);
    }

    #[tokio::test]
    async fn test_slow_early_page_keeps_page_order() {
        let source = FlakySource::new(packet(), 2, Behaviour::Slow(50));
        let extractor = build_extractor(&SegmenterConfig::default()).unwrap();
        let options = GatherOptions { concurrency: 4, page_timeout: Duration::from_secs(5) };

        let signals = gather_signals(&source, extractor.as_ref(), options).await;
        let firsts: Vec<Option<String>> = signals
            .iter()
            .map(|s| s.as_ref().unwrap().iter().next().map(str::to_string))
            .collect();
        assert_eq!(firsts[1].as_deref(), Some("12345678"));
        assert_eq!(firsts[5].as_deref(), Some("99887766"));
        assert!(firsts[3].is_none());
    }

    #[tokio::test]
    async fn test_failure_reports_partial_result_and_resumes() {
        let source = FlakySource::new(packet(), 4, Behaviour::Fail);
        let extractor = build_extractor(&SegmenterConfig::default()).unwrap();

        let err = segment_document(&source, extractor.as_ref(), GatherOptions::default())
            .await
            .unwrap_err();
        let incomplete = err.into_incomplete();
        assert_eq!(incomplete.page, 4);
        assert_eq!(incomplete.unresolved, UnresolvedTail { first_page: 4, last_page: 7 });
        assert_eq!(
            incomplete.partial.descriptor_entries(),
            vec![("12345678".to_string(), ranges("2-3", ""))]
        );

        // Retry only the tail once the collaborator recovers.
        source.healed.store(true, Ordering::SeqCst);
        let resumed = resume_document(incomplete.checkpoint, &source, extractor.as_ref(), GatherOptions::default())
            .await
            .unwrap();
        let clean = segment_document(&LoadedArtifactSource::new(packet()), extractor.as_ref(), GatherOptions::default())
            .await
            .unwrap();
        assert_eq!(resumed.result, clean.result);
        assert_eq!(resumed.trace, clean.trace);
    }

    #[tokio::test]
    async fn test_timeout_is_not_an_empty_page() {
        let source = FlakySource::new(packet(), 5, Behaviour::Hang);
        let extractor = build_extractor(&SegmenterConfig::default()).unwrap();
        let options = GatherOptions { concurrency: 2, page_timeout: Duration::from_millis(50) };

        let err = segment_document(&source, extractor.as_ref(), options).await.unwrap_err();
        let incomplete = err.incomplete();
        assert!(matches!(incomplete.cause, SignalError::Timeout { page: 5, .. }));
        assert_eq!(incomplete.unresolved.pages(), 5..=7);
        // Page 4 was resolved as an attachment; page 5 was not.
        assert_eq!(
            incomplete.partial.get("12345678").unwrap().attachment_pages,
            vec![4]
        );
    }

    #[test]
    fn test_empty_document() {
        let source = LoadedArtifactSource::default();
        let extractor = build_extractor(&SegmenterConfig::default()).unwrap();
        let run = tokio_test::block_on(segment_document(&source, extractor.as_ref(), GatherOptions::default())).unwrap();
        assert!(run.result.is_empty());
        assert_eq!(run.page_count, 0);
    }
}
