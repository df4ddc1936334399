// src/ocr/source.rs
use async_trait::async_trait;
use reqwest::header;

use super::models::{artifacts_by_page, Block, BlockDump};
use crate::config::MAX_DOCUMENT_PAGES;
use crate::signals::PageArtifacts;
use crate::utils::error::SignalError;

/// Supplies the OCR artifacts of a document's pages.
///
/// `Ok(None)` means the page genuinely has no OCR output. Anything that
/// prevents knowing what is on the page must be an `Err`.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    fn page_count(&self) -> usize;

    async fn page_artifacts(&self, page: usize) -> Result<Option<PageArtifacts>, SignalError>;
}

fn check_page(page: usize, page_count: usize) -> Result<(), SignalError> {
    if page == 0 || page > page_count {
        return Err(SignalError::PageOutOfRange { page, page_count });
    }
    Ok(())
}

/// Artifacts already in memory, e.g. parsed from a saved forms-analysis dump.
#[derive(Debug, Clone, Default)]
pub struct LoadedArtifactSource {
    pages: Vec<Option<PageArtifacts>>,
}

impl LoadedArtifactSource {
    /// `pages[0]` is page 1.
    pub fn new(pages: Vec<Option<PageArtifacts>>) -> Self {
        Self { pages }
    }

    /// Page count is the highest page any block mentions, or `page_count`
    /// when given (the dump may not cover trailing blank pages). Either way
    /// it must not exceed [`MAX_DOCUMENT_PAGES`].
    pub fn from_blocks(blocks: &[Block], page_count: Option<usize>) -> Result<Self, SignalError> {
        let mut by_page = artifacts_by_page(blocks);
        let last_seen = by_page.keys().next_back().copied().unwrap_or(0);
        let page_count = page_count.unwrap_or(last_seen);
        if page_count > MAX_DOCUMENT_PAGES {
            return Err(SignalError::Parse(format!(
                "Block dump implies {} pages, more than the supported {}",
                page_count, MAX_DOCUMENT_PAGES
            )));
        }
        if last_seen > page_count {
            tracing::warn!(
                "Block dump mentions page {} but document has {} pages; ignoring the excess",
                last_seen,
                page_count
            );
        }

        let pages = (1..=page_count).map(|page| by_page.remove(&page)).collect();
        Ok(Self { pages })
    }

    /// An explicit `page_count` wins over the dump's `DocumentMetadata.Pages`.
    pub fn from_json(json: &str, page_count: Option<usize>) -> Result<Self, SignalError> {
        let dump = BlockDump::from_json(json)?;
        let page_count = page_count.or_else(|| dump.declared_pages());
        let blocks = dump.into_blocks();
        tracing::debug!("Parsed {} blocks from dump", blocks.len());
        Self::from_blocks(&blocks, page_count)
    }
}

#[async_trait]
impl ArtifactSource for LoadedArtifactSource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    async fn page_artifacts(&self, page: usize) -> Result<Option<PageArtifacts>, SignalError> {
        check_page(page, self.pages.len())?;
        Ok(self.pages[page - 1].clone())
    }
}

/// Artifacts served per page by an OCR/forms service over HTTP:
/// `GET {base_url}/pages/{page}` returning [`PageArtifacts`] JSON.
#[derive(Debug, Clone)]
pub struct HttpArtifactSource {
    client: reqwest::Client,
    base_url: String,
    page_count: usize,
}

impl HttpArtifactSource {
    /// The client is owned by the caller so connection pools and timeouts
    /// are configured once, outside this crate.
    pub fn new(client: reqwest::Client, base_url: &str, page_count: usize) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_count,
        }
    }

    pub fn page_url(&self, page: usize) -> String {
        format!("{}/pages/{}", self.base_url, page)
    }
}

#[async_trait]
impl ArtifactSource for HttpArtifactSource {
    fn page_count(&self) -> usize {
        self.page_count
    }

    async fn page_artifacts(&self, page: usize) -> Result<Option<PageArtifacts>, SignalError> {
        check_page(page, self.page_count)?;
        let url = self.page_url(page);
        tracing::debug!("Fetching OCR artifacts from: {}", url);

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!("No OCR artifacts for page {}", page);
            return Ok(None);
        }
        if !status.is_success() {
            tracing::error!("HTTP error status: {} for URL: {}", status, url);
            return Err(SignalError::Http { page, status });
        }

        let artifacts: PageArtifacts = response
            .json()
            .await
            .map_err(|e| SignalError::Parse(format!("page {}: {}", page, e)))?;
        Ok(Some(artifacts))
    }
}
