// src/signals/mod.rs
//! Page signal extraction: OCR artifacts of one page in, candidate account
//! numbers out.

pub mod candidates;
pub mod form;
pub mod marker;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{DocumentType, SegmenterConfig};
use crate::utils::error::ExtractError;

pub use candidates::{candidate_order, CandidateSet};
pub use form::FormSignalExtractor;
pub use marker::MarkerSignalExtractor;

/// OCR output for a single page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageArtifacts {
    /// Key/value pairs from form detection (key text -> value text).
    #[serde(default)]
    pub form_fields: BTreeMap<String, String>,
    /// Raw text lines in reading order.
    #[serde(default)]
    pub lines: Vec<String>,
}

impl PageArtifacts {
    pub fn is_empty(&self) -> bool {
        self.form_fields.is_empty() && self.lines.is_empty()
    }
}

/// One strategy for spotting account numbers on a page. Implementations are
/// pure and must not depend on neighbouring pages.
pub trait PageSignalExtractor: Send + Sync {
    fn strategy(&self) -> &'static str;

    fn extract(&self, artifacts: &PageArtifacts) -> CandidateSet;

    /// A page without OCR artifacts shows no account.
    fn extract_page(&self, artifacts: Option<&PageArtifacts>) -> CandidateSet {
        artifacts.map(|a| self.extract(a)).unwrap_or_default()
    }
}

/// Picks the strategy for the configured document convention.
pub fn build_extractor(config: &SegmenterConfig) -> Result<Box<dyn PageSignalExtractor>, ExtractError> {
    let extractor: Box<dyn PageSignalExtractor> = match config.document_type {
        DocumentType::LoanPacket => Box::new(FormSignalExtractor::new(config)?),
        DocumentType::MarkerStatement => Box::new(MarkerSignalExtractor::new(config)?),
    };
    tracing::debug!("Using '{}' page signal extractor", extractor.strategy());
    Ok(extractor)
}
