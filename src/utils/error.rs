// src/utils/error.rs
use std::time::Duration;
use thiserror::Error;

use crate::segmentation::machine::{SegmentationResult, Segmenter, UnresolvedTail};

// Failure of the collaborator that supplies a page's OCR artifacts.
// Never to be confused with "no account visible on this page".
#[derive(Error, Debug)]
pub enum SignalError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error {status} for page {page}")]
    Http { page: usize, status: reqwest::StatusCode },

    #[error("Signal extraction for page {page} timed out after {after:?}")]
    Timeout { page: usize, after: Duration },

    #[error("Page {page} is outside the document ({page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("Failed to parse OCR artifacts: {0}")]
    Parse(String),

    #[error("Artifact source failed: {0}")]
    Source(String),
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Regular expression error: {0}")]
    RegexError(String),

    #[error("Invalid extractor configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RangeError {
    #[error("Malformed range descriptor: {0:?}")]
    Malformed(String),

    #[error("Range descriptor {0:?} is descending")]
    Descending(String),

    #[error("Page indices are 1-based, got 0 in {0:?}")]
    ZeroPage(String),
}

/// Everything a caller needs after a hard failure part-way through a document.
#[derive(Debug)]
pub struct IncompleteSegmentation {
    /// Page whose signal could not be determined.
    pub page: usize,
    pub cause: SignalError,
    /// Entries flushed before the failing page, plus the account that was
    /// current, flushed through the previous page.
    pub partial: SegmentationResult,
    pub unresolved: UnresolvedTail,
    /// State machine as of just before `page`; fold the retried tail into it.
    pub checkpoint: Segmenter,
}

#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("Signal extraction failed on page {}: {}", .0.page, .0.cause)]
    SignalExtraction(Box<IncompleteSegmentation>),
}

impl SegmentError {
    pub fn incomplete(&self) -> &IncompleteSegmentation {
        match self {
            SegmentError::SignalExtraction(inner) => inner,
        }
    }

    pub fn into_incomplete(self) -> IncompleteSegmentation {
        match self {
            SegmentError::SignalExtraction(inner) => *inner,
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Signal source failed: {0}")]
    Signal(#[from] SignalError),

    #[error("Extractor setup failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Segmentation failed: {0}")]
    Segmentation(#[from] SegmentError),

    #[error("Range error: {0}")]
    Range(#[from] RangeError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
