// src/lib.rs
//! Account boundary segmentation for combined multi-account loan packets.
//!
//! Each page's OCR artifacts are reduced to candidate account numbers
//! ([`signals`]), the candidates are folded in page order into per-account
//! extraction/attachment runs ([`segmentation`]), and the runs are encoded as
//! the range descriptors the PDF slicing stage consumes.

pub mod config;
pub mod ocr;
pub mod pipeline;
pub mod segmentation;
pub mod signals;
pub mod storage;
pub mod utils;

pub use config::{DocumentType, SegmenterConfig};
pub use pipeline::{resume_document, segment_document, SegmentationRun};
pub use segmentation::{
    encode_range, fold_signals, parse_range, segment_candidates, Checkpoint, PageSignal, SectionRanges,
    SegmentationResult, Segmenter, SlicePlan, UnresolvedTail,
};
pub use signals::{build_extractor, CandidateSet, PageArtifacts, PageSignalExtractor};
pub use utils::error::{IncompleteSegmentation, SegmentError, SignalError};
