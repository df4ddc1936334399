// src/ocr/mod.rs
//! Collaborators that supply per-page OCR artifacts.

pub mod gather;
pub mod models;
pub mod source;

pub use gather::{gather_signals, page_signal, signal_stream, GatherOptions};
pub use models::{artifacts_by_page, Block, BlockDump, DocumentMetadata};
pub use source::{ArtifactSource, HttpArtifactSource, LoadedArtifactSource};
