// src/segmentation/mod.rs
pub mod machine;
pub mod plan;
pub mod range;

// Re-export key segmentation types for convenience
pub use machine::{
    fold_signals, segment_candidates, AccountSegment, Checkpoint, PageSignal, PageTrace, SectionRanges,
    SegmentationResult, Segmenter, Transition, UnresolvedTail,
};
pub use plan::{Section, SliceJob, SlicePlan};
pub use range::{encode_range, parse_range};
