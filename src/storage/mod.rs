// src/storage/mod.rs
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::DocumentType;
use crate::segmentation::{Checkpoint, SegmentationResult, SlicePlan, UnresolvedTail};
use crate::utils::error::{IncompleteSegmentation, StorageError};

pub const RESULT_FILE: &str = "segmentation.json";
pub const METADATA_FILE: &str = "segmentation_meta.json";
pub const SLICE_PLAN_FILE: &str = "slice_plan.json";
pub const UNRESOLVED_FILE: &str = "unresolved.json";
pub const PAGE_TRACE_FILE: &str = "page_trace.txt";

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    /// `<base_dir>/<document_id>/`, created on demand.
    pub fn document_dir(&self, document_id: &str) -> Result<PathBuf, StorageError> {
        let target_dir = self.base_dir.join(document_id);
        if !target_dir.exists() {
            fs::create_dir_all(&target_dir).map_err(StorageError::IoError)?;
        }
        Ok(target_dir)
    }

    fn write_json<T: Serialize + ?Sized>(&self, document_id: &str, filename: &str, value: &T) -> Result<PathBuf, StorageError> {
        let file_path = self.document_dir(document_id)?.join(filename);

        let json = serde_json::to_string_pretty(value)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, json).map_err(StorageError::IoError)?;

        tracing::info!("Saved {} to {}", filename, file_path.display());
        Ok(file_path)
    }

    /// Saves the account -> range descriptor map the slicing stage consumes.
    pub fn save_result(&self, document_id: &str, result: &SegmentationResult) -> Result<PathBuf, StorageError> {
        self.write_json(document_id, RESULT_FILE, result)
    }

    /// Saves run metadata in JSON format
    pub fn save_result_metadata(
        &self,
        document_id: &str,
        document_type: DocumentType,
        page_count: usize,
        result: &SegmentationResult,
        unresolved: Option<&UnresolvedTail>,
    ) -> Result<PathBuf, StorageError> {
        let accounts: Vec<serde_json::Value> = result
            .segments()
            .iter()
            .map(|segment| {
                serde_json::json!({
                    "account_number": segment.account_number,
                    "extraction_pages": segment.extraction_pages,
                    "attachment_pages": segment.attachment_pages,
                })
            })
            .collect();

        let metadata = serde_json::json!({
            "document_id": document_id,
            "document_type": document_type,
            "page_count": page_count,
            "account_runs": result.len(),
            "accounts": accounts,
            "dropped_pages": result.dropped_pages(),
            "unresolved": unresolved,
            "segmentation_timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.write_json(document_id, METADATA_FILE, &metadata)
    }

    pub fn save_slice_plan(&self, document_id: &str, plan: &SlicePlan) -> Result<PathBuf, StorageError> {
        self.write_json(document_id, SLICE_PLAN_FILE, plan)
    }

    /// Marks the pages a retry has to cover after a signal failure.
    pub fn save_unresolved(&self, document_id: &str, incomplete: &IncompleteSegmentation) -> Result<PathBuf, StorageError> {
        let marker = serde_json::json!({
            "document_id": document_id,
            "failed_page": incomplete.page,
            "cause": incomplete.cause.to_string(),
            "unresolved": incomplete.unresolved,
            "resume_from_page": incomplete.checkpoint.next_page(),
            "checkpoint": incomplete.checkpoint.checkpoint(),
        });
        self.write_json(document_id, UNRESOLVED_FILE, &marker)
    }
}

#[derive(Deserialize)]
struct UnresolvedMarker {
    checkpoint: Checkpoint,
}

/// Reads the fold checkpoint back out of an `unresolved.json` marker.
pub fn load_checkpoint<P: AsRef<Path>>(path: P) -> Result<Checkpoint, StorageError> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(StorageError::IoError)?;
    let marker: UnresolvedMarker = serde_json::from_str(&json).map_err(|e| {
        StorageError::SerializationError(format!("Invalid unresolved marker {}: {}", path.display(), e))
    })?;
    tracing::info!(
        "Loaded checkpoint from {}: resuming at page {}",
        path.display(),
        marker.checkpoint.next_page
    );
    Ok(marker.checkpoint)
}
