// src/main.rs
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use account_segmenter::config::{
    DocumentType, SegmenterConfig, DEFAULT_CONCURRENCY, DEFAULT_MARKER, DEFAULT_MAX_DIGITS,
    DEFAULT_MIN_DIGITS, DEFAULT_PAGE_TIMEOUT_SECS,
};
use account_segmenter::ocr::{ArtifactSource, GatherOptions, HttpArtifactSource, LoadedArtifactSource};
use account_segmenter::segmentation::SlicePlan;
use account_segmenter::signals::build_extractor;
use account_segmenter::storage::{load_checkpoint, StorageManager, PAGE_TRACE_FILE};
use account_segmenter::utils::{self, AppError};
use account_segmenter::{resume_document, Segmenter, SignalError};

/// Splits a combined loan packet into per-account extraction/attachment page ranges
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Forms-analysis block dump (JSON) of the combined document
    #[arg(short, long, conflicts_with = "service_url")]
    blocks: Option<PathBuf>,

    /// Base URL of an OCR artifact service answering GET {url}/pages/{n}
    #[arg(long, requires = "pages")]
    service_url: Option<String>,

    /// Page count of the document (required with --service-url, pads a block dump)
    #[arg(long)]
    pages: Option<usize>,

    /// Document convention deciding how account numbers are detected
    #[arg(short = 't', long, value_enum, default_value_t = DocumentType::LoanPacket)]
    document_type: DocumentType,

    /// Name of the output subdirectory (defaults to the block dump's file stem)
    #[arg(long)]
    document_id: Option<String>,

    /// Output directory for segmentation results
    #[arg(short, long, default_value = "./output")]
    output_dir: String,

    /// Object-key prefix used in the slice plan
    #[arg(long, default_value = "IDP Docs")]
    prefix: String,

    /// Pages whose OCR artifacts may be fetched at the same time
    #[arg(long, env = "SEGMENTER_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Per-page timeout for fetching OCR artifacts, in seconds
    #[arg(long, env = "SEGMENTER_PAGE_TIMEOUT_SECS", default_value_t = DEFAULT_PAGE_TIMEOUT_SECS)]
    page_timeout_secs: u64,

    /// Fewest digits an account number may have
    #[arg(long, env = "SEGMENTER_MIN_DIGITS", default_value_t = DEFAULT_MIN_DIGITS)]
    min_digits: usize,

    /// Most digits an account number may have
    #[arg(long, env = "SEGMENTER_MAX_DIGITS", default_value_t = DEFAULT_MAX_DIGITS)]
    max_digits: usize,

    /// Marker line preceding the account number (marker-statement documents)
    #[arg(long, default_value = DEFAULT_MARKER)]
    marker: String,

    /// unresolved.json of an earlier failed run; only its unresolved tail is re-fetched
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Debug mode - save a per-page trace of the segmentation
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn config(&self) -> SegmenterConfig {
        SegmenterConfig {
            document_type: self.document_type,
            min_digits: self.min_digits,
            max_digits: self.max_digits,
            marker: self.marker.clone(),
            concurrency: self.concurrency,
            page_timeout: Duration::from_secs(self.page_timeout_secs),
            ..SegmenterConfig::default()
        }
    }

    fn document_id(&self) -> String {
        self.document_id
            .clone()
            .or_else(|| {
                self.blocks
                    .as_ref()
                    .and_then(|p| p.file_stem())
                    .map(|s| s.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "document".to_string())
    }

    fn artifact_source(&self, config: &SegmenterConfig) -> Result<Box<dyn ArtifactSource>, AppError> {
        if let Some(path) = &self.blocks {
            tracing::info!("Loading block dump from: {}", path.display());
            let json = std::fs::read_to_string(path)?;
            let source = LoadedArtifactSource::from_json(&json, self.pages)?;
            return Ok(Box::new(source));
        }

        if let Some(url) = &self.service_url {
            let page_count = self
                .pages
                .ok_or_else(|| AppError::Config("--pages is required with --service-url".to_string()))?;
            // Explicit client handle; the per-page timeout is also enforced by the gatherer.
            let client = reqwest::Client::builder()
                .timeout(config.page_timeout)
                .build()
                .map_err(SignalError::from)?;
            tracing::info!("Fetching OCR artifacts for {} pages from: {}", page_count, url);
            return Ok(Box::new(HttpArtifactSource::new(client, url, page_count)));
        }

        Err(AppError::Config("one of --blocks or --service-url is required".to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting segmentation for args: {:?}", args);

    // 3. Build configuration, extractor and artifact source
    let config = args.config();
    config.validate()?;
    let extractor = build_extractor(&config)?;
    let source = args.artifact_source(&config)?;
    let document_id = args.document_id();

    // 4. Initialize storage
    let storage = StorageManager::new(&args.output_dir)?;

    // 5. Segment the document, or its unresolved tail when resuming
    let segmenter = match &args.resume {
        Some(path) => Segmenter::from_checkpoint(load_checkpoint(path)?),
        None => Segmenter::new(),
    };
    match resume_document(segmenter, source.as_ref(), extractor.as_ref(), GatherOptions::from(&config)).await {
        Ok(run) => {
            storage.save_result(&document_id, &run.result)?;
            storage.save_result_metadata(&document_id, config.document_type, run.page_count, &run.result, None)?;

            let plan = SlicePlan::from_result(&run.result, Some(&args.prefix))?;
            storage.save_slice_plan(&document_id, &plan)?;

            if args.debug {
                let trace_path = storage.document_dir(&document_id)?.join(PAGE_TRACE_FILE);
                if let Err(e) = utils::debug_report::save_page_trace(&run.trace, &trace_path) {
                    tracing::warn!("Failed to save page trace: {}", e);
                }
            }

            println!("{}", serde_json::to_string_pretty(&run.result)?);
            tracing::info!(
                "Processing finished. Accounts: {}, slice jobs: {}",
                run.result.len(),
                plan.len()
            );
            Ok(())
        }
        Err(err) => {
            let incomplete = err.incomplete();
            tracing::error!(
                "Stopping at page {}; pages {}-{} need to be retried",
                incomplete.page,
                incomplete.unresolved.first_page,
                incomplete.unresolved.last_page
            );

            // Keep what was resolved so a retry only covers the tail.
            storage.save_result(&document_id, &incomplete.partial)?;
            storage.save_result_metadata(
                &document_id,
                config.document_type,
                source.page_count(),
                &incomplete.partial,
                Some(&incomplete.unresolved),
            )?;
            storage.save_unresolved(&document_id, incomplete)?;

            if args.debug {
                let trace_path = storage.document_dir(&document_id)?.join(PAGE_TRACE_FILE);
                if let Err(e) = utils::debug_report::save_page_trace(incomplete.checkpoint.trace(), &trace_path) {
                    tracing::warn!("Failed to save page trace: {}", e);
                }
            }

            Err(AppError::Segmentation(err))
        }
    }
}
