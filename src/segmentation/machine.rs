// src/segmentation/machine.rs

// --- Imports ---
use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use super::range::{encode_range, has_gaps, hidden_pages};
use crate::signals::CandidateSet;
use crate::utils::error::{IncompleteSegmentation, SegmentError, SignalError};

/// Outcome of gathering one page's signal: either the candidates seen on the
/// page (possibly none) or the reason they could not be determined.
pub type PageSignal = Result<CandidateSet, SignalError>;

// --- Data Structures ---

/// One contiguous run of pages belonging to a single account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSegment {
    pub account_number: String,
    /// Pages that repeat the account marker.
    pub extraction_pages: Vec<usize>,
    /// Trailing pages without the marker (supporting documents).
    pub attachment_pages: Vec<usize>,
}

impl AccountSegment {
    fn start(account_number: String, page: usize) -> Self {
        Self {
            account_number,
            extraction_pages: vec![page],
            attachment_pages: Vec::new(),
        }
    }

    pub fn ranges(&self) -> SectionRanges {
        SectionRanges {
            extraction: encode_range(&self.extraction_pages),
            attachments: encode_range(&self.attachment_pages),
        }
    }

    pub fn pages(&self) -> impl Iterator<Item = usize> + '_ {
        self.extraction_pages
            .iter()
            .chain(self.attachment_pages.iter())
            .copied()
    }
}

/// Range descriptors for the two sections of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRanges {
    pub extraction: String,
    pub attachments: String,
}

/// Account runs in the order they were closed, plus the pages dropped
/// before any account was established.
///
/// Serializes as `{"<account>": {"extraction": "..", "attachments": ".."}}`.
/// A number that comes back after other accounts gets its own entry, keyed
/// `<account>~2`, `<account>~3`, ... in the serialized form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentationResult {
    segments: Vec<AccountSegment>,
    dropped_pages: Vec<usize>,
}

impl SegmentationResult {
    pub fn segments(&self) -> &[AccountSegment] {
        &self.segments
    }

    pub fn dropped_pages(&self) -> &[usize] {
        &self.dropped_pages
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// First run recorded for `account`.
    pub fn get(&self, account: &str) -> Option<&AccountSegment> {
        self.segments.iter().find(|s| s.account_number == account)
    }

    /// Ordered `(key, ranges)` pairs exactly as they are serialized.
    ///
    /// A first run is keyed by its account number. Later runs get the next
    /// `~n` suffix that is neither already emitted nor some account's own
    /// number (the marker strategy accepts text such as `A~2`).
    pub fn descriptor_entries(&self) -> Vec<(String, SectionRanges)> {
        let accounts: HashSet<&str> = self.segments.iter().map(|s| s.account_number.as_str()).collect();
        let mut emitted: HashSet<String> = HashSet::new();
        let mut runs: HashMap<&str, usize> = HashMap::new();

        self.segments
            .iter()
            .map(|segment| {
                let account = segment.account_number.as_str();
                let run = runs.entry(account).or_insert(0);
                *run += 1;
                let mut key = account.to_string();
                if *run > 1 {
                    key = format!("{}~{}", account, run);
                    while accounts.contains(key.as_str()) || emitted.contains(&key) {
                        *run += 1;
                        key = format!("{}~{}", account, run);
                    }
                }
                emitted.insert(key.clone());
                (key, segment.ranges())
            })
            .collect()
    }

    /// Every page the fold accounted for, assigned or dropped, ascending.
    pub fn assigned_pages(&self) -> Vec<usize> {
        let mut pages: Vec<usize> = self
            .segments
            .iter()
            .flat_map(|segment| segment.pages())
            .chain(self.dropped_pages.iter().copied())
            .collect();
        pages.sort_unstable();
        pages
    }
}

impl Serialize for SegmentationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = self.descriptor_entries();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, ranges) in &entries {
            map.serialize_entry(key, ranges)?;
        }
        map.end()
    }
}

/// Pages whose signals are still unknown after a failure, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedTail {
    pub first_page: usize,
    pub last_page: usize,
}

impl UnresolvedTail {
    pub fn pages(&self) -> RangeInclusive<usize> {
        self.first_page..=self.last_page
    }

    pub fn len(&self) -> usize {
        self.last_page + 1 - self.first_page
    }
}

/// What the state machine did with a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A new account starts here; `flushed` is the account it closed.
    Boundary {
        account: String,
        flushed: Option<String>,
        discarded: Vec<String>,
    },
    /// The current account's marker was seen again.
    Continuation { account: String },
    /// No marker; the page trails the current account.
    Attachment { account: String },
    /// No account established yet.
    Dropped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTrace {
    pub page: usize,
    pub candidates: CandidateSet,
    pub transition: Transition,
}

/// Persistable state of a [`Segmenter`], minus the page trace. Written next
/// to a failed run's outputs so a later invocation can fold only the tail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub next_page: usize,
    pub current: Option<AccountSegment>,
    pub segments: Vec<AccountSegment>,
    #[serde(default)]
    pub dropped_pages: Vec<usize>,
}

// --- State Machine ---

/// Folds per-page candidate sets, in page order, into account runs.
///
/// One instance handles exactly one document. It is `Clone` so that a fold
/// interrupted by a signal failure can be resumed from a checkpoint.
#[derive(Debug, Clone)]
pub struct Segmenter {
    current: Option<AccountSegment>,
    result: SegmentationResult,
    next_page: usize,
    trace: Vec<PageTrace>,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter {
    pub fn new() -> Self {
        Self {
            current: None,
            result: SegmentationResult::default(),
            next_page: 1,
            trace: Vec::new(),
        }
    }

    /// 1-based index the next pushed page will receive.
    pub fn next_page(&self) -> usize {
        self.next_page
    }

    pub fn current_account(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.account_number.as_str())
    }

    pub fn trace(&self) -> &[PageTrace] {
        &self.trace
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            next_page: self.next_page,
            current: self.current.clone(),
            segments: self.result.segments.clone(),
            dropped_pages: self.result.dropped_pages.clone(),
        }
    }

    /// Rebuilds a segmenter from a saved checkpoint; the trace starts empty.
    pub fn from_checkpoint(checkpoint: Checkpoint) -> Self {
        Self {
            current: checkpoint.current,
            result: SegmentationResult {
                segments: checkpoint.segments,
                dropped_pages: checkpoint.dropped_pages,
            },
            next_page: checkpoint.next_page.max(1),
            trace: Vec::new(),
        }
    }

    /// Applies the next page's candidates.
    pub fn push(&mut self, candidates: CandidateSet) -> Transition {
        let page = self.next_page;
        self.next_page += 1;

        // Smallest candidate that differs from the current account, if any.
        let (boundary, discarded) = {
            let mut fresh = candidates
                .new_candidates(self.current_account())
                .map(str::to_string);
            (fresh.next(), fresh.collect::<Vec<_>>())
        };

        let transition = if let Some(account) = boundary {
            if !discarded.is_empty() {
                tracing::warn!(
                    "Page {}: several new account numbers {:?}; keeping {}, discarding {:?}",
                    page,
                    candidates.as_slice(),
                    account,
                    discarded
                );
            }
            let flushed = self.flush();
            tracing::info!("New account {} starts at page {}", account, page);
            self.current = Some(AccountSegment::start(account.clone(), page));
            Transition::Boundary { account, flushed, discarded }
        } else if let Some(segment) = self.current.as_mut() {
            let account = segment.account_number.clone();
            if candidates.is_empty() {
                segment.attachment_pages.push(page);
                Transition::Attachment { account }
            } else {
                segment.extraction_pages.push(page);
                Transition::Continuation { account }
            }
        } else {
            tracing::warn!("Page {}: no account number established yet, dropping page", page);
            self.result.dropped_pages.push(page);
            Transition::Dropped
        };

        tracing::trace!("Page {} -> {:?}", page, transition);
        self.trace.push(PageTrace {
            page,
            candidates,
            transition: transition.clone(),
        });
        transition
    }

    /// Closes the current account, if any, into the result.
    fn flush(&mut self) -> Option<String> {
        let mut segment = self.current.take()?;

        for (section, pages) in [
            ("extraction", &mut segment.extraction_pages),
            ("attachments", &mut segment.attachment_pages),
        ] {
            pages.sort_unstable();
            pages.dedup();
            if has_gaps(pages) {
                tracing::warn!(
                    "Account {} {} range {:?} also covers unobserved pages {:?}",
                    segment.account_number,
                    section,
                    encode_range(pages),
                    hidden_pages(pages)
                );
            }
        }

        if self.result.get(&segment.account_number).is_some() {
            tracing::warn!(
                "Account {} reappears after other accounts; recording a separate run",
                segment.account_number
            );
        }

        let account = segment.account_number.clone();
        tracing::debug!("Flushing account {}: {:?}", account, segment.ranges());
        self.result.segments.push(segment);
        Some(account)
    }

    pub fn finish(self) -> SegmentationResult {
        self.finish_with_trace().0
    }

    pub fn finish_with_trace(mut self) -> (SegmentationResult, Vec<PageTrace>) {
        self.flush();
        (self.result, self.trace)
    }

    /// Turns a signal failure on the next page into the caller-facing error.
    ///
    /// `remaining_pages` counts the pages after the failing one.
    pub fn fail(self, cause: SignalError, remaining_pages: usize) -> SegmentError {
        let page = self.next_page;
        let unresolved = UnresolvedTail {
            first_page: page,
            last_page: page + remaining_pages,
        };
        tracing::error!(
            "Signal extraction failed on page {} ({}); pages {}-{} unresolved",
            page,
            cause,
            unresolved.first_page,
            unresolved.last_page
        );

        let checkpoint = self.clone();
        let partial = self.finish();
        SegmentError::SignalExtraction(Box::new(IncompleteSegmentation {
            page,
            cause,
            partial,
            unresolved,
            checkpoint,
        }))
    }

    /// Folds the remaining pages and closes the document.
    pub fn fold<I>(mut self, signals: I) -> Result<SegmentationResult, SegmentError>
    where
        I: IntoIterator<Item = PageSignal>,
    {
        let mut signals = signals.into_iter();
        while let Some(signal) = signals.next() {
            match signal {
                Ok(candidates) => {
                    self.push(candidates);
                }
                Err(cause) => {
                    let remaining = signals.count();
                    return Err(self.fail(cause, remaining));
                }
            }
        }
        Ok(self.finish())
    }
}

/// Folds a whole document's page signals, page 1 first.
pub fn fold_signals<I>(signals: I) -> Result<SegmentationResult, SegmentError>
where
    I: IntoIterator<Item = PageSignal>,
{
    Segmenter::new().fold(signals)
}

/// Segments pages whose candidates are already known.
pub fn segment_candidates<I>(pages: I) -> SegmentationResult
where
    I: IntoIterator<Item = CandidateSet>,
{
    let mut segmenter = Segmenter::new();
    for candidates in pages {
        segmenter.push(candidates);
    }
    segmenter.finish()
}
