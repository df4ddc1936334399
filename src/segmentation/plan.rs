// src/segmentation/plan.rs
//! The sub-documents the slicing stage should carve out of the source PDF.

use serde::Serialize;

use super::machine::{SectionRanges, SegmentationResult};
use super::range::parse_range;
use crate::utils::error::RangeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Extraction,
    Attachments,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Extraction => "extraction",
            Section::Attachments => "attachments",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SliceJob {
    pub account: String,
    pub section: Section,
    pub descriptor: String,
    /// Pages to copy, 1-based, as the slicer will read the descriptor.
    pub pages: Vec<usize>,
    pub file_name: String,
    pub object_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlicePlan {
    pub jobs: Vec<SliceJob>,
}

impl SlicePlan {
    pub fn from_result(result: &SegmentationResult, prefix: Option<&str>) -> Result<Self, RangeError> {
        Self::from_descriptors(result.descriptor_entries(), prefix)
    }

    /// Builds one job per non-empty section, in account order, extraction first.
    pub fn from_descriptors<I>(entries: I, prefix: Option<&str>) -> Result<Self, RangeError>
    where
        I: IntoIterator<Item = (String, SectionRanges)>,
    {
        let prefix = prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty());
        let mut jobs = Vec::new();

        for (account, ranges) in entries {
            for (section, descriptor) in [
                (Section::Extraction, ranges.extraction),
                (Section::Attachments, ranges.attachments),
            ] {
                let pages = parse_range(&descriptor)?;
                if pages.is_empty() {
                    continue;
                }
                let file_name = format!("{}_{}.pdf", account, section.as_str());
                let object_key = match prefix {
                    Some(prefix) => format!("{}/{}/{}", prefix, account, file_name),
                    None => format!("{}/{}", account, file_name),
                };
                jobs.push(SliceJob {
                    account: account.clone(),
                    section,
                    descriptor,
                    pages,
                    file_name,
                    object_key,
                });
            }
        }

        tracing::debug!("Slice plan has {} job(s)", jobs.len());
        Ok(Self { jobs })
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::machine::segment_candidates;
    use crate::signals::CandidateSet;

    fn ranges(extraction: &str, attachments: &str) -> SectionRanges {
        SectionRanges {
            extraction: extraction.to_string(),
            attachments: attachments.to_string(),
        }
    }

    #[test]
    fn test_empty_sections_are_skipped() {
        let plan = SlicePlan::from_descriptors(
            vec![
                ("111".to_string(), ranges("1", "")),
                ("222".to_string(), ranges("2-3", "4-6")),
            ],
            Some("/IDP Docs/"),
        )
        .unwrap();

        assert_eq!(plan.len(), 3);
        assert_eq!(plan.jobs[0].file_name, "111_extraction.pdf");
        assert_eq!(plan.jobs[1].pages, vec![2, 3]);
        assert_eq!(plan.jobs[2].section, Section::Attachments);
        assert_eq!(plan.jobs[2].pages, vec![4, 5, 6]);
        assert_eq!(plan.jobs[2].object_key, "IDP Docs/222/222_attachments.pdf");
    }

    #[test]
    fn test_plan_from_result_without_prefix() {
        let pages: Vec<CandidateSet> = vec![
            ["3141592"].into_iter().collect(),
            CandidateSet::new(),
        ];
        let plan = SlicePlan::from_result(&segment_candidates(pages), None).unwrap();
        let keys: Vec<&str> = plan.jobs.iter().map(|j| j.object_key.as_str()).collect();
        assert_eq!(keys, vec!["3141592/3141592_extraction.pdf", "3141592/3141592_attachments.pdf"]);
    }

    #[test]
    fn test_bad_descriptor_is_an_error() {
        let result = SlicePlan::from_descriptors(vec![("9".to_string(), ranges("7-2", ""))], None);
        assert!(matches!(result, Err(RangeError::Descending(_))));
    }
}
