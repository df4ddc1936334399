// src/signals/marker.rs
use super::{CandidateSet, PageArtifacts, PageSignalExtractor};
use crate::config::SegmenterConfig;
use crate::utils::error::ExtractError;

/// Statement convention where the number sits on the line after a marker:
///
/// ```text
/// ACCOUNT NUMBER:
/// 210863254
/// ```
#[derive(Debug, Clone)]
pub struct MarkerSignalExtractor {
    marker: String,
}

impl MarkerSignalExtractor {
    pub fn new(config: &SegmenterConfig) -> Result<Self, ExtractError> {
        config.validate()?;
        Ok(Self {
            marker: config.marker.trim().to_string(),
        })
    }

    fn is_marker(&self, line: &str) -> bool {
        line.trim().trim_end_matches(':') == self.marker
    }
}

impl PageSignalExtractor for MarkerSignalExtractor {
    fn strategy(&self) -> &'static str {
        "fixed-marker"
    }

    fn extract(&self, artifacts: &PageArtifacts) -> CandidateSet {
        let mut accounts = CandidateSet::new();
        let lines = &artifacts.lines;

        let Some(idx) = lines.iter().position(|line| self.is_marker(line)) else {
            return accounts;
        };
        match lines.get(idx + 1).map(|next| next.trim()) {
            Some(value) if !value.is_empty() => {
                accounts.insert(value);
            }
            _ => tracing::debug!("Marker '{}' found on line {} but no value follows", self.marker, idx + 1),
        }
        accounts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DocumentType;

    fn extractor() -> MarkerSignalExtractor {
        let config = SegmenterConfig::default().with_document_type(DocumentType::MarkerStatement);
        MarkerSignalExtractor::new(&config).unwrap()
    }

    fn lines(text: &[&str]) -> PageArtifacts {
        PageArtifacts {
            lines: text.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_value_on_following_line() {
        let page = lines(&["STATEMENT", "  ACCOUNT NUMBER:  ", " 210863254 ", "ACCOUNT NUMBER", "999"]);
        let found = extractor().extract(&page);
        assert_eq!(found.as_slice(), &["210863254"]);
    }

    #[test]
    fn test_marker_must_match_exactly() {
        let page = lines(&["Account Number:", "210863254", "ACCOUNT NUMBER IS", "42"]);
        assert!(extractor().extract(&page).is_empty());
    }

    #[test]
    fn test_marker_on_last_or_before_blank_line() {
        assert!(extractor().extract(&lines(&["ACCOUNT NUMBER::"])).is_empty());
        assert!(extractor().extract(&lines(&["ACCOUNT NUMBER", "   "])).is_empty());
    }

    #[test]
    fn test_form_fields_are_ignored() {
        let mut page = lines(&["nothing here"]);
        page.form_fields.insert("Account Number".to_string(), "123456789".to_string());
        assert!(extractor().extract(&page).is_empty());
    }
}
