// src/config.rs
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::utils::error::ExtractError;

/// Label variants recognised inside a normalized form key.
pub const DEFAULT_ACCOUNT_LABELS: [&str; 6] = [
    "accountnumber",
    "accountno",
    "account#",
    "acctnumber",
    "acctno",
    "acct#",
];

pub const DEFAULT_MARKER: &str = "ACCOUNT NUMBER";
pub const DEFAULT_MIN_DIGITS: usize = 6;
pub const DEFAULT_MAX_DIGITS: usize = 20;
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 60;
/// Upper bound on the page count of one loaded document.
pub const MAX_DOCUMENT_PAGES: usize = 10_000;

/// Document convention, which decides how account numbers are spotted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentType {
    /// Loan packets: labelled form fields, with a free-text regex fallback.
    #[default]
    LoanPacket,
    /// Statements carrying an `ACCOUNT NUMBER` line followed by the number.
    MarkerStatement,
}

#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    pub document_type: DocumentType,
    pub min_digits: usize,
    pub max_digits: usize,
    pub account_labels: Vec<String>,
    pub marker: String,
    /// Pages whose signals may be gathered at the same time.
    pub concurrency: usize,
    pub page_timeout: Duration,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            document_type: DocumentType::default(),
            min_digits: DEFAULT_MIN_DIGITS,
            max_digits: DEFAULT_MAX_DIGITS,
            account_labels: DEFAULT_ACCOUNT_LABELS.iter().map(|l| l.to_string()).collect(),
            marker: DEFAULT_MARKER.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            page_timeout: Duration::from_secs(DEFAULT_PAGE_TIMEOUT_SECS),
        }
    }
}

impl SegmenterConfig {
    pub fn with_document_type(mut self, document_type: DocumentType) -> Self {
        self.document_type = document_type;
        self
    }

    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.min_digits == 0 || self.min_digits > self.max_digits {
            return Err(ExtractError::InvalidConfig(format!(
                "digit bounds must satisfy 1 <= min <= max, got {}..={}",
                self.min_digits, self.max_digits
            )));
        }
        if self.document_type == DocumentType::LoanPacket && self.account_labels.is_empty() {
            return Err(ExtractError::InvalidConfig("no account labels configured".to_string()));
        }
        if self.document_type == DocumentType::MarkerStatement && self.marker.trim().is_empty() {
            return Err(ExtractError::InvalidConfig("marker text is empty".to_string()));
        }
        if self.concurrency == 0 {
            return Err(ExtractError::InvalidConfig("concurrency must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SegmenterConfig::default().validate().is_ok());
        assert!(SegmenterConfig::default()
            .with_document_type(DocumentType::MarkerStatement)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_rejects_inverted_digit_bounds() {
        let config = SegmenterConfig { min_digits: 12, max_digits: 8, ..Default::default() };
        assert!(matches!(config.validate(), Err(ExtractError::InvalidConfig(_))));

        let config = SegmenterConfig { concurrency: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }
}
