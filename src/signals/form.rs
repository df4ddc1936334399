// src/signals/form.rs
use regex::Regex;

use super::{CandidateSet, PageArtifacts, PageSignalExtractor};
use crate::config::SegmenterConfig;
use crate::utils::error::ExtractError;

/// Labelled form fields first, free-text regex over the page lines second.
#[derive(Debug, Clone)]
pub struct FormSignalExtractor {
    labels: Vec<String>,
    min_digits: usize,
    max_digits: usize,
    fallback_re: Regex,
}

/// `'Account  Number :'` -> `'accountnumber'`
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

impl FormSignalExtractor {
    pub fn new(config: &SegmenterConfig) -> Result<Self, ExtractError> {
        config.validate()?;

        // "account", optional "#"/"no"/"number", optional separator, then the digit run.
        // No closing boundary: a longer run yields its first max_digits digits.
        let pattern = format!(
            r"(?i)account\s*(?:#|number|no)?\s*[:.\-]?\s*([0-9]{{{},{}}})",
            config.min_digits, config.max_digits
        );
        let fallback_re = Regex::new(&pattern).map_err(|e| {
            ExtractError::RegexError(format!("Invalid fallback pattern '{}': {}", pattern, e))
        })?;

        Ok(Self {
            labels: config.account_labels.clone(),
            min_digits: config.min_digits,
            max_digits: config.max_digits,
            fallback_re,
        })
    }

    fn from_form_fields(&self, artifacts: &PageArtifacts) -> CandidateSet {
        let mut accounts = CandidateSet::new();
        for (key, value) in &artifacts.form_fields {
            let normalized = normalize_key(key);
            if !self.labels.iter().any(|label| normalized.contains(label.as_str())) {
                continue;
            }
            let digits = digits_only(value);
            if (self.min_digits..=self.max_digits).contains(&digits.len()) {
                tracing::trace!("Form field '{}' yielded candidate {}", key, digits);
                accounts.insert(digits);
            } else {
                tracing::debug!(
                    "Form field '{}' matched an account label but value has {} digits",
                    key,
                    digits.len()
                );
            }
        }
        accounts
    }

    fn from_raw_lines(&self, artifacts: &PageArtifacts) -> CandidateSet {
        let raw_text = artifacts.lines.join(" ");
        self.fallback_re
            .captures_iter(&raw_text)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .collect()
    }
}

impl PageSignalExtractor for FormSignalExtractor {
    fn strategy(&self) -> &'static str {
        "form+regex"
    }

    fn extract(&self, artifacts: &PageArtifacts) -> CandidateSet {
        let accounts = self.from_form_fields(artifacts);
        if !accounts.is_empty() {
            return accounts;
        }
        let fallback = self.from_raw_lines(artifacts);
        if !fallback.is_empty() {
            tracing::debug!("Regex fallback found {} candidate(s)", fallback.len());
        }
        fallback
    }
}
