// src/segmentation/range.rs
//! Range descriptors: the compact `""` / `"n"` / `"a-b"` strings the PDF
//! slicing stage consumes.

use crate::utils::error::RangeError;

/// Encodes an ascending page list as a range descriptor.
///
/// Only the first and last pages are kept, so `[1, 2, 5]` becomes `"1-5"`.
/// Downstream slicing relies on this exact format.
pub fn encode_range(pages: &[usize]) -> String {
    match pages {
        [] => String::new(),
        [only] => only.to_string(),
        [first, .., last] => format!("{}-{}", first, last),
    }
}

/// True when an ascending page list skips pages between its ends, i.e. when
/// [`encode_range`] would claim pages that were never observed.
pub fn has_gaps(pages: &[usize]) -> bool {
    pages.windows(2).any(|w| w[1] != w[0] + 1)
}

/// Pages covered by the descriptor but absent from `pages`.
pub fn hidden_pages(pages: &[usize]) -> Vec<usize> {
    pages
        .windows(2)
        .flat_map(|w| (w[0] + 1)..w[1])
        .collect()
}

/// `"3-5"` -> `[3, 4, 5]`, `"6"` -> `[6]`, `""` -> `[]`
pub fn parse_range(descriptor: &str) -> Result<Vec<usize>, RangeError> {
    let trimmed = descriptor.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let parse_page = |part: &str| -> Result<usize, RangeError> {
        let page = part
            .trim()
            .parse::<usize>()
            .map_err(|_| RangeError::Malformed(descriptor.to_string()))?;
        if page == 0 {
            return Err(RangeError::ZeroPage(descriptor.to_string()));
        }
        Ok(page)
    };

    match trimmed.split_once('-') {
        None => Ok(vec![parse_page(trimmed)?]),
        Some((start, end)) => {
            let (start, end) = (parse_page(start)?, parse_page(end)?);
            if start > end {
                return Err(RangeError::Descending(descriptor.to_string()));
            }
            Ok((start..=end).collect())
        }
    }
}
