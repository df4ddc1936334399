// src/utils/debug_report.rs
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::segmentation::{PageTrace, Transition};
use crate::utils::error::AppError;

/// Renders one line per page: candidates seen and the rule that fired.
pub fn render_page_trace(trace: &[PageTrace]) -> String {
    let mut report = String::new();
    let _ = writeln!(report, "{:>5}  {:<40}  {}", "page", "candidates", "transition");

    for entry in trace {
        let candidates = format!("[{}]", entry.candidates.as_slice().join(", "));
        let transition = match &entry.transition {
            Transition::Boundary { account, flushed, discarded } => {
                let mut text = format!("BOUNDARY {}", account);
                if let Some(previous) = flushed {
                    let _ = write!(text, " (closes {})", previous);
                }
                if !discarded.is_empty() {
                    let _ = write!(text, " discarded {:?}", discarded);
                }
                text
            }
            Transition::Continuation { account } => format!("EXTRACTION {}", account),
            Transition::Attachment { account } => format!("ATTACHMENT {}", account),
            Transition::Dropped => "DROPPED (no account yet)".to_string(),
        };
        let _ = writeln!(report, "{:>5}  {:<40}  {}", entry.page, candidates, transition);
    }

    report
}

/// Saves the page trace of a run next to its outputs.
pub fn save_page_trace(trace: &[PageTrace], filename: &Path) -> Result<(), AppError> {
    let mut file = File::create(filename)?;
    file.write_all(render_page_trace(trace).as_bytes())?;

    tracing::info!("Saved page trace to {}", filename.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::Segmenter;
    use crate::signals::CandidateSet;

    #[test]
    fn test_render_page_trace() {
        let mut segmenter = Segmenter::new();
        segmenter.push(CandidateSet::new());
        segmenter.push(["300000", "200000"].into_iter().collect());
        segmenter.push(CandidateSet::new());

        let report = render_page_trace(segmenter.trace());
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].ends_with("DROPPED (no account yet)"));
        assert!(lines[2].contains("[200000, 300000]"));
        assert!(lines[2].ends_with("BOUNDARY 200000 discarded [\"300000\"]"));
        assert!(lines[3].ends_with("ATTACHMENT 200000"));
    }
}
