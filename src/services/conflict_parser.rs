use std::path::Path;

use crate::error::Result;
use crate::models::{ConflictInfo, ConflictRegion};
use crate::services::git_driver::GitDriver;

const CONTEXT_LINES: usize = 3;

/// Single-pass scan for `<<<<<<< / ======= / >>>>>>>` regions. Nested
/// conflict markers are unsupported; behavior in that case is undefined.
pub fn parse_markers(content: &str) -> Vec<ConflictRegion> {
    let lines: Vec<&str> = content.lines().collect();
    let mut regions = Vec::new();
    let mut context_buffer: Vec<String> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].starts_with("<<<<<<<") {
            let start_line = i;
            let context_before = context_buffer.clone();
            i += 1;

            let mut ours = Vec::new();
            while i < lines.len() && !lines[i].starts_with("=======") {
                ours.push(lines[i].to_string());
                i += 1;
            }
            i += 1;

            let mut theirs = Vec::new();
            while i < lines.len() && !lines[i].starts_with(">>>>>>>") {
                theirs.push(lines[i].to_string());
                i += 1;
            }
            i += 1;

            let mut context_after = Vec::new();
            let mut j = i;
            while j < lines.len() && context_after.len() < CONTEXT_LINES && !lines[j].starts_with("<<<<<<<") {
                context_after.push(lines[j].to_string());
                j += 1;
            }

            regions.push(ConflictRegion {
                start_line,
                ours,
                theirs,
                context_before,
                context_after,
            });
            context_buffer.clear();
        } else {
            context_buffer.push(lines[i].to_string());
            if context_buffer.len() > CONTEXT_LINES {
                context_buffer.remove(0);
            }
            i += 1;
        }
    }

    regions
}

/// Reads a conflicted file's on-disk content plus its three index stages.
/// Returns `None` if the file has no conflict markers.
pub async fn get_conflict_info(
    driver: &GitDriver,
    repo_path: &Path,
    file_path: &str,
) -> Result<Option<ConflictInfo>> {
    let raw_content = tokio::fs::read_to_string(repo_path.join(file_path)).await?;
    if !raw_content.contains("<<<<<<<") {
        return Ok(None);
    }

    let regions = parse_markers(&raw_content);
    let base_content = driver.show_stage(1, file_path).await?;
    let ours_content = driver.show_stage(2, file_path).await?;
    let theirs_content = driver.show_stage(3, file_path).await?;

    Ok(Some(ConflictInfo {
        file_path: file_path.to_string(),
        base_content,
        ours_content,
        theirs_content,
        raw_content,
        regions,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_markers_returns_empty() {
        let regions = parse_markers("one\ntwo\nthree\n");
        assert!(regions.is_empty());
    }

    #[test]
    fn test_single_region_with_context() {
        let content = "intro\n### Contributors\n<<<<<<< HEAD\n- Alice\n=======\n- Bob\n>>>>>>> branch\noutro\n";
        let regions = parse_markers(content);
        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        assert_eq!(region.ours, vec!["- Alice".to_string()]);
        assert_eq!(region.theirs, vec!["- Bob".to_string()]);
        assert_eq!(region.context_before, vec!["intro".to_string(), "### Contributors".to_string()]);
        assert_eq!(region.context_after, vec!["outro".to_string()]);
    }

    #[test]
    fn test_context_before_capped_at_three_lines() {
        let content = "a\nb\nc\nd\n<<<<<<< HEAD\nx\n=======\ny\n>>>>>>> branch\n";
        let regions = parse_markers(content);
        assert_eq!(regions[0].context_before, vec!["b".to_string(), "c".to_string(), "d".to_string()]);
    }

    #[test]
    fn test_multi_region_awareness() {
        let content = "\
<<<<<<< HEAD
first-ours
=======
first-theirs
>>>>>>> branch
middle
<<<<<<< HEAD
second-ours
=======
second-theirs
>>>>>>> branch
";
        let regions = parse_markers(content);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].context_after, vec!["middle".to_string()]);
        assert_eq!(regions[1].context_before, vec!["middle".to_string()]);
    }

    #[test]
    fn test_start_line_is_zero_indexed_line_of_marker() {
        let content = "a\nb\n<<<<<<< HEAD\nx\n=======\ny\n>>>>>>> branch\n";
        let regions = parse_markers(content);
        assert_eq!(regions[0].start_line, 2);
    }
}
