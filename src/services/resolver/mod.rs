mod llm;
mod structural;

pub use llm::{resolve_semantic, AnthropicLlmClient, ChatMessage, LlmClient, LlmComplexity, LlmRole};
pub use structural::try_structural;

use crate::models::{ConflictInfo, ConflictRegion};

/// Replaces the `<<<<<<< … >>>>>>>` block of the first region with
/// `merged_lines`, returning the full reconstructed file content.
pub(crate) fn reconstruct(conflict: &ConflictInfo, region: &ConflictRegion, merged_lines: &[String]) -> String {
    let had_trailing_newline = conflict.raw_content.ends_with('\n');
    let lines: Vec<&str> = conflict.raw_content.lines().collect();
    let block_len = region.ours.len() + region.theirs.len() + 3;
    let end = (region.start_line + block_len).min(lines.len());

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    out.extend(lines[..region.start_line].iter().map(|l| l.to_string()));
    out.extend(merged_lines.iter().cloned());
    out.extend(lines[end..].iter().map(|l| l.to_string()));

    let mut joined = out.join("\n");
    if had_trailing_newline {
        joined.push('\n');
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict_with_region(ours: Vec<&str>, theirs: Vec<&str>) -> (ConflictInfo, ConflictRegion) {
        let raw = format!(
            "intro\n<<<<<<< HEAD\n{}\n=======\n{}\n>>>>>>> branch\noutro\n",
            ours.join("\n"),
            theirs.join("\n")
        );
        let region = ConflictRegion {
            start_line: 1,
            ours: ours.into_iter().map(|s| s.to_string()).collect(),
            theirs: theirs.into_iter().map(|s| s.to_string()).collect(),
            context_before: vec!["intro".to_string()],
            context_after: vec!["outro".to_string()],
        };
        let conflict = ConflictInfo {
            file_path: "CONTRIBUTORS.md".to_string(),
            base_content: None,
            ours_content: None,
            theirs_content: None,
            raw_content: raw,
            regions: vec![region.clone()],
        };
        (conflict, region)
    }

    #[test]
    fn test_reconstruct_replaces_block_keeps_surrounding_context() {
        let (conflict, region) = conflict_with_region(vec!["- Alice"], vec!["- Bob"]);
        let merged = vec!["- Alice".to_string(), "- Bob".to_string()];
        let result = reconstruct(&conflict, &region, &merged);
        assert_eq!(result, "intro\n- Alice\n- Bob\noutro\n");
    }
}
