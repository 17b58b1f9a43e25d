use crate::models::{ConflictInfo, Resolution, ResolutionMethod};
use crate::services::resolver::reconstruct;

/// Attempts a structural merge of a single-region conflict using anchor-line
/// and subset heuristics. Multi-region conflicts are refused outright.
pub fn try_structural(conflict: &ConflictInfo) -> Resolution {
    if conflict.regions.len() != 1 {
        return Resolution::failure(ResolutionMethod::Structural, "too complex for structural");
    }
    let region = &conflict.regions[0];
    let ours = &region.ours;
    let theirs = &region.theirs;

    if let (Some(o_first), Some(t_first)) = (ours.first(), theirs.first()) {
        if o_first == t_first && !o_first.trim().is_empty() {
            let mut merged = vec![o_first.clone()];
            merged.extend(ours[1..].iter().cloned());
            merged.extend(theirs[1..].iter().cloned());
            let content = reconstruct(conflict, region, &merged);
            return Resolution::success(ResolutionMethod::Structural, content);
        }
    }

    if let (Some(o_last), Some(t_last)) = (ours.last(), theirs.last()) {
        if o_last == t_last && !o_last.trim().is_empty() {
            let mut merged: Vec<String> = ours[..ours.len() - 1].to_vec();
            merged.extend(theirs[..theirs.len() - 1].iter().cloned());
            merged.push(o_last.clone());
            let content = reconstruct(conflict, region, &merged);
            return Resolution::success(ResolutionMethod::Structural, content);
        }
    }

    if let Some(superset) = subset_superset(ours, theirs) {
        let content = reconstruct(conflict, region, superset);
        return Resolution::success(ResolutionMethod::Structural, content);
    }

    Resolution::failure(ResolutionMethod::Structural, "no structural heuristic applied")
}

/// If the non-blank lines of one side are a strict subset of the other's,
/// returns the superset side.
fn subset_superset<'a>(ours: &'a [String], theirs: &'a [String]) -> Option<&'a Vec<String>> {
    let non_blank = |lines: &[String]| -> Vec<&String> {
        lines.iter().filter(|l| !l.trim().is_empty()).collect()
    };
    let ours_nb = non_blank(ours);
    let theirs_nb = non_blank(theirs);

    if ours_nb.len() < theirs_nb.len() && ours_nb.iter().all(|l| theirs_nb.contains(l)) {
        Some(theirs)
    } else if theirs_nb.len() < ours_nb.len() && theirs_nb.iter().all(|l| ours_nb.contains(l)) {
        Some(ours)
    } else {
        None
    }
}
