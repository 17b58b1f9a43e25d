use serde::{Deserialize, Serialize};

use super::commit::{PendingCommit, ProjectId};

/// The state of a reversible, in-progress cherry-pick preview.
/// At most one is active per engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewState {
    pub project: ProjectId,
    pub working_tree_path: String,
    pub previewed: Vec<PendingCommit>,
    pub applied_count: usize,
    pub stashed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stash_ref: Option<String>,
    /// Indices into `previewed` of the commits that actually produced a new
    /// HEAD commit (excludes empty-picked ones). Bookkeeping only, not part
    /// of the host-facing contract.
    #[serde(default, skip_serializing)]
    pub applied_indices: Vec<usize>,
}

impl PreviewState {
    pub fn new(project: ProjectId, working_tree_path: String) -> Self {
        PreviewState {
            project,
            working_tree_path,
            previewed: Vec::new(),
            applied_count: 0,
            stashed: false,
            stash_ref: None,
            applied_indices: Vec::new(),
        }
    }
}
