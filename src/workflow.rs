use std::path::Path;

use chrono::Utc;
use parking_lot::Mutex;

use crate::error::{EngineError, Result};
use crate::host::Host;
use crate::models::{
    Acceptance, ConflictInfo, HostEvent, OperationOutcome, PeerRef, PendingCommit, PreviewState,
    ProjectId, Rejection,
};
use crate::services::conflict_parser;
use crate::services::git_driver::{GitDriver, GitOutcome};
use crate::services::memory::CollaborationMemory;

enum ApplyStep {
    Applied,
    Skipped,
    Conflict(Option<ConflictInfo>),
    Failed(EngineError),
}

/// Owns the single `PreviewState` for one engine instance and drives the
/// preview/accept/reject/cancel lifecycle over a `GitDriver`. Only one
/// `Previewing` state exists at a time; the engine is not reentrant.
pub struct WorkflowStateMachine {
    state: Mutex<Option<PreviewState>>,
    git_binary: String,
    git_timeout_secs: u64,
}

impl WorkflowStateMachine {
    pub fn new(git_binary: impl Into<String>, git_timeout_secs: u64) -> Self {
        WorkflowStateMachine {
            state: Mutex::new(None),
            git_binary: git_binary.into(),
            git_timeout_secs,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().is_some()
    }

    pub fn snapshot(&self) -> Option<PreviewState> {
        self.state.lock().clone()
    }

    /// Unconditionally clears the preview state. Does not touch the
    /// working tree. For crash recovery.
    pub fn force_cleanup(&self) {
        self.state.lock().take();
    }

    pub async fn start_preview(
        &self,
        memory: &CollaborationMemory,
        project: &ProjectId,
        working_tree_path: &Path,
        mut commits: Vec<PendingCommit>,
        adapter_peer: Option<&PeerRef>,
        host: &dyn Host,
    ) -> Result<OperationOutcome> {
        if self.state.lock().is_some() {
            return Err(EngineError::PreviewInProgress);
        }

        commits.sort_by(|a, b| {
            a.commit
                .timestamp
                .cmp(&b.commit.timestamp)
                .then_with(|| a.commit.local_hash.cmp(&b.commit.local_hash))
        });

        let driver = GitDriver::with_timeout(working_tree_path, &self.git_binary, self.git_timeout_secs);
        let (stashed, stash_ref) = Self::maybe_stash(&driver).await?;

        let mut applied_count = 0usize;
        let mut applied_indices = Vec::new();
        for (index, commit) in commits.iter().enumerate() {
            match Self::apply_one(&driver, memory, project, adapter_peer, commit, host).await? {
                ApplyStep::Applied => {
                    applied_count += 1;
                    applied_indices.push(index);
                }
                ApplyStep::Skipped => {}
                ApplyStep::Conflict(conflict_info) => {
                    // Leave the working tree mid-pick: earlier applied
                    // commits and the current conflicted index stay as
                    // git left them. The caller's only valid next step
                    // from here is applyResolution or abortResolution.
                    return Ok(OperationOutcome::conflict(conflict_info, commit.clone()));
                }
                ApplyStep::Failed(error) => {
                    let _ = driver.cherry_pick_abort().await;
                    Self::rollback(&driver, applied_count, stashed).await;
                    return Ok(OperationOutcome::failed(error));
                }
            }
        }

        let mut preview = PreviewState::new(
            project.clone(),
            working_tree_path.to_string_lossy().to_string(),
        );
        preview.previewed = commits;
        preview.applied_count = applied_count;
        preview.stashed = stashed;
        preview.stash_ref = stash_ref;
        preview.applied_indices = applied_indices;
        *self.state.lock() = Some(preview);

        Ok(OperationOutcome::success())
    }

    pub async fn commit_preview(&self, memory: &CollaborationMemory, peer_ledger_location: &str) -> Result<()> {
        let preview = self.state.lock().take().ok_or(EngineError::NoPreview)?;
        let driver = GitDriver::with_timeout(Path::new(&preview.working_tree_path), &self.git_binary, self.git_timeout_secs);

        let mut newest_first = driver.recent_hashes(preview.applied_count).await?;
        newest_first.reverse();
        let oldest_first = newest_first;

        let acceptances: Vec<Acceptance> = preview
            .applied_indices
            .iter()
            .zip(oldest_first.iter())
            .map(|(&index, hash)| {
                let commit = &preview.previewed[index];
                Acceptance {
                    origin_hash: commit.commit.origin_hash.clone(),
                    applied_hash: hash.clone(),
                    relayed_by: commit.offered_by_set(),
                    subject: commit.commit.subject.clone(),
                    accepted_at: Utc::now(),
                }
            })
            .collect();

        if !acceptances.is_empty() {
            memory.record_acceptance(peer_ledger_location, &preview.project.0, acceptances)?;
        }

        if preview.stashed {
            driver.stash_pop().await?;
        }
        Ok(())
    }

    pub async fn reject_preview(&self, memory: &CollaborationMemory, peer_ledger_location: &str) -> Result<()> {
        let preview = self.state.lock().take().ok_or(EngineError::NoPreview)?;
        let driver = GitDriver::with_timeout(Path::new(&preview.working_tree_path), &self.git_binary, self.git_timeout_secs);

        if preview.applied_count > 0 {
            driver.reset_hard(&format!("HEAD~{}", preview.applied_count)).await?;
        }

        let rejections: Vec<Rejection> = preview
            .previewed
            .iter()
            .map(|commit| Rejection {
                origin_hash: commit.commit.origin_hash.clone(),
                subject: commit.commit.subject.clone(),
                rejected_at: Utc::now(),
                reason: None,
            })
            .collect();
        memory.record_rejection(peer_ledger_location, &preview.project.0, rejections)?;

        if preview.stashed {
            driver.stash_pop().await?;
        }
        Ok(())
    }

    pub async fn cancel_preview(&self) -> Result<()> {
        let preview = self.state.lock().take().ok_or(EngineError::NoPreview)?;
        let driver = GitDriver::with_timeout(Path::new(&preview.working_tree_path), &self.git_binary, self.git_timeout_secs);

        if preview.applied_count > 0 {
            driver.reset_hard(&format!("HEAD~{}", preview.applied_count)).await?;
        }
        if preview.stashed {
            driver.stash_pop().await?;
        }
        Ok(())
    }

    pub async fn accept_now(
        &self,
        memory: &CollaborationMemory,
        project: &ProjectId,
        working_tree_path: &Path,
        peer_ledger_location: &str,
        mut commits: Vec<PendingCommit>,
        adapter_peer: Option<&PeerRef>,
        host: &dyn Host,
    ) -> Result<OperationOutcome> {
        commits.sort_by(|a, b| {
            a.commit
                .timestamp
                .cmp(&b.commit.timestamp)
                .then_with(|| a.commit.local_hash.cmp(&b.commit.local_hash))
        });

        let driver = GitDriver::with_timeout(working_tree_path, &self.git_binary, self.git_timeout_secs);
        let (stashed, stash_ref) = Self::maybe_stash(&driver).await?;

        let mut applied_count = 0usize;
        let mut applied_commits: Vec<&PendingCommit> = Vec::new();
        for commit in &commits {
            match Self::apply_one(&driver, memory, project, adapter_peer, commit, host).await? {
                ApplyStep::Applied => {
                    applied_count += 1;
                    applied_commits.push(commit);
                }
                ApplyStep::Skipped => {}
                ApplyStep::Conflict(conflict_info) => {
                    // Same reentrance contract as start_preview: no
                    // reset, no stash pop. The cherry-pick stays open.
                    return Ok(OperationOutcome::conflict(conflict_info, commit.clone()));
                }
                ApplyStep::Failed(error) => {
                    let _ = driver.cherry_pick_abort().await;
                    Self::rollback(&driver, applied_count, stashed).await;
                    return Ok(OperationOutcome::failed(error));
                }
            }
        }

        if !applied_commits.is_empty() {
            let mut newest_first = driver.recent_hashes(applied_count).await?;
            newest_first.reverse();
            let acceptances: Vec<Acceptance> = applied_commits
                .iter()
                .zip(newest_first.iter())
                .map(|(commit, hash)| Acceptance {
                    origin_hash: commit.commit.origin_hash.clone(),
                    applied_hash: hash.clone(),
                    relayed_by: commit.offered_by_set(),
                    subject: commit.commit.subject.clone(),
                    accepted_at: Utc::now(),
                })
                .collect();
            memory.record_acceptance(peer_ledger_location, &project.0, acceptances)?;
        }
        if stashed {
            driver.stash_pop().await?;
        }
        let _ = stash_ref;
        Ok(OperationOutcome::success())
    }

    pub fn reject_now(
        &self,
        memory: &CollaborationMemory,
        project: &ProjectId,
        peer_ledger_location: &str,
        commits: &[PendingCommit],
    ) -> Result<()> {
        let rejections: Vec<Rejection> = commits
            .iter()
            .map(|commit| Rejection {
                origin_hash: commit.commit.origin_hash.clone(),
                subject: commit.commit.subject.clone(),
                rejected_at: Utc::now(),
                reason: None,
            })
            .collect();
        memory.record_rejection(peer_ledger_location, &project.0, rejections)
    }

    pub async fn apply_resolution(
        &self,
        working_tree_path: &Path,
        resolution: &crate::models::Resolution,
        commit: &PendingCommit,
        file_path: &str,
    ) -> Result<OperationOutcome> {
        let content = match &resolution.merged_content {
            Some(content) if resolution.ok => content.clone(),
            _ => {
                return Ok(OperationOutcome::failed(EngineError::Other(
                    resolution
                        .explanation
                        .clone()
                        .unwrap_or_else(|| "resolution was not successful".to_string()),
                )))
            }
        };

        let driver = GitDriver::with_timeout(working_tree_path, &self.git_binary, self.git_timeout_secs);
        tokio::fs::write(working_tree_path.join(file_path), content).await?;
        driver.add_all().await?;

        use crate::services::git_driver::ContinueOutcome;
        match driver.cherry_pick_continue_for_resolution().await? {
            ContinueOutcome::Success(_) => Ok(OperationOutcome::success()),
            ContinueOutcome::EmptyPick => {
                driver.cherry_pick_skip().await?;
                Ok(OperationOutcome::success())
            }
            ContinueOutcome::NothingToCommit => {
                let message = format!("{} (conflict resolved)", commit.commit.subject);
                driver.commit_with_message(&message).await?;
                Ok(OperationOutcome::success())
            }
            ContinueOutcome::Conflict(result) | ContinueOutcome::Other(result) => {
                Ok(OperationOutcome::failed(EngineError::GitFailure {
                    stage: "cherry-pick --continue".to_string(),
                    exit_code: result.exit_code,
                    stderr: result.stderr,
                }))
            }
        }
    }

    /// Best-effort abort; always returns.
    pub async fn abort_resolution(&self, working_tree_path: &Path) {
        let driver = GitDriver::with_timeout(working_tree_path, &self.git_binary, self.git_timeout_secs);
        if driver.cherry_pick_abort().await.is_err() {
            let _ = driver.reset_hard("HEAD").await;
        }
    }

    async fn maybe_stash(driver: &GitDriver) -> Result<(bool, Option<String>)> {
        if driver.is_dirty().await? {
            driver.stash_push("peerpick preview").await?;
            let stash_ref = driver.stash_list_top().await?;
            Ok((true, stash_ref))
        } else {
            Ok((false, None))
        }
    }

    async fn rollback(driver: &GitDriver, applied_count: usize, stashed: bool) {
        if applied_count > 0 {
            let _ = driver.reset_hard(&format!("HEAD~{applied_count}")).await;
        }
        if stashed {
            let _ = driver.stash_pop().await;
        }
    }

    async fn apply_one(
        driver: &GitDriver,
        memory: &CollaborationMemory,
        project: &ProjectId,
        adapter_peer: Option<&PeerRef>,
        commit: &PendingCommit,
        host: &dyn Host,
    ) -> Result<ApplyStep> {
        let outcome = driver.cherry_pick_x(&commit.cherry_pick_ref).await?;
        match outcome {
            GitOutcome::Success(_) => Ok(ApplyStep::Applied),
            GitOutcome::EmptyPick => {
                driver.cherry_pick_skip().await?;
                Ok(ApplyStep::Skipped)
            }
            GitOutcome::Conflict(_) => {
                if let Some(peer) = adapter_peer {
                    if Self::try_replay_adaptation(driver, memory, project, peer, commit, host).await? {
                        return Ok(ApplyStep::Applied);
                    }
                }
                let files = driver.conflicted_files().await?;
                let conflict_info = match files.first() {
                    Some(file) => conflict_parser::get_conflict_info(driver, driver.repo_path(), file).await?,
                    None => None,
                };
                Ok(ApplyStep::Conflict(conflict_info))
            }
            GitOutcome::Other(result) => Ok(ApplyStep::Failed(EngineError::GitFailure {
                stage: "cherry-pick".to_string(),
                exit_code: result.exit_code,
                stderr: result.stderr,
            })),
        }
    }

    /// Attempts to reuse a stored `Adaptation` for this origin instead of
    /// surfacing the conflict. Returns `false` (and deletes the adaptation
    /// as stale) if replay fails, leaving the caller to fall through to the
    /// conflict-surfacing path.
    async fn try_replay_adaptation(
        driver: &GitDriver,
        memory: &CollaborationMemory,
        project: &ProjectId,
        peer: &PeerRef,
        commit: &PendingCommit,
        host: &dyn Host,
    ) -> Result<bool> {
        let origin_hash = &commit.commit.origin_hash;
        let adaptation = memory.get_adaptation(&peer.ledger_location, &project.0, origin_hash)?;
        let Some(adaptation) = adaptation else {
            return Ok(false);
        };

        for (path, content) in &adaptation.files {
            tokio::fs::write(driver.repo_path().join(path), content).await?;
        }
        driver.add_all().await?;

        match driver.cherry_pick_continue().await? {
            GitOutcome::Success(_) => Ok(true),
            GitOutcome::EmptyPick => {
                driver.cherry_pick_skip().await?;
                Ok(true)
            }
            _ => {
                memory.remove_adaptation(&peer.ledger_location, &project.0, origin_hash)?;
                let _ = driver.cherry_pick_abort().await;
                log::info!(
                    "stored adaptation for origin {} against peer {} is stale, deleted",
                    origin_hash,
                    peer.display_name
                );
                host.notify(HostEvent::AdaptationStale {
                    origin_hash: origin_hash.clone(),
                });
                Ok(false)
            }
        }
    }
}

impl Default for WorkflowStateMachine {
    fn default() -> Self {
        Self::new("git", 30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_engine_is_idle() {
        let sm = WorkflowStateMachine::new("git", 30);
        assert!(!sm.is_active());
        assert!(sm.snapshot().is_none());
    }

    #[test]
    fn test_force_cleanup_clears_state_even_when_idle() {
        let sm = WorkflowStateMachine::new("git", 30);
        sm.force_cleanup();
        assert!(!sm.is_active());
    }
}
