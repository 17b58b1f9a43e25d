use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::host::{Host, NullHost};
use crate::models::{
    Adaptation, AdaptationMethod, EngineSnapshot, IntakeSummary, OperationOutcome, PeerCommitGroup,
    PeerRef, PendingCommit, PreviewState, ProjectId, Resolution, ResolutionMethod,
};
use crate::services::intake::CommitIntake;
use crate::services::memory::CollaborationMemory;
use crate::services::resolver::{resolve_semantic, try_structural, LlmClient};
use crate::workflow::WorkflowStateMachine;

/// Stable API surface consumed by the Host. Owns concrete collaborators —
/// no singletons, no registry — constructed once per embedding.
pub struct PeerEngine {
    config: EngineConfig,
    memory: CollaborationMemory,
    workflow: WorkflowStateMachine,
    llm: Arc<dyn LlmClient>,
    host: Arc<dyn Host>,
    last_intake: Mutex<Vec<IntakeSummary>>,
}

impl PeerEngine {
    pub fn new(config: EngineConfig, llm: Arc<dyn LlmClient>, host: Arc<dyn Host>) -> Self {
        let workflow = WorkflowStateMachine::new(config.git_binary.clone(), config.git_timeout_secs);
        PeerEngine {
            config,
            memory: CollaborationMemory::new(),
            workflow,
            llm,
            host,
            last_intake: Mutex::new(Vec::new()),
        }
    }

    pub fn with_null_host(config: EngineConfig, llm: Arc<dyn LlmClient>) -> Self {
        Self::new(config, llm, Arc::new(NullHost))
    }

    pub async fn list_pending(
        &self,
        project: &ProjectId,
        working_tree_path: &Path,
        peers: &[PeerRef],
    ) -> Result<Vec<PeerCommitGroup>> {
        let intake = CommitIntake::new(&self.memory, &self.config.git_binary, self.config.git_timeout_secs);
        let (groups, summaries) = intake
            .list_pending(
                project,
                working_tree_path,
                &self.config.default_branch,
                peers,
                self.host.as_ref(),
            )
            .await?;
        *self.last_intake.lock() = summaries;
        Ok(groups)
    }

    pub async fn start_preview(
        &self,
        project: &ProjectId,
        working_tree_path: &Path,
        commits: Vec<PendingCommit>,
        adapter_peer: Option<&PeerRef>,
    ) -> Result<OperationOutcome> {
        self.workflow
            .start_preview(
                &self.memory,
                project,
                working_tree_path,
                commits,
                adapter_peer,
                self.host.as_ref(),
            )
            .await
    }

    pub async fn commit_preview(&self, peer_ledger_location: &str) -> Result<()> {
        self.workflow.commit_preview(&self.memory, peer_ledger_location).await
    }

    pub async fn reject_preview(&self, peer_ledger_location: &str) -> Result<()> {
        self.workflow.reject_preview(&self.memory, peer_ledger_location).await
    }

    pub async fn cancel_preview(&self) -> Result<()> {
        self.workflow.cancel_preview().await
    }

    pub async fn accept_now(
        &self,
        project: &ProjectId,
        working_tree_path: &Path,
        peer_ledger_location: &str,
        commits: Vec<PendingCommit>,
        adapter_peer: Option<&PeerRef>,
    ) -> Result<OperationOutcome> {
        self.workflow
            .accept_now(
                &self.memory,
                project,
                working_tree_path,
                peer_ledger_location,
                commits,
                adapter_peer,
                self.host.as_ref(),
            )
            .await
    }

    pub fn reject_now(
        &self,
        project: &ProjectId,
        peer_ledger_location: &str,
        commits: &[PendingCommit],
    ) -> Result<()> {
        self.workflow.reject_now(&self.memory, project, peer_ledger_location, commits)
    }

    pub fn unreject(&self, peer_ledger_location: &str, project: &ProjectId, origin_hash: &str) -> Result<bool> {
        self.memory.unreject(peer_ledger_location, &project.0, origin_hash)
    }

    /// Runs the layered resolver chain (structural, then LLM-semantic) for
    /// one conflict, trying cheaper heuristics first.
    pub async fn resolve_conflict(
        &self,
        conflict: &crate::models::ConflictInfo,
        refinements: &[String],
    ) -> Resolution {
        let structural = try_structural(conflict);
        if structural.ok {
            return structural;
        }
        resolve_semantic(self.llm.as_ref(), conflict, refinements).await
    }

    pub async fn apply_resolution(
        &self,
        working_tree_path: &Path,
        resolution: &Resolution,
        commit: &PendingCommit,
        file_path: &str,
    ) -> Result<OperationOutcome> {
        self.workflow
            .apply_resolution(working_tree_path, resolution, commit, file_path)
            .await
    }

    /// Stores a successful resolution as a reusable adaptation. Callers
    /// invoke this after `apply_resolution` succeeds.
    pub fn store_adaptation(
        &self,
        peer_ledger_location: &str,
        project: &ProjectId,
        origin_hash: &str,
        file_path: &str,
        merged_content: &str,
        method: ResolutionMethod,
    ) -> Result<()> {
        let mut files = std::collections::BTreeMap::new();
        files.insert(file_path.to_string(), merged_content.to_string());
        let adaptation = Adaptation {
            origin_hash: origin_hash.to_string(),
            files,
            method: match method {
                ResolutionMethod::Structural => AdaptationMethod::Structural,
                ResolutionMethod::Semantic => AdaptationMethod::Semantic,
                ResolutionMethod::Manual => AdaptationMethod::Manual,
            },
            created_at: chrono::Utc::now(),
        };
        self.memory
            .store_adaptation(peer_ledger_location, &project.0, origin_hash, adaptation)
    }

    pub async fn abort_resolution(&self, working_tree_path: &Path) {
        self.workflow.abort_resolution(working_tree_path).await
    }

    pub fn is_preview_active(&self) -> bool {
        self.workflow.is_active()
    }

    pub fn force_cleanup_preview(&self) {
        self.workflow.force_cleanup();
        self.host.notify(crate::models::HostEvent::RolledBack {
            reason: "force cleanup requested".to_string(),
        });
    }

    pub fn preview_snapshot(&self) -> Option<PreviewState> {
        self.workflow.snapshot()
    }

    /// A read-only diagnostic view: the current preview (if any) plus a
    /// per-peer summary of the most recent `list_pending` pass. Purely
    /// observational — never consulted by any decision in the engine.
    pub fn engine_snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            preview: self.workflow.snapshot(),
            last_intake: self.last_intake.lock().clone(),
        }
    }
}
