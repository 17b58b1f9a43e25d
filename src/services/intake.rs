use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::host::Host;
use crate::models::{
    CommitRef, HostEvent, IntakeSummary, PeerCommitGroup, PeerId, PeerRef, PendingCommit, ProjectId,
};
use crate::services::git_driver::GitDriver;
use crate::services::memory::CollaborationMemory;
use crate::services::origin_hash::resolve_origin_hash;

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';

fn parse_log_records(raw: &str, source_ref: &str) -> Vec<CommitRef> {
    raw.split(RECORD_SEP)
        .filter(|record| !record.trim().is_empty())
        .filter_map(|record| {
            let mut fields = record.trim_start_matches('\n').splitn(6, FIELD_SEP);
            let local_hash = fields.next()?.to_string();
            let author = fields.next()?.to_string();
            let email = fields.next()?.to_string();
            let timestamp: i64 = fields.next()?.parse().ok()?;
            let subject = fields.next()?.to_string();
            let body = fields.next().unwrap_or("").trim_end_matches('\n').to_string();
            let origin_hash = resolve_origin_hash(&local_hash, &body);
            Some(CommitRef {
                local_hash,
                origin_hash,
                author,
                email,
                timestamp,
                subject,
                body,
                source_ref: source_ref.to_string(),
            })
        })
        .collect()
}

pub struct CommitIntake<'a> {
    memory: &'a CollaborationMemory,
    git_binary: &'a str,
    git_timeout_secs: u64,
}

impl<'a> CommitIntake<'a> {
    pub fn new(memory: &'a CollaborationMemory, git_binary: &'a str, git_timeout_secs: u64) -> Self {
        CommitIntake {
            memory,
            git_binary,
            git_timeout_secs,
        }
    }

    /// Enumerates, deduplicates, and groups commits offered by `peers`.
    /// Peers whose remote cannot be enumerated are skipped (logged),
    /// the rest still contribute. Returns the groups alongside a
    /// per-peer [`IntakeSummary`] the caller can surface in an
    /// [`crate::models::EngineSnapshot`].
    pub async fn list_pending(
        &self,
        project: &ProjectId,
        working_tree_path: &Path,
        default_branch: &str,
        peers: &[PeerRef],
        host: &dyn Host,
    ) -> Result<(Vec<PeerCommitGroup>, Vec<IntakeSummary>)> {
        let driver = GitDriver::with_timeout(working_tree_path, self.git_binary, self.git_timeout_secs);
        let branch = driver
            .current_branch()
            .await?
            .unwrap_or_else(|| default_branch.to_string());

        let mut by_origin: HashMap<String, PendingCommit> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        let mut skipped: HashMap<PeerId, bool> = HashMap::new();

        for peer in peers {
            let accepted = self.memory.accepted_origins(&peer.ledger_location, &project.0)?;
            let rejected = self.memory.rejected_origins(&peer.ledger_location, &project.0)?;

            let range_ref = format!("{}/{}", peer.remote_name, branch);
            let raw_log = match driver.log_range(&range_ref).await {
                Ok(raw) => raw,
                Err(cause) => {
                    log::warn!(
                        "skipping peer {} during intake: could not enumerate {}: {}",
                        peer.display_name,
                        range_ref,
                        cause
                    );
                    host.notify(HostEvent::PeerEnumerationFailed {
                        peer_display_name: peer.display_name.clone(),
                        cause: cause.to_string(),
                    });
                    skipped.insert(peer.peer_id.clone(), true);
                    continue;
                }
            };

            for commit in parse_log_records(&raw_log, &range_ref) {
                if accepted.contains(&commit.origin_hash) || rejected.contains(&commit.origin_hash) {
                    continue;
                }

                match by_origin.get_mut(&commit.origin_hash) {
                    Some(pending) => {
                        if !pending.offered_by.contains(&peer.peer_id) {
                            pending.offered_by.push(peer.peer_id.clone());
                            pending.offered_by_names.push(peer.display_name.clone());
                        }
                    }
                    None => {
                        let cherry_pick_ref = commit.local_hash.clone();
                        order.push(commit.origin_hash.clone());
                        by_origin.insert(
                            commit.origin_hash.clone(),
                            PendingCommit {
                                commit,
                                offered_by: vec![peer.peer_id.clone()],
                                offered_by_names: vec![peer.display_name.clone()],
                                cherry_pick_ref,
                            },
                        );
                    }
                }
            }
        }

        let peer_by_id: HashMap<&PeerId, &PeerRef> = peers.iter().map(|p| (&p.peer_id, p)).collect();
        let mut groups: HashMap<PeerId, Vec<PendingCommit>> = HashMap::new();
        for origin_hash in order {
            if let Some(pending) = by_origin.remove(&origin_hash) {
                groups.entry(pending.primary_peer().clone()).or_default().push(pending);
            }
        }

        let mut offered_counts: HashMap<PeerId, usize> = HashMap::new();
        let mut result: Vec<PeerCommitGroup> = Vec::new();
        for (peer_id, mut commits) in groups {
            if commits.is_empty() {
                continue;
            }
            commits.sort_by(|a, b| {
                a.commit
                    .timestamp
                    .cmp(&b.commit.timestamp)
                    .then_with(|| a.commit.local_hash.cmp(&b.commit.local_hash))
            });
            offered_counts.insert(peer_id.clone(), commits.len());
            if let Some(peer) = peer_by_id.get(&peer_id) {
                result.push(PeerCommitGroup {
                    peer: (*peer).clone(),
                    commits,
                });
            }
        }

        let summaries: Vec<IntakeSummary> = peers
            .iter()
            .map(|peer| IntakeSummary {
                peer_display_name: peer.display_name.clone(),
                offered_count: offered_counts.get(&peer.peer_id).copied().unwrap_or(0),
                skipped: skipped.contains_key(&peer.peer_id),
            })
            .collect();

        Ok((result, summaries))
    }
}
