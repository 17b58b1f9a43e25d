use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Stable opaque identifier for a shared project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        ProjectId(s.to_string())
    }
}

/// Stable identifier for a peer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub String);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        PeerId(s.to_string())
    }
}

/// A named remote peer who publishes a history of a shared project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerRef {
    pub peer_id: PeerId,
    pub display_name: String,
    /// The name under which this peer's git remote is registered locally.
    pub remote_name: String,
    /// Opaque, host-resolved path at which this peer's ledger persists.
    pub ledger_location: String,
    pub working_tree_path: String,
}

/// A commit as offered by some peer, before deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRef {
    pub local_hash: String,
    pub origin_hash: String,
    pub author: String,
    pub email: String,
    /// Seconds since epoch.
    pub timestamp: i64,
    pub subject: String,
    pub body: String,
    pub source_ref: String,
}

/// A commit offered by one or more peers, deduplicated by origin hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingCommit {
    #[serde(flatten)]
    pub commit: CommitRef,
    /// Insertion-ordered, non-empty.
    pub offered_by: Vec<PeerId>,
    pub offered_by_names: Vec<String>,
    /// The local hash to pass to `git cherry-pick`.
    pub cherry_pick_ref: String,
}

impl PendingCommit {
    pub fn offered_by_set(&self) -> HashSet<PeerId> {
        self.offered_by.iter().cloned().collect()
    }

    /// The primary offerer: the first peer that offered this commit.
    pub fn primary_peer(&self) -> &PeerId {
        &self.offered_by[0]
    }
}

/// Commits grouped under the peer who first offered them, oldest-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerCommitGroup {
    pub peer: PeerRef,
    pub commits: Vec<PendingCommit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit_ref(hash: &str, timestamp: i64) -> CommitRef {
        CommitRef {
            local_hash: hash.to_string(),
            origin_hash: hash.to_string(),
            author: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            timestamp,
            subject: "Add RESOURCES.md".to_string(),
            body: String::new(),
            source_ref: "bob/main".to_string(),
        }
    }

    #[test]
    fn test_primary_peer_is_first_offerer() {
        let pending = PendingCommit {
            commit: commit_ref("aaaa", 100),
            offered_by: vec![PeerId::from("bob"), PeerId::from("charlie")],
            offered_by_names: vec!["Bob".to_string(), "Charlie".to_string()],
            cherry_pick_ref: "b0b0".to_string(),
        };
        assert_eq!(pending.primary_peer(), &PeerId::from("bob"));
    }

    #[test]
    fn test_offered_by_set_contains_all_peers() {
        let pending = PendingCommit {
            commit: commit_ref("aaaa", 100),
            offered_by: vec![PeerId::from("bob"), PeerId::from("charlie")],
            offered_by_names: vec!["Bob".to_string(), "Charlie".to_string()],
            cherry_pick_ref: "b0b0".to_string(),
        };
        let set = pending.offered_by_set();
        assert!(set.contains(&PeerId::from("bob")));
        assert!(set.contains(&PeerId::from("charlie")));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_project_id_display() {
        let id = ProjectId::from("proj-1");
        assert_eq!(id.to_string(), "proj-1");
    }

    #[test]
    fn test_commit_ref_serialization_roundtrip() {
        let commit = commit_ref("abc123", 1_700_000_000);
        let json = serde_json::to_string(&commit).expect("should serialize");
        let back: CommitRef = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(back.local_hash, commit.local_hash);
        assert_eq!(back.timestamp, commit.timestamp);
    }
}
