use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::commit::PeerId;

/// An accepted commit, recorded after a successful cherry-pick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acceptance {
    pub origin_hash: String,
    pub applied_hash: String,
    pub relayed_by: HashSet<PeerId>,
    pub subject: String,
    pub accepted_at: DateTime<Utc>,
}

/// A rejected commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub origin_hash: String,
    pub subject: String,
    pub rejected_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Resolution method that produced a stored adaptation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationMethod {
    Structural,
    Semantic,
    Manual,
}

/// A stored, reusable resolution of a prior conflict for a given origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adaptation {
    pub origin_hash: String,
    /// Repo-relative path -> full file content.
    pub files: BTreeMap<String, String>,
    pub method: AdaptationMethod,
    pub created_at: DateTime<Utc>,
}

/// The decisions recorded for one project, as seen by one peer's ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectLedger {
    #[serde(default)]
    pub accepted: Vec<Acceptance>,
    #[serde(default)]
    pub rejected: Vec<Rejection>,
    #[serde(default)]
    pub adaptations: BTreeMap<String, Adaptation>,
}

impl ProjectLedger {
    pub fn accepted_origins(&self) -> HashSet<String> {
        self.accepted.iter().map(|a| a.origin_hash.clone()).collect()
    }

    pub fn rejected_origins(&self) -> HashSet<String> {
        self.rejected.iter().map(|r| r.origin_hash.clone()).collect()
    }
}

fn default_version() -> u32 {
    1
}

/// The physical, on-disk ledger for one peer: every project's decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerFile {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectLedger>,
}

impl Default for LedgerFile {
    fn default() -> Self {
        LedgerFile {
            version: default_version(),
            projects: BTreeMap::new(),
        }
    }
}

impl LedgerFile {
    pub fn project(&self, project: &str) -> Option<&ProjectLedger> {
        self.projects.get(project)
    }

    pub fn project_mut(&mut self, project: &str) -> &mut ProjectLedger {
        self.projects.entry(project.to_string()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_version_defaults_to_one() {
        let json = r#"{"projects":{}}"#;
        let ledger: LedgerFile = serde_json::from_str(json).expect("should deserialize");
        assert_eq!(ledger.version, 1);
    }

    #[test]
    fn test_forward_compatible_read_ignores_unknown_version() {
        let json = r#"{"version":7,"projects":{}}"#;
        let ledger: LedgerFile = serde_json::from_str(json).expect("should deserialize");
        assert_eq!(ledger.version, 7);
        assert!(ledger.projects.is_empty());
    }

    #[test]
    fn test_project_mut_creates_entry() {
        let mut ledger = LedgerFile::default();
        ledger.project_mut("proj-1").rejected.push(Rejection {
            origin_hash: "deadbeef".to_string(),
            subject: "X".to_string(),
            rejected_at: Utc::now(),
            reason: None,
        });
        assert_eq!(ledger.projects.len(), 1);
        assert_eq!(ledger.project("proj-1").unwrap().rejected.len(), 1);
    }

    #[test]
    fn test_accepted_origins_set() {
        let mut ledger = ProjectLedger::default();
        ledger.accepted.push(Acceptance {
            origin_hash: "aaaa".to_string(),
            applied_hash: "bbbb".to_string(),
            relayed_by: HashSet::new(),
            subject: "Add RESOURCES.md".to_string(),
            accepted_at: Utc::now(),
        });
        let origins = ledger.accepted_origins();
        assert!(origins.contains("aaaa"));
        assert_eq!(origins.len(), 1);
    }

    #[test]
    fn test_ledger_roundtrip_with_adaptation() {
        let mut ledger = LedgerFile::default();
        let mut files = BTreeMap::new();
        files.insert("README.md".to_string(), "merged content".to_string());
        ledger.project_mut("proj-1").adaptations.insert(
            "deadbeef".to_string(),
            Adaptation {
                origin_hash: "deadbeef".to_string(),
                files,
                method: AdaptationMethod::Structural,
                created_at: Utc::now(),
            },
        );

        let json = serde_json::to_string(&ledger).expect("should serialize");
        let back: LedgerFile = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(
            back.project("proj-1").unwrap().adaptations.len(),
            1
        );
    }
}
