use serde::{Deserialize, Serialize};

/// Construction-time settings for the engine. Mirrors the teacher's
/// settings-as-data-struct pattern (`AppSettings`) rather than a global:
/// each engine instance owns one of these, passed in at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Name or path of the git binary to invoke. Defaults to `"git"`.
    pub git_binary: String,
    /// Per-invocation timeout for git subprocess calls.
    pub git_timeout_secs: u64,
    /// Branch name to assume when the repository is in a detached HEAD
    /// state and no current branch can be determined.
    pub default_branch: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            git_binary: "git".to_string(),
            git_timeout_secs: 30,
            default_branch: "main".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.git_binary, "git");
        assert_eq!(config.default_branch, "main");
        assert!(config.git_timeout_secs > 0);
    }
}
