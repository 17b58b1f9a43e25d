use std::path::{Path, PathBuf};
use std::process::Output;

use crate::error::{EngineError, Result};
use crate::services::create_command;

/// Raw result of one git invocation.
#[derive(Debug, Clone)]
pub struct GitCommandResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for GitCommandResult {
    fn from(output: Output) -> Self {
        GitCommandResult {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// Classification of a cherry-pick (or stash-pop) attempt. Substring
/// probing of stderr is confined to this module; every other component
/// branches over this variant, never over raw git output.
#[derive(Debug, Clone)]
pub enum GitOutcome {
    Success(GitCommandResult),
    /// stderr contained "cherry-pick is now empty" / "nothing to commit" —
    /// the diff was already present upstream.
    EmptyPick,
    /// stderr contained "CONFLICT" or "could not apply".
    Conflict(GitCommandResult),
    /// Any other non-zero exit.
    Other(GitCommandResult),
}

impl GitOutcome {
    fn classify(result: GitCommandResult) -> Self {
        if result.success {
            return GitOutcome::Success(result);
        }
        let haystack = format!("{}\n{}", result.stdout, result.stderr);
        if haystack.contains("cherry-pick is now empty") || haystack.contains("nothing to commit")
        {
            GitOutcome::EmptyPick
        } else if haystack.contains("CONFLICT") || haystack.contains("could not apply") {
            GitOutcome::Conflict(result)
        } else {
            GitOutcome::Other(result)
        }
    }
}

/// Finer-grained classification of `cherry-pick --continue` used only by
/// `applyResolution`, which must distinguish "already empty" (skip) from
/// "nothing staged after a manual write" (commit manually) — two outcomes
/// [`GitOutcome`] collapses into one. Substring probing still stays here.
#[derive(Debug, Clone)]
pub enum ContinueOutcome {
    Success(GitCommandResult),
    EmptyPick,
    NothingToCommit,
    Conflict(GitCommandResult),
    Other(GitCommandResult),
}

impl ContinueOutcome {
    fn classify(result: GitCommandResult) -> Self {
        if result.success {
            return ContinueOutcome::Success(result);
        }
        let haystack = format!("{}\n{}", result.stdout, result.stderr);
        if haystack.contains("nothing to commit") {
            ContinueOutcome::NothingToCommit
        } else if haystack.contains("cherry-pick is now empty") {
            ContinueOutcome::EmptyPick
        } else if haystack.contains("CONFLICT") || haystack.contains("could not apply") {
            ContinueOutcome::Conflict(result)
        } else {
            ContinueOutcome::Other(result)
        }
    }
}

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Thin typed wrapper over git invocations. Only this driver shells out;
/// every other component in the engine talks to it, never to a raw
/// `Command`.
pub struct GitDriver {
    repo_path: PathBuf,
    git_binary: String,
    timeout: std::time::Duration,
}

impl GitDriver {
    pub fn new(repo_path: &Path, git_binary: &str) -> Self {
        Self::with_timeout(repo_path, git_binary, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(repo_path: &Path, git_binary: &str, timeout_secs: u64) -> Self {
        GitDriver {
            repo_path: repo_path.to_path_buf(),
            git_binary: git_binary.to_string(),
            timeout: std::time::Duration::from_secs(timeout_secs),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<GitCommandResult> {
        let stage = args.first().unwrap_or(&"git").to_string();
        let output = tokio::time::timeout(
            self.timeout,
            create_command(&self.git_binary)
                .args(args)
                .current_dir(&self.repo_path)
                .output(),
        )
        .await
        .map_err(|_| EngineError::GitFailure {
            stage: stage.clone(),
            exit_code: -1,
            stderr: format!("timed out after {:?}", self.timeout),
        })?
        .map_err(|e| EngineError::GitFailure {
            stage,
            exit_code: -1,
            stderr: e.to_string(),
        })?;
        Ok(GitCommandResult::from(output))
    }

    async fn run_checked(&self, stage: &str, args: &[&str]) -> Result<GitCommandResult> {
        let result = self.run(args).await?;
        if !result.success {
            return Err(EngineError::GitFailure {
                stage: stage.to_string(),
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }
        Ok(result)
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub async fn status_porcelain(&self) -> Result<String> {
        let result = self.run_checked("status", &["status", "--porcelain"]).await?;
        Ok(result.stdout)
    }

    pub async fn is_dirty(&self) -> Result<bool> {
        Ok(!self.status_porcelain().await?.trim().is_empty())
    }

    pub async fn stash_push(&self, message: &str) -> Result<GitCommandResult> {
        self.run_checked("stash push", &["stash", "push", "-m", message])
            .await
    }

    pub async fn stash_list_top(&self) -> Result<Option<String>> {
        let result = self.run(&["stash", "list", "-1"]).await?;
        let first_line = result.stdout.lines().next().map(|l| l.to_string());
        Ok(first_line.filter(|l| !l.is_empty()))
    }

    pub async fn stash_pop(&self) -> Result<GitCommandResult> {
        self.run_checked("stash pop", &["stash", "pop"]).await
    }

    pub async fn cherry_pick_x(&self, hash: &str) -> Result<GitOutcome> {
        let result = self.run(&["cherry-pick", "-x", hash]).await?;
        Ok(GitOutcome::classify(result))
    }

    pub async fn cherry_pick_continue(&self) -> Result<GitOutcome> {
        let result = self.run(&["cherry-pick", "--continue", "--no-edit"]).await?;
        Ok(GitOutcome::classify(result))
    }

    pub async fn cherry_pick_continue_for_resolution(&self) -> Result<ContinueOutcome> {
        let result = self.run(&["cherry-pick", "--continue", "--no-edit"]).await?;
        Ok(ContinueOutcome::classify(result))
    }

    pub async fn cherry_pick_skip(&self) -> Result<GitCommandResult> {
        self.run_checked("cherry-pick --skip", &["cherry-pick", "--skip"])
            .await
    }

    pub async fn cherry_pick_abort(&self) -> Result<()> {
        let _ = self.run(&["cherry-pick", "--abort"]).await?;
        Ok(())
    }

    pub async fn commit_with_message(&self, message: &str) -> Result<GitOutcome> {
        let result = self.run(&["commit", "-m", message]).await?;
        Ok(GitOutcome::classify(result))
    }

    pub async fn reset_hard(&self, target: &str) -> Result<GitCommandResult> {
        self.run_checked("reset --hard", &["reset", "--hard", target])
            .await
    }

    /// The `n` most recent commit hashes on HEAD, newest first.
    pub async fn recent_hashes(&self, n: usize) -> Result<Vec<String>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let count = n.to_string();
        let result = self
            .run_checked("log", &["log", "-n", &count, "--format=%H"])
            .await?;
        Ok(result.stdout.lines().map(|l| l.to_string()).filter(|l| !l.is_empty()).collect())
    }

    pub async fn rev_parse(&self, rev: &str) -> Result<String> {
        let result = self.run_checked("rev-parse", &["rev-parse", rev]).await?;
        Ok(result.stdout.trim().to_string())
    }

    /// The current branch name, or `None` if HEAD is detached.
    pub async fn current_branch(&self) -> Result<Option<String>> {
        let result = self
            .run_checked("branch --show-current", &["branch", "--show-current"])
            .await?;
        let name = result.stdout.trim().to_string();
        Ok(if name.is_empty() { None } else { Some(name) })
    }

    /// Commits reachable from `range_ref` but not from local HEAD, oldest
    /// first. Each commit is one record of fields joined by `\x1f`
    /// (hash, author, email, timestamp, subject, body), records separated
    /// by `\x1e`: `<hash>\x1f<author>\x1f<email>\x1f<timestamp>\x1f<subject>\x1f<body>\x1e`.
    pub async fn log_range(&self, range_ref: &str) -> Result<String> {
        let format = "%H%x1f%an%x1f%ae%x1f%at%x1f%s%x1f%b%x1e";
        let range = format!("HEAD..{range_ref}");
        let result = self
            .run(&["log", &range, "--format", format, "--reverse"])
            .await?;
        if !result.success {
            return Err(EngineError::GitFailure {
                stage: "log".to_string(),
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }
        Ok(result.stdout)
    }

    pub async fn conflicted_files(&self) -> Result<Vec<String>> {
        let result = self
            .run_checked(
                "diff --diff-filter=U",
                &["diff", "--name-only", "--diff-filter=U"],
            )
            .await?;
        Ok(result
            .stdout
            .lines()
            .map(|l| l.to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }

    /// `git show :N:path` for index stage N (1=base, 2=ours, 3=theirs).
    /// Returns `None` when the stage doesn't exist for this path.
    pub async fn show_stage(&self, stage: u8, path: &str) -> Result<Option<String>> {
        let spec = format!(":{stage}:{path}");
        let result = self.run(&["show", &spec]).await?;
        if result.success {
            Ok(Some(result.stdout))
        } else {
            Ok(None)
        }
    }

    pub async fn add_all(&self) -> Result<()> {
        self.run_checked("add -A", &["add", "-A"]).await?;
        Ok(())
    }
}
