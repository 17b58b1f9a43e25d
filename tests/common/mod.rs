//! Throwaway on-disk git repositories for integration tests. Every test
//! gets its own `TempDir`; nothing here touches a shared fixture.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// A throwaway git working tree, removed when dropped.
pub struct TestRepo {
    _dir: TempDir,
    path: PathBuf,
}

impl TestRepo {
    /// Initializes a repo with one commit (`README.md` containing "base")
    /// on branch `main`.
    pub fn init() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().to_path_buf();
        let repo = TestRepo { _dir: dir, path };

        repo.git(&["init", "--initial-branch=main"]);
        repo.git(&["config", "user.name", "Test User"]);
        repo.git(&["config", "user.email", "test@example.com"]);
        repo.write_file("README.md", "base\n");
        repo.git(&["add", "-A"]);
        repo.git(&["commit", "-m", "initial commit"]);
        repo
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn git(&self, args: &[&str]) -> Output {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()
            .expect("git invocation failed to spawn");
        output
    }

    pub fn git_ok(&self, args: &[&str]) -> Output {
        let output = self.git(args);
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        output
    }

    pub fn write_file(&self, name: &str, content: &str) {
        std::fs::write(self.path.join(name), content).expect("write file");
    }

    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.path.join(name)).expect("read file")
    }

    pub fn stage_and_commit(&self, message: &str) -> String {
        self.git_ok(&["add", "-A"]);
        self.git_ok(&["commit", "-m", message]);
        self.head()
    }

    /// Commits the current stage with a cherry-pick trailer pointing at
    /// `origin_hash`, mirroring what `git cherry-pick -x` appends.
    pub fn stage_and_commit_with_trailer(&self, message: &str, origin_hash: &str) -> String {
        let full = format!("{message}\n\n(cherry picked from commit {origin_hash})\n");
        self.git_ok(&["add", "-A"]);
        self.git_ok(&["commit", "-m", &full]);
        self.head()
    }

    pub fn head(&self) -> String {
        let output = self.git_ok(&["rev-parse", "HEAD"]);
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    pub fn status_porcelain(&self) -> String {
        let output = self.git_ok(&["status", "--porcelain"]);
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn stash_count(&self) -> usize {
        let output = self.git_ok(&["stash", "list"]);
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|l| !l.is_empty())
            .count()
    }

    /// Registers `peer` as a remote named `name` and fetches it.
    pub fn add_remote(&self, name: &str, peer: &TestRepo) {
        self.git_ok(&["remote", "add", name, peer.path.to_str().unwrap()]);
        self.git_ok(&["fetch", name]);
    }

    /// Installs a `pre-commit` hook that always rejects the commit, so any
    /// `git commit` / `cherry-pick --continue` in this repo deterministically
    /// fails without tripping the "empty"/"nothing to commit" substrings.
    pub fn install_failing_commit_hook(&self) {
        let hooks_dir = self.path.join(".git").join("hooks");
        std::fs::create_dir_all(&hooks_dir).expect("create hooks dir");
        let hook_path = hooks_dir.join("pre-commit");
        std::fs::write(&hook_path, "#!/bin/sh\nexit 1\n").expect("write hook");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&hook_path).expect("stat hook").permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&hook_path, perms).expect("chmod hook");
        }
    }

    /// Clones `base` into a fresh working tree sharing its history, so that
    /// later divergent commits show up cleanly in `HEAD..remote/branch`.
    pub fn clone_from(base: &TestRepo) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().to_path_buf();
        let output = Command::new("git")
            .args(["clone", base.path.to_str().unwrap(), "."])
            .current_dir(&path)
            .output()
            .expect("git clone failed to spawn");
        assert!(
            output.status.success(),
            "git clone failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        let repo = TestRepo { _dir: dir, path };
        repo.git_ok(&["config", "user.name", "Test User"]);
        repo.git_ok(&["config", "user.email", "test@example.com"]);
        repo
    }
}
