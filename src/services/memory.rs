use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;

use crate::error::Result;
use crate::models::{Acceptance, Adaptation, LedgerFile, Rejection};

/// Per-peer durable ledger store, cached in memory with single-writer
/// discipline. Mirrors the teacher's `Mutex<Connection>` cache pattern,
/// swapped here for a `Mutex<HashMap<path, LedgerFile>>` since the physical
/// store is one JSON file per peer rather than a shared database.
pub struct CollaborationMemory {
    cache: Mutex<std::collections::HashMap<PathBuf, LedgerFile>>,
}

impl CollaborationMemory {
    pub fn new() -> Self {
        CollaborationMemory {
            cache: Mutex::new(std::collections::HashMap::new()),
        }
    }

    /// Loads the ledger for the peer at `ledger_location`, populating the
    /// cache on first access. A missing file is treated as an empty ledger.
    pub fn load(&self, ledger_location: &str) -> Result<LedgerFile> {
        let path = PathBuf::from(ledger_location);
        let mut cache = self.cache.lock();
        if let Some(ledger) = cache.get(&path) {
            return Ok(ledger.clone());
        }
        let ledger = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LedgerFile::default(),
            Err(e) => return Err(e.into()),
        };
        cache.insert(path, ledger.clone());
        Ok(ledger)
    }

    /// Serializes and overwrites the ledger file crash-atomically via a
    /// temp file in the same directory, then rename-into-place. The cache
    /// is updated only after the write succeeds.
    pub fn save(&self, ledger_location: &str, ledger: &LedgerFile) -> Result<()> {
        let path = PathBuf::from(ledger_location);
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let json = serde_json::to_string_pretty(ledger)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| std::io::Error::other(e.to_string()))?;

        self.cache.lock().insert(path, ledger.clone());
        Ok(())
    }

    pub fn accepted_origins(&self, ledger_location: &str, project: &str) -> Result<HashSet<String>> {
        let ledger = self.load(ledger_location)?;
        Ok(ledger
            .project(project)
            .map(|p| p.accepted_origins())
            .unwrap_or_default())
    }

    pub fn rejected_origins(&self, ledger_location: &str, project: &str) -> Result<HashSet<String>> {
        let ledger = self.load(ledger_location)?;
        Ok(ledger
            .project(project)
            .map(|p| p.rejected_origins())
            .unwrap_or_default())
    }

    /// Records acceptances for a batch of commits. For an already-present
    /// `origin_hash`, unions `relayed_by` but leaves `accepted_at` alone —
    /// first-write wins.
    pub fn record_acceptance(
        &self,
        ledger_location: &str,
        project: &str,
        acceptances: Vec<Acceptance>,
    ) -> Result<()> {
        let mut ledger = self.load(ledger_location)?;
        let project_ledger = ledger.project_mut(project);
        for incoming in acceptances {
            if let Some(existing) = project_ledger
                .accepted
                .iter_mut()
                .find(|a| a.origin_hash == incoming.origin_hash)
            {
                existing.relayed_by.extend(incoming.relayed_by);
            } else {
                project_ledger.accepted.push(Acceptance {
                    accepted_at: Utc::now(),
                    ..incoming
                });
            }
        }
        self.save(ledger_location, &ledger)
    }

    pub fn record_rejection(
        &self,
        ledger_location: &str,
        project: &str,
        rejections: Vec<Rejection>,
    ) -> Result<()> {
        let mut ledger = self.load(ledger_location)?;
        let project_ledger = ledger.project_mut(project);
        for incoming in rejections {
            let already_present = project_ledger
                .rejected
                .iter()
                .any(|r| r.origin_hash == incoming.origin_hash);
            if !already_present {
                project_ledger.rejected.push(incoming);
            }
        }
        self.save(ledger_location, &ledger)
    }

    /// Removes the matching rejection, if any. Idempotent.
    pub fn unreject(&self, ledger_location: &str, project: &str, origin_hash: &str) -> Result<bool> {
        let mut ledger = self.load(ledger_location)?;
        let project_ledger = ledger.project_mut(project);
        let before = project_ledger.rejected.len();
        project_ledger.rejected.retain(|r| r.origin_hash != origin_hash);
        let removed = project_ledger.rejected.len() != before;
        if removed {
            self.save(ledger_location, &ledger)?;
        }
        Ok(removed)
    }

    pub fn store_adaptation(
        &self,
        ledger_location: &str,
        project: &str,
        origin_hash: &str,
        adaptation: Adaptation,
    ) -> Result<()> {
        let mut ledger = self.load(ledger_location)?;
        ledger
            .project_mut(project)
            .adaptations
            .insert(origin_hash.to_string(), adaptation);
        self.save(ledger_location, &ledger)
    }

    pub fn get_adaptation(
        &self,
        ledger_location: &str,
        project: &str,
        origin_hash: &str,
    ) -> Result<Option<Adaptation>> {
        let ledger = self.load(ledger_location)?;
        Ok(ledger
            .project(project)
            .and_then(|p| p.adaptations.get(origin_hash).cloned()))
    }

    pub fn remove_adaptation(&self, ledger_location: &str, project: &str, origin_hash: &str) -> Result<()> {
        let mut ledger = self.load(ledger_location)?;
        ledger.project_mut(project).adaptations.remove(origin_hash);
        self.save(ledger_location, &ledger)
    }
}

impl Default for CollaborationMemory {
    fn default() -> Self {
        Self::new()
    }
}
