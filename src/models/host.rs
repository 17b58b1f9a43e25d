use serde::{Deserialize, Serialize};

use super::preview::PreviewState;

/// Best-effort notification the engine emits for visibility. Never gates
/// or alters an engine decision — a Host that drops these loses nothing
/// but observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum HostEvent {
    /// A peer's remote could not be enumerated during intake; other peers
    /// still contributed.
    PeerEnumerationFailed { peer_display_name: String, cause: String },
    /// A stored adaptation failed to apply and was deleted as stale.
    AdaptationStale { origin_hash: String },
    /// The working tree was rolled back after a failed preview or accept.
    RolledBack { reason: String },
}

/// Read-only diagnostic summary of one `listPending` pass, per peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeSummary {
    pub peer_display_name: String,
    pub offered_count: usize,
    pub skipped: bool,
}

/// A read-only view the Host can request at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    pub preview: Option<PreviewState>,
    pub last_intake: Vec<IntakeSummary>,
}
