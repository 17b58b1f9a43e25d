use serde::{Deserialize, Serialize};

/// One `<<<<<<< / ======= / >>>>>>>` region found in a conflicted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRegion {
    pub start_line: usize,
    pub ours: Vec<String>,
    pub theirs: Vec<String>,
    /// Up to 3 lines of unconflicted context immediately before the region.
    pub context_before: Vec<String>,
    /// Up to 3 lines of unconflicted context immediately after the region.
    pub context_after: Vec<String>,
}

/// Everything known about a conflicted file at the moment it was read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfo {
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ours_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theirs_content: Option<String>,
    /// The on-disk content, with conflict markers still present.
    pub raw_content: String,
    pub regions: Vec<ConflictRegion>,
}

/// Method used to produce a [`Resolution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    Structural,
    Semantic,
    Manual,
}

/// The output of one pass of the resolver chain for one conflicted file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_content: Option<String>,
    pub method: ResolutionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Resolution {
    pub fn failure(method: ResolutionMethod, explanation: impl Into<String>) -> Self {
        Resolution {
            ok: false,
            merged_content: None,
            method,
            explanation: Some(explanation.into()),
            error: None,
        }
    }

    pub fn success(method: ResolutionMethod, merged_content: String) -> Self {
        Resolution {
            ok: true,
            merged_content: Some(merged_content),
            method,
            explanation: None,
            error: None,
        }
    }
}
