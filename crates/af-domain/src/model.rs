use serde::{Deserialize, Serialize};

/// Reserved user id under which the shared base model is kept.
///
/// Never accepted on the public surface; reserved for the orchestrator's
/// internal bookkeeping.
pub const BASE_SENTINEL: &str = "__base__";

/// An opaque per-user identifier. Never interpreted beyond equality.
pub type UserId = String;

/// A content-derived fingerprint of a user's adapter bundle.
///
/// Two bundles with identical `(key, etag_or_mtime, size)` triplets (in
/// sorted key order) produce the same tag.
pub type VersionTag = String;

/// Canonical, backend-ready adapter metadata.
///
/// Produced by the descriptor normalizer from whatever heterogeneous
/// metadata file a bundle happens to carry. Unknown input fields are
/// dropped; missing recognized fields fall back to fixed defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Descriptor {
    pub r: u32,
    pub lora_alpha: u32,
    pub lora_dropout: f32,
    pub target_modules: Vec<String>,
    pub bias: String,
    pub task_type: String,
    pub inference_mode: bool,
    #[serde(default)]
    pub modules_to_save: Vec<String>,
    #[serde(default)]
    pub init_lora_weights: bool,
    #[serde(default)]
    pub fan_in_fan_out: bool,
    #[serde(default)]
    pub use_rslora: bool,
    #[serde(default)]
    pub alpha_pattern: std::collections::HashMap<String, u32>,
    #[serde(default)]
    pub base_model_name_or_path: Option<String>,
    pub peft_type: String,
}

impl Default for Descriptor {
    fn default() -> Self {
        Self {
            r: 8,
            lora_alpha: 8,
            lora_dropout: 0.0,
            target_modules: Vec::new(),
            bias: "none".into(),
            task_type: "SEQ_2_SEQ_LM".into(),
            inference_mode: true,
            modules_to_save: Vec::new(),
            init_lora_weights: true,
            fan_in_fan_out: false,
            use_rslora: false,
            alpha_pattern: std::collections::HashMap::new(),
            base_model_name_or_path: None,
            peft_type: "LORA".into(),
        }
    }
}

/// The lifecycle state of a [`crate::handle::Handle`]-equivalent runtime entity.
///
/// Defined here so that both the cache crate (which owns the concrete
/// `Handle` struct) and any observer (admin endpoints, tests) can reason
/// about state without depending on cache internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleState {
    Composed,
    Fallback,
    Released,
}

impl std::fmt::Display for HandleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandleState::Composed => write!(f, "composed"),
            HandleState::Fallback => write!(f, "fallback"),
            HandleState::Released => write!(f, "released"),
        }
    }
}
