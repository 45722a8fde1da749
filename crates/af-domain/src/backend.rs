use crate::error::Result;
use crate::model::Descriptor;
use std::path::Path;

/// Deterministic decoding parameters applied to every generation call.
///
/// Sourced from configuration rather than the request, so that behavior
/// is reproducible across users and across composed/fallback handles.
#[derive(Debug, Clone)]
pub struct DecodingParams {
    pub num_beams: u32,
    pub no_repeat_ngram_size: u32,
    pub length_penalty: f32,
    pub early_stopping: bool,
    pub max_new_tokens: u32,
}

/// An opaque reference to a model instance held by the backend.
///
/// The orchestrator never inspects the contents; it only clones and
/// passes it back to the backend for generation or composition.
#[derive(Debug, Clone)]
pub struct ModelRef(pub std::sync::Arc<str>);

impl ModelRef {
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// The external model-execution engine: loads the shared base model,
/// composes per-user adapters on top of it, and runs generation.
///
/// This is the seam at which a real tensor runtime (or a test double)
/// plugs in. Everything upstream of this trait treats model weights as
/// opaque.
#[async_trait::async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Load (or return a cached reference to) the shared base model.
    /// Called once at startup.
    async fn load_base(&self) -> Result<ModelRef>;

    /// Instantiate a fresh copy of the base model and apply the adapter
    /// described by `descriptor`, whose weights live under `bundle_dir`.
    ///
    /// A fresh copy is required because applying an adapter mutates the
    /// model graph in place; the shared base must never be touched.
    async fn compose(&self, bundle_dir: &Path, descriptor: &Descriptor) -> Result<ModelRef>;

    /// Generate text from `model` given `input`, truncated and decoded
    /// according to `params`. Returns the decoded continuation text and
    /// the number of tokens produced.
    async fn generate(
        &self,
        model: &ModelRef,
        input: &str,
        params: &DecodingParams,
    ) -> Result<(String, usize)>;

    /// Maximum number of input tokens the backend's encoder accepts.
    fn max_input_tokens(&self) -> usize;
}
