//! Reference [`InferenceBackend`] implementation.
//!
//! The actual tensor runtime that applies a LoRA adapter to a base model
//! and runs generation is an external collaborator — out of scope here,
//! the same way the teacher's `LlmProvider` trait lets a real HTTP-backed
//! provider plug in behind a uniform interface. This implementation is a
//! deterministic stand-in: it never touches a GPU, only proves out the
//! composition/generation protocol so the orchestrator can be exercised
//! and the service booted end to end.

use af_domain::backend::{DecodingParams, InferenceBackend, ModelRef};
use af_domain::error::Result;
use af_domain::model::Descriptor;
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Composes by hashing the bundle path and descriptor into a synthetic
/// model id; generates by echoing a deterministic transform of the input
/// so callers can assert on behavior without a real model.
pub struct LocalEchoBackend {
    max_input_tokens: usize,
    composed_count: AtomicU64,
}

impl LocalEchoBackend {
    pub fn new(max_input_tokens: usize) -> Self {
        Self {
            max_input_tokens,
            composed_count: AtomicU64::new(0),
        }
    }

    pub fn composed_count(&self) -> u64 {
        self.composed_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl InferenceBackend for LocalEchoBackend {
    async fn load_base(&self) -> Result<ModelRef> {
        Ok(ModelRef(Arc::from("base-model")))
    }

    async fn compose(&self, bundle_dir: &Path, descriptor: &Descriptor) -> Result<ModelRef> {
        self.composed_count.fetch_add(1, Ordering::Relaxed);
        let id = format!(
            "composed:{}:r{}:a{}",
            bundle_dir.file_name().and_then(|n| n.to_str()).unwrap_or("bundle"),
            descriptor.r,
            descriptor.lora_alpha,
        );
        Ok(ModelRef(Arc::from(id.as_str())))
    }

    async fn generate(
        &self,
        model: &ModelRef,
        input: &str,
        params: &DecodingParams,
    ) -> Result<(String, usize)> {
        let budget = params.max_new_tokens as usize;
        let words: Vec<&str> = input.split_whitespace().take(budget.max(1)).collect();
        let text = format!("[{}] {}", model.id(), words.join(" "));
        let tokens = words.len().min(budget.max(1));
        Ok((text, tokens))
    }

    fn max_input_tokens(&self) -> usize {
        self.max_input_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_domain::model::Descriptor;

    fn params() -> DecodingParams {
        DecodingParams {
            num_beams: 4,
            no_repeat_ngram_size: 3,
            length_penalty: 1.0,
            early_stopping: true,
            max_new_tokens: 8,
        }
    }

    #[tokio::test]
    async fn compose_increments_counter() {
        let backend = LocalEchoBackend::new(512);
        let descriptor = Descriptor::default();
        backend
            .compose(Path::new("/tmp/bundle"), &descriptor)
            .await
            .unwrap();
        assert_eq!(backend.composed_count(), 1);
    }

    #[tokio::test]
    async fn generate_respects_max_new_tokens() {
        let backend = LocalEchoBackend::new(512);
        let model = ModelRef(Arc::from("base"));
        let (_, tokens) = backend
            .generate(&model, "one two three four five six seven eight nine", &params())
            .await
            .unwrap();
        assert_eq!(tokens, 8);
    }
}
