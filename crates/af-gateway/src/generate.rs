//! Generation front: runs one inference call against a handle, holding
//! its lock for the whole encode-generate-decode sequence.

use af_cache::handle::Handle;
use af_domain::backend::{DecodingParams, InferenceBackend};
use af_domain::error::Result;
use af_domain::trace::TraceEvent;
use std::time::Instant;

pub async fn generate(
    handle: &Handle,
    backend: &dyn InferenceBackend,
    input: &str,
    max_new_tokens: u32,
    base_params: &DecodingParams,
) -> Result<(String, usize)> {
    let _guard = handle.lock.lock().await;
    handle.touch();
    let started = Instant::now();

    let max_chars = backend.max_input_tokens() * 4;
    let truncated = truncate_at_char_boundary(input, max_chars);

    let params = DecodingParams {
        max_new_tokens,
        ..base_params.clone()
    };

    let result = backend.generate(&handle.model_ref, truncated, &params).await;
    handle.touch();

    match result {
        Ok((text, tokens)) => {
            TraceEvent::GenerateCompleted {
                user_id: handle.user_id.clone(),
                tokens,
                duration_ms: started.elapsed().as_millis() as u64,
            }
            .emit();
            Ok((text, tokens))
        }
        Err(e) => Err(e),
    }
}

/// Truncates `input` to at most `max_chars` bytes, backing off to the
/// nearest preceding char boundary so multi-byte UTF-8 sequences are
/// never split.
fn truncate_at_char_boundary(input: &str, max_chars: usize) -> &str {
    if input.len() <= max_chars {
        return input;
    }
    let mut end = max_chars;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    &input[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_domain::backend::ModelRef;
    use af_domain::model::Descriptor;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Arc;

    struct EchoBackend;

    #[async_trait]
    impl InferenceBackend for EchoBackend {
        async fn load_base(&self) -> Result<ModelRef> {
            Ok(ModelRef(Arc::from("base")))
        }
        async fn compose(&self, _: &Path, _: &Descriptor) -> Result<ModelRef> {
            Ok(ModelRef(Arc::from("composed")))
        }
        async fn generate(
            &self,
            _model: &ModelRef,
            input: &str,
            _params: &DecodingParams,
        ) -> Result<(String, usize)> {
            Ok((format!("out:{input}"), input.len()))
        }
        fn max_input_tokens(&self) -> usize {
            4
        }
    }

    fn default_params() -> DecodingParams {
        DecodingParams {
            num_beams: 4,
            no_repeat_ngram_size: 3,
            length_penalty: 1.0,
            early_stopping: true,
            max_new_tokens: 56,
        }
    }

    #[tokio::test]
    async fn updates_last_used() {
        let handle = Handle::base(ModelRef(Arc::from("base")));
        let before = handle.idle_for();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let backend = EchoBackend;
        generate(&handle, &backend, "hello", 56, &default_params())
            .await
            .unwrap();
        assert!(handle.idle_for() < before);
    }

    #[tokio::test]
    async fn truncates_long_input() {
        let handle = Handle::base(ModelRef(Arc::from("base")));
        let backend = EchoBackend; // max_input_tokens=4 -> max_chars=16
        let long_input = "x".repeat(100);
        let (out, _) = generate(&handle, &backend, &long_input, 56, &default_params())
            .await
            .unwrap();
        assert_eq!(out, format!("out:{}", "x".repeat(16)));
    }

    #[tokio::test]
    async fn truncation_backs_off_to_char_boundary() {
        let handle = Handle::base(ModelRef(Arc::from("base")));
        let backend = EchoBackend; // max_input_tokens=4 -> max_chars=16
                                   // 15 ASCII chars + one 3-byte char straddling byte 16.
        let long_input = format!("{}{}", "x".repeat(15), "€".repeat(5));
        let (out, _) = generate(&handle, &backend, &long_input, 56, &default_params())
            .await
            .unwrap();
        // Byte 16 falls inside the multi-byte '€'; truncation must back off
        // to byte 15 rather than panicking on the split boundary.
        assert_eq!(out, format!("out:{}", "x".repeat(15)));
    }

    #[tokio::test]
    async fn reports_backend_token_count() {
        let handle = Handle::base(ModelRef(Arc::from("base")));
        let backend = EchoBackend;
        let (_, tokens) = generate(&handle, &backend, "hello world", 56, &default_params())
            .await
            .unwrap();
        assert_eq!(tokens, "hello world".len());
    }
}
