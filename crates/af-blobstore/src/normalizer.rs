use af_domain::error::{Error, Result};
use af_domain::model::Descriptor;
use serde_json::{Map, Value};
use std::path::Path;

/// Candidate metadata file names, tried in order; the first one present
/// is normalized in place.
const CANDIDATE_NAMES: &[&str] = &["adapter_config.json", "config.json"];

const RECOGNIZED_KEYS: &[&str] = &["rank", "r", "alpha", "lora_alpha", "dropout", "lora_dropout", "target_modules"];

/// Reads the first candidate metadata file in `bundle_dir`, extracts a
/// recognizable low-rank-adaptation config (possibly nested under a
/// `*_config` key), and overwrites the file with the canonical JSON
/// representation of a [`Descriptor`].
///
/// Idempotent: running it twice in a row produces the same file.
/// A no-op (returns `Ok(None)`) when no candidate file exists.
pub fn normalize(bundle_dir: &Path) -> Result<Option<Descriptor>> {
    for name in CANDIDATE_NAMES {
        let path = bundle_dir.join(name);
        if !path.is_file() {
            continue;
        }
        let raw = std::fs::read_to_string(&path)?;
        let value: Value = serde_json::from_str(&raw)
            .map_err(|e| Error::BadMetadata(format!("{name}: {e}")))?;
        // A file with no recognizable LoRA block (e.g. one holding only
        // `base_model_name_or_path`) is still a valid bundle — it just
        // yields a defaults-only descriptor rather than failing.
        let empty = Map::new();
        let block = find_lora_block(&value).unwrap_or(&empty);
        let descriptor = build_descriptor(&value, block);
        let canonical = serde_json::to_string_pretty(&descriptor)?;
        std::fs::write(&path, canonical)?;
        return Ok(Some(descriptor));
    }
    Ok(None)
}

/// Finds a LoRA-shaped object: either the top-level object itself, or
/// the first nested object reachable under a key ending in `_config`.
fn find_lora_block(value: &Value) -> Option<&Map<String, Value>> {
    let obj = value.as_object()?;
    if looks_like_lora(obj) {
        return Some(obj);
    }
    for (key, nested) in obj {
        if key.ends_with("_config") {
            if let Some(nested_obj) = nested.as_object() {
                if looks_like_lora(nested_obj) {
                    return Some(nested_obj);
                }
            }
        }
    }
    None
}

fn looks_like_lora(obj: &Map<String, Value>) -> bool {
    RECOGNIZED_KEYS.iter().any(|k| obj.contains_key(*k))
}

/// Builds a canonical [`Descriptor`] by lifting recognized keys first
/// from the nested LoRA-like `block`, then from the top-level `raw`
/// object — mirroring the original's two-pass lift, where a valid key
/// sitting directly on the top level is honored even when it isn't part
/// of a recognizable nested block (e.g. a file that only sets `bias`).
fn build_descriptor(raw: &Value, block: &Map<String, Value>) -> Descriptor {
    let mut d = Descriptor::default();
    lift(&mut d, block);
    if let Some(top) = raw.as_object() {
        lift(&mut d, top);
    }
    d.inference_mode = true;
    d.peft_type = "LORA".into();
    d
}

fn lift(d: &mut Descriptor, block: &Map<String, Value>) {
    if let Some(r) = block.get("rank").or_else(|| block.get("r")).and_then(Value::as_u64) {
        d.r = r as u32;
    }
    if let Some(alpha) = block
        .get("alpha")
        .or_else(|| block.get("lora_alpha"))
        .and_then(Value::as_u64)
    {
        d.lora_alpha = alpha as u32;
    }
    if let Some(dropout) = block
        .get("dropout")
        .or_else(|| block.get("lora_dropout"))
        .and_then(Value::as_f64)
    {
        d.lora_dropout = dropout as f32;
    }
    if let Some(targets) = block.get("target_modules").and_then(Value::as_array) {
        d.target_modules = targets
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
    }
    if let Some(bias) = block.get("bias").and_then(Value::as_str) {
        d.bias = bias.to_string();
    }
    if let Some(task_type) = block.get("task_type").and_then(Value::as_str) {
        d.task_type = task_type.to_string();
    }
    if let Some(modules) = block.get("modules_to_save").and_then(Value::as_array) {
        d.modules_to_save = modules
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
    }
    if let Some(init) = block.get("init_lora_weights").and_then(Value::as_bool) {
        d.init_lora_weights = init;
    }
    if let Some(fan) = block.get("fan_in_fan_out").and_then(Value::as_bool) {
        d.fan_in_fan_out = fan;
    }
    if let Some(rslora) = block.get("use_rslora").and_then(Value::as_bool) {
        d.use_rslora = rslora;
    }
    if let Some(pattern) = block.get("alpha_pattern").and_then(Value::as_object) {
        d.alpha_pattern = pattern
            .iter()
            .filter_map(|(k, v)| v.as_u64().map(|n| (k.clone(), n as u32)))
            .collect();
    }
    if let Some(base) = block
        .get("base_model_name_or_path")
        .and_then(Value::as_str)
    {
        d.base_model_name_or_path = Some(base.to_string());
    }
}
