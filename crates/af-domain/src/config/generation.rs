use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Decoding / generation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dtype {
    Float16,
    Bfloat16,
    Float32,
}

impl Default for Dtype {
    fn default() -> Self {
        Dtype::Bfloat16
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "d_num_beams")]
    pub num_beams: u32,
    #[serde(default = "d_no_repeat_ngram")]
    pub no_repeat_ngram: u32,
    #[serde(default = "d_length_penalty")]
    pub length_penalty: f32,
    #[serde(default = "d_early_stopping")]
    pub early_stopping: bool,
    #[serde(default)]
    pub device_map: Option<String>,
    #[serde(default)]
    pub dtype: Dtype,
    /// Per-task output token caps, keyed by task name.
    #[serde(default = "d_task_caps")]
    pub task_caps: TaskCaps,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCaps {
    pub summarize_short: u32,
    pub summarize_long: u32,
    pub categorize: u32,
    pub suggest: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            num_beams: d_num_beams(),
            no_repeat_ngram: d_no_repeat_ngram(),
            length_penalty: d_length_penalty(),
            early_stopping: d_early_stopping(),
            device_map: None,
            dtype: Dtype::default(),
            task_caps: d_task_caps(),
        }
    }
}

fn d_num_beams() -> u32 {
    4
}
fn d_no_repeat_ngram() -> u32 {
    3
}
fn d_length_penalty() -> f32 {
    1.0
}
fn d_early_stopping() -> bool {
    true
}
fn d_task_caps() -> TaskCaps {
    TaskCaps {
        summarize_short: 56,
        summarize_long: 128,
        categorize: 64,
        suggest: 96,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = GenerationConfig::default();
        assert_eq!(cfg.num_beams, 4);
        assert_eq!(cfg.no_repeat_ngram, 3);
        assert_eq!(cfg.task_caps.summarize_long, 128);
        assert_eq!(cfg.task_caps.categorize, 64);
        assert_eq!(cfg.task_caps.suggest, 96);
    }
}
