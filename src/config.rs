use std::path::PathBuf;

use serde::Deserialize;

use crate::pipeline::policy::PolicyConfig;

/// Application-level constants
pub const APP_NAME: &str = "KssvTriage";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Token budget per classifier call. Longer reports are truncated by the tokenizer.
pub const DEFAULT_MAX_SEQ_LEN: usize = 256;

/// Directory names of the two fine-tuned models under `models_dir()`.
pub const LABEL_MODEL_NAME: &str = "phobert_kssv";
pub const PRIORITY_MODEL_NAME: &str = "phobert_priority";

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "kssv_triage=info"
}

/// Get the application data directory
/// ~/KssvTriage/ on all platforms, or the working directory if there is no home.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Get the models directory (category + priority models live here)
pub fn models_dir() -> PathBuf {
    app_data_dir().join("models")
}

pub fn label_model_dir() -> PathBuf {
    models_dir().join(LABEL_MODEL_NAME)
}

pub fn priority_model_dir() -> PathBuf {
    models_dir().join(PRIORITY_MODEL_NAME)
}

pub fn default_audit_log_path() -> PathBuf {
    app_data_dir().join("logs").join("predictions.jsonl")
}

/// Settings for the reply-generation collaborator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReplyConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "gemma3:4b".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Everything the triage pipeline needs to start.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub label_model_dir: PathBuf,
    pub priority_model_dir: PathBuf,
    pub max_seq_len: usize,
    /// `None` disables the JSONL audit log.
    pub audit_log_path: Option<PathBuf>,
    pub reply: ReplyConfig,
    pub policy: PolicyConfig,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            label_model_dir: label_model_dir(),
            priority_model_dir: priority_model_dir(),
            max_seq_len: DEFAULT_MAX_SEQ_LEN,
            audit_log_path: Some(default_audit_log_path()),
            reply: ReplyConfig::default(),
            policy: PolicyConfig::default(),
        }
    }
}

impl TriageConfig {
    /// Defaults overridden by `KSSV_*` / `OLLAMA_URL` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup` (testable without
    /// touching the process environment).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("KSSV_MODELS_DIR") {
            let root = PathBuf::from(dir);
            config.label_model_dir = root.join(LABEL_MODEL_NAME);
            config.priority_model_dir = root.join(PRIORITY_MODEL_NAME);
        }
        if let Some(dir) = lookup("KSSV_LABEL_MODEL_DIR") {
            config.label_model_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("KSSV_PRIORITY_MODEL_DIR") {
            config.priority_model_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("KSSV_AUDIT_LOG") {
            config.audit_log_path = match path.trim() {
                "" | "off" | "none" => None,
                p => Some(PathBuf::from(p)),
            };
        }
        if let Some(raw) = lookup("KSSV_MAX_SEQ_LEN") {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.max_seq_len = n,
                _ => tracing::warn!(value = %raw, "Ignoring invalid KSSV_MAX_SEQ_LEN"),
            }
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            config.reply.base_url = url;
        }
        if let Some(model) = lookup("KSSV_REPLY_MODEL") {
            config.reply.model = model;
        }
        if let Some(raw) = lookup("KSSV_REPLY_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(n) => config.reply.timeout_secs = n,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid KSSV_REPLY_TIMEOUT_SECS"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn models_dir_under_app_data() {
        let models = models_dir();
        assert!(models.starts_with(app_data_dir()));
        assert!(models.ends_with("models"));
    }

    #[test]
    fn model_dirs_use_expected_names() {
        assert!(label_model_dir().ends_with(LABEL_MODEL_NAME));
        assert!(priority_model_dir().ends_with(PRIORITY_MODEL_NAME));
    }

    #[test]
    fn defaults_without_env() {
        let config = TriageConfig::from_lookup(|_| None);
        assert_eq!(config.max_seq_len, DEFAULT_MAX_SEQ_LEN);
        assert_eq!(config.label_model_dir, label_model_dir());
        assert!(config.audit_log_path.is_some());
    }

    #[test]
    fn models_dir_override_moves_both_models() {
        let config = TriageConfig::from_lookup(lookup_from(&[("KSSV_MODELS_DIR", "/srv/ai")]));
        assert_eq!(config.label_model_dir, PathBuf::from("/srv/ai/phobert_kssv"));
        assert_eq!(config.priority_model_dir, PathBuf::from("/srv/ai/phobert_priority"));
    }

    #[test]
    fn specific_dir_wins_over_models_dir() {
        let config = TriageConfig::from_lookup(lookup_from(&[
            ("KSSV_MODELS_DIR", "/srv/ai"),
            ("KSSV_PRIORITY_MODEL_DIR", "/opt/prio"),
        ]));
        assert_eq!(config.priority_model_dir, PathBuf::from("/opt/prio"));
        assert_eq!(config.label_model_dir, PathBuf::from("/srv/ai/phobert_kssv"));
    }

    #[test]
    fn audit_log_can_be_disabled() {
        let config = TriageConfig::from_lookup(lookup_from(&[("KSSV_AUDIT_LOG", "off")]));
        assert!(config.audit_log_path.is_none());
    }

    #[test]
    fn invalid_numbers_are_ignored() {
        let config = TriageConfig::from_lookup(lookup_from(&[
            ("KSSV_MAX_SEQ_LEN", "lots"),
            ("KSSV_REPLY_TIMEOUT_SECS", "-3"),
        ]));
        assert_eq!(config.max_seq_len, DEFAULT_MAX_SEQ_LEN);
        assert_eq!(config.reply.timeout_secs, ReplyConfig::default().timeout_secs);
    }

    #[test]
    fn policy_overrides_deserialize_from_json() {
        let config: TriageConfig =
            serde_json::from_str(r#"{"policy": {"urgent_min": 0.7}}"#).unwrap();
        assert!((config.policy.urgent_min - 0.7).abs() < 1e-6);
        assert!((config.policy.high_min - 0.35).abs() < 1e-6);
    }
}
