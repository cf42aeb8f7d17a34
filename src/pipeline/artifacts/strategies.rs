//! Ordered discovery of a model's label mapping.
//!
//! Each strategy is a pure function of the model directory. Newer artifact
//! formats are listed first; the first strategy that yields a usable mapping
//! wins and the rest are never consulted.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use super::mapping::{CombinedMap, LabelIndex, LabelMapping};
use super::ArtifactError;

pub const LABEL_MAP_FILE: &str = "label_map.json";
pub const MODEL_CONFIG_FILE: &str = "config.json";
pub const TASK_TYPE_FILE: &str = "task_type.json";
pub const MULTITASK_MAPS_FILE: &str = "multitask_maps.json";
pub const LEGACY_COMBINED_MAP_FILE: &str = "combined_map.json";

/// Marker value in `task_type.json` for a joint category × priority model.
pub const COMBINED_TASK_TYPE: &str = "combined_label_priority";

/// A resolver step with a name for logs and error messages.
#[derive(Clone, Copy)]
pub struct NamedStrategy {
    pub name: &'static str,
    pub resolve: fn(&Path) -> Option<LabelMapping>,
}

impl std::fmt::Debug for NamedStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedStrategy").field("name", &self.name).finish()
    }
}

/// Category model: every historical format, newest first.
pub const CATEGORY_STRATEGIES: &[NamedStrategy] = &[
    NamedStrategy { name: "label_map", resolve: simple_label_map },
    NamedStrategy { name: "model_config", resolve: model_config },
    NamedStrategy { name: "multitask_maps", resolve: multitask_maps },
    NamedStrategy { name: "legacy_combined_map", resolve: legacy_combined_map },
];

/// Priority model: only simple mappings were ever shipped.
pub const PRIORITY_STRATEGIES: &[NamedStrategy] = &[
    NamedStrategy { name: "label_map", resolve: simple_label_map },
    NamedStrategy { name: "model_config", resolve: model_config },
];

/// Runs a fixed chain of strategies against a model directory.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactResolver {
    strategies: &'static [NamedStrategy],
}

impl ArtifactResolver {
    pub fn new(strategies: &'static [NamedStrategy]) -> Self {
        Self { strategies }
    }

    pub fn category() -> Self {
        Self::new(CATEGORY_STRATEGIES)
    }

    pub fn priority() -> Self {
        Self::new(PRIORITY_STRATEGIES)
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name).collect()
    }

    /// Resolve the label mapping of `dir`, or fail with a configuration error.
    pub fn resolve(&self, dir: &Path) -> Result<LabelMapping, ArtifactError> {
        if !dir.is_dir() {
            return Err(ArtifactError::DirectoryNotFound(dir.to_path_buf()));
        }

        for strategy in self.strategies {
            if let Some(mapping) = (strategy.resolve)(dir) {
                tracing::info!(
                    strategy = strategy.name,
                    shape = mapping.shape_name(),
                    classes = mapping.num_classes(),
                    dir = %dir.display(),
                    "Label mapping resolved"
                );
                return Ok(mapping);
            }
            tracing::debug!(strategy = strategy.name, dir = %dir.display(), "Strategy did not apply");
        }

        Err(ArtifactError::NoMapping {
            dir: dir.to_path_buf(),
            tried: self.strategy_names().join(", "),
        })
    }
}

// ═══════════════════════════════════════════════════════════
// Strategies
// ═══════════════════════════════════════════════════════════

/// `label_map.json` with `id2label`/`label2id` (or `id2prio`/`prio2id`).
pub fn simple_label_map(dir: &Path) -> Option<LabelMapping> {
    let json = read_json(&dir.join(LABEL_MAP_FILE))?;
    let id2label = first_key(&json, &["id2label", "id2prio"]).and_then(parse_id2label)?;
    let label2id = first_key(&json, &["label2id", "prio2id"]).and_then(parse_label2id)?;
    LabelIndex::from_parts(id2label, label2id)
        .inspect_err(|e| tracing::warn!(error = %e, file = LABEL_MAP_FILE, "Ignoring label map"))
        .ok()
        .map(LabelMapping::Simple)
}

/// `id2label` embedded in the exported model's `config.json`.
pub fn model_config(dir: &Path) -> Option<LabelMapping> {
    let json = read_json(&dir.join(MODEL_CONFIG_FILE))?;
    let id2label = json.get("id2label").and_then(parse_id2label)?;
    let index = match json.get("label2id").and_then(parse_label2id) {
        Some(label2id) => LabelIndex::from_parts(id2label, label2id),
        None => LabelIndex::from_id2label(id2label),
    }
    .inspect_err(|e| tracing::warn!(error = %e, file = MODEL_CONFIG_FILE, "Ignoring config mapping"))
    .ok()?;

    if index.is_all_placeholder() {
        return None;
    }
    if index.is_all_composite() {
        return Some(LabelMapping::Combined(CombinedMap::new(index)));
    }
    Some(LabelMapping::Simple(index))
}

/// `task_type.json` marker plus `multitask_maps.json`.
pub fn multitask_maps(dir: &Path) -> Option<LabelMapping> {
    let task = read_json(&dir.join(TASK_TYPE_FILE))?;
    if task.get("type").and_then(Value::as_str) != Some(COMBINED_TASK_TYPE) {
        return None;
    }
    let json = read_json(&dir.join(MULTITASK_MAPS_FILE))?;
    combined_from_json(&json, MULTITASK_MAPS_FILE)
}

/// Pre-marker deployments: a bare `combined_map.json`.
pub fn legacy_combined_map(dir: &Path) -> Option<LabelMapping> {
    let json = read_json(&dir.join(LEGACY_COMBINED_MAP_FILE))?;
    combined_from_json(&json, LEGACY_COMBINED_MAP_FILE)
}

/// Both historical key spellings are accepted: `id2comb`/`comb2id` and
/// `id2combo`/`combo2id`. Every label must be `category|priority`, and must
/// appear in the `LABELS`/`PRIORITIES` lists when those are present.
fn combined_from_json(json: &Value, file: &str) -> Option<LabelMapping> {
    let id2comb = first_key(json, &["id2comb", "id2combo"]).and_then(parse_id2label)?;
    let comb2id = first_key(json, &["comb2id", "combo2id"]).and_then(parse_label2id)?;
    let index = LabelIndex::from_parts(id2comb, comb2id)
        .inspect_err(|e| tracing::warn!(error = %e, file, "Ignoring combined map"))
        .ok()?;

    if !index.is_all_composite() {
        tracing::warn!(file, "Ignoring combined map: labels are not category|priority");
        return None;
    }

    let map = CombinedMap::new(index);
    let categories = json.get("LABELS").and_then(parse_string_list);
    let priorities = json.get("PRIORITIES").and_then(parse_string_list);
    map.check_declared(categories.as_deref(), priorities.as_deref())
        .inspect_err(|e| tracing::warn!(error = %e, file, "Ignoring combined map"))
        .ok()?;

    Some(LabelMapping::Combined(map))
}

// ═══════════════════════════════════════════════════════════
// JSON helpers
// ═══════════════════════════════════════════════════════════

/// Missing or unparseable files both mean "this strategy does not apply".
fn read_json(path: &Path) -> Option<Value> {
    let raw = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw)
        .inspect_err(|e| tracing::warn!(error = %e, file = %path.display(), "Unparseable artifact"))
        .ok()
}

fn first_key<'a>(json: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| json.get(*k).filter(|v| !v.is_null()))
}

/// `{"0": "điện", "1": "nước"}`; keys are stringified indices.
fn parse_id2label(value: &Value) -> Option<BTreeMap<usize, String>> {
    value
        .as_object()?
        .iter()
        .map(|(k, v)| Some((k.trim().parse::<usize>().ok()?, v.as_str()?.to_string())))
        .collect()
}

/// `{"điện": 0}`; indices may also arrive as strings.
fn parse_label2id(value: &Value) -> Option<BTreeMap<String, usize>> {
    value
        .as_object()?
        .iter()
        .map(|(k, v)| {
            let id = match v {
                Value::Number(n) => usize::try_from(n.as_u64()?).ok()?,
                Value::String(s) => s.trim().parse().ok()?,
                _ => return None,
            };
            Some((k.clone(), id))
        })
        .collect()
}

fn parse_string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}
