//! Pipeline orchestrator: raw report text → `EnrichedResult`.
//!
//! normalize → extract metadata → category model → (combined decode) →
//! priority model → policy overrides → audit.

use std::sync::Arc;

use super::artifacts::{ArtifactResolver, LabelMapping};
use super::audit::{AuditSink, JsonlAuditLog, TracingAuditSink};
use super::classifier::{LazyModel, LoadedModel, ModelLoader, OnnxModelLoader, Prediction};
use super::ner;
use super::normalize::normalize;
use super::policy::{self, choose_priority, Decision};
use super::types::{
    EnrichedResult, ExtractedMeta, PolicyOverride, Priority, PrioritySource, ProbabilityMap,
};
use super::TriageError;
use crate::config::TriageConfig;

/// Category side of a classification, before policy.
struct CategoryOutcome {
    category: Option<String>,
    confidence: f32,
    probs: ProbabilityMap,
    combined_probs: Option<ProbabilityMap>,
    /// Priority decoded from a combined class, with its confidence.
    combined_priority: Option<(Priority, f32)>,
}

/// Priority side of a classification, before keyword escalation.
struct PriorityOutcome {
    priority: Priority,
    confidence: f32,
    probs: Option<ProbabilityMap>,
    source: PrioritySource,
    overrides: Vec<PolicyOverride>,
}

impl PriorityOutcome {
    fn default_priority() -> Self {
        Self {
            priority: Priority::DEFAULT,
            confidence: 0.0,
            probs: None,
            source: PrioritySource::Default,
            overrides: Vec::new(),
        }
    }
}

pub struct TriagePipeline {
    config: TriageConfig,
    category_model: LazyModel<LoadedModel>,
    /// `None` once loaded means the priority model directory is absent.
    priority_model: LazyModel<Option<LoadedModel>>,
    audit: Box<dyn AuditSink>,
}

impl TriagePipeline {
    /// Models are not touched until the first `classify` call.
    pub fn new(config: TriageConfig, loader: Arc<dyn ModelLoader>) -> Self {
        let category_model = {
            let loader = Arc::clone(&loader);
            let dir = config.label_model_dir.clone();
            let max_seq_len = config.max_seq_len;
            LazyModel::new("category", move || {
                LoadedModel::load(loader.as_ref(), &ArtifactResolver::category(), &dir, max_seq_len)
            })
        };

        let priority_model = {
            let dir = config.priority_model_dir.clone();
            let max_seq_len = config.max_seq_len;
            LazyModel::new("priority", move || {
                if !dir.is_dir() {
                    tracing::info!(dir = %dir.display(), "Priority model directory absent, using default priority");
                    return Ok(None);
                }
                let model =
                    LoadedModel::load(loader.as_ref(), &ArtifactResolver::priority(), &dir, max_seq_len)?;
                model.mapping().ensure_priority_labels()?;
                Ok(Some(model))
            })
        };

        let audit: Box<dyn AuditSink> = match &config.audit_log_path {
            Some(path) => Box::new(JsonlAuditLog::new(path.clone())),
            None => Box::new(TracingAuditSink),
        };

        Self {
            config,
            category_model,
            priority_model,
            audit,
        }
    }

    /// Production pipeline backed by the ONNX loader.
    pub fn from_config(config: TriageConfig) -> Self {
        Self::new(config, Arc::new(OnnxModelLoader))
    }

    pub fn with_audit_sink(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Classify one report. Only category model configuration problems and
    /// category inference failures are errors; everything optional degrades.
    pub fn classify(&self, text: &str) -> Result<EnrichedResult, TriageError> {
        let normalized = normalize(text);
        let meta = ner::extract(&normalized);

        let category_model = self.category_model.get().map_err(TriageError::Configuration)?;

        let prediction = category_model
            .predict(&normalized)
            .map_err(TriageError::Inference)?;
        let category = category_outcome(category_model.mapping(), &prediction)?;

        let priority = match category.combined_priority {
            Some((priority, confidence)) => PriorityOutcome {
                priority,
                confidence,
                probs: None,
                source: PrioritySource::CombinedModel,
                overrides: Vec::new(),
            },
            None => self.dedicated_priority(&normalized),
        };

        let decision = Decision {
            category: category.category,
            category_confidence: category.confidence,
            priority: priority.priority,
            priority_confidence: priority.confidence,
            priority_probs: priority.probs,
            overrides: priority.overrides,
        };
        let decision = policy::apply_overrides(decision, &normalized, &self.config.policy);

        let result = assemble(decision, category.probs, category.combined_probs, priority.source, meta);
        self.emit_audit(text, &normalized, &result);
        Ok(result)
    }

    /// Like [`classify`](Self::classify), but a missing or broken category
    /// model yields a keyword-heuristic result instead of an error.
    pub fn classify_with_fallback(&self, text: &str) -> EnrichedResult {
        match self.classify(text) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "Model classification unavailable, using heuristics");
                self.classify_heuristic(text, e.to_string())
            }
        }
    }

    fn classify_heuristic(&self, text: &str, reason: String) -> EnrichedResult {
        let normalized = normalize(text);
        let meta = ner::extract(&normalized);

        let category = policy::heuristic_category(&normalized);
        let priority = policy::backup_priority(text, category);

        let decision = Decision {
            category: category.map(str::to_string),
            category_confidence: if category.is_some() {
                policy::thresholds::HEURISTIC_CATEGORY_CONFIDENCE
            } else {
                0.0
            },
            priority,
            priority_confidence: 0.0,
            priority_probs: None,
            overrides: vec![PolicyOverride::HeuristicFallback { reason }],
        };
        let decision = policy::apply_overrides(decision, &normalized, &self.config.policy);

        let result = assemble(decision, ProbabilityMap::new(), None, PrioritySource::Heuristic, meta);
        self.emit_audit(text, &normalized, &result);
        result
    }

    /// Priority from the dedicated model, loaded on first need. A model that
    /// is absent or fails to load yields the default priority; the load error
    /// stays cached, so it is not retried.
    fn dedicated_priority(&self, normalized: &str) -> PriorityOutcome {
        match self.priority_model.get() {
            Ok(model) => match &*model {
                Some(model) => self.run_priority_model(model, normalized),
                None => PriorityOutcome::default_priority(),
            },
            Err(e) => {
                tracing::warn!(
                    model = self.priority_model.name(),
                    error = %e,
                    "Model unavailable, using default priority"
                );
                PriorityOutcome::default_priority()
            }
        }
    }

    /// Threshold policy over the dedicated priority model. Inference failure
    /// degrades to the default priority.
    fn run_priority_model(&self, model: &LoadedModel, normalized: &str) -> PriorityOutcome {
        let LabelMapping::Simple(index) = model.mapping() else {
            return PriorityOutcome::default_priority();
        };

        let prediction = match model.predict(normalized) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "Priority inference failed, using default priority");
                return PriorityOutcome::default_priority();
            }
        };

        let probs = index.probabilities(&prediction.probabilities);
        let choice = choose_priority(&probs, &self.config.policy);
        let overrides = if choice.ambiguous {
            vec![PolicyOverride::AmbiguousPriorityDefault {
                p_high: probs.get(Priority::High.as_str()),
            }]
        } else {
            Vec::new()
        };

        PriorityOutcome {
            priority: choice.priority,
            confidence: choice.confidence,
            probs: Some(choice.probabilities),
            source: PrioritySource::PriorityModel,
            overrides,
        }
    }

    fn emit_audit(&self, raw: &str, normalized: &str, result: &EnrichedResult) {
        if let Err(e) = self.audit.record(raw, normalized, result) {
            tracing::debug!(error = %e, "Audit record dropped");
        }
    }
}

/// Map the category model's prediction through its label mapping.
fn category_outcome(
    mapping: &LabelMapping,
    prediction: &Prediction,
) -> Result<CategoryOutcome, TriageError> {
    match mapping {
        LabelMapping::Simple(index) => {
            let label = index
                .label(prediction.class_index)
                .map_err(|e| TriageError::Inference(e.into()))?;
            Ok(CategoryOutcome {
                category: Some(label.to_string()),
                confidence: prediction.confidence,
                probs: index.probabilities(&prediction.probabilities),
                combined_probs: None,
                combined_priority: None,
            })
        }
        LabelMapping::Combined(map) => {
            let probs = map.aggregate_categories(&prediction.probabilities);
            let combined_probs = Some(map.combined_probabilities(&prediction.probabilities));

            match map.decode(prediction.class_index) {
                Ok((category, priority)) => {
                    let combined_priority = priority.map(|p| {
                        let confidence = map
                            .priority_confidence(&prediction.probabilities, &category)
                            .unwrap_or(prediction.confidence);
                        (p, confidence)
                    });
                    Ok(CategoryOutcome {
                        category: Some(category),
                        confidence: prediction.confidence,
                        probs,
                        combined_probs,
                        combined_priority,
                    })
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Combined label decode failed, using aggregated categories");
                    let (category, confidence) = probs
                        .argmax()
                        .map(|(label, p)| (Some(label.to_string()), p))
                        .unwrap_or((None, 0.0));
                    Ok(CategoryOutcome {
                        category,
                        confidence,
                        probs,
                        combined_probs,
                        combined_priority: None,
                    })
                }
            }
        }
    }
}

fn assemble(
    decision: Decision,
    category_probs: ProbabilityMap,
    combined_probs: Option<ProbabilityMap>,
    priority_source: PrioritySource,
    meta: ExtractedMeta,
) -> EnrichedResult {
    EnrichedResult {
        category: decision.category,
        category_confidence: decision.category_confidence,
        category_probs,
        combined_probs,
        priority: decision.priority,
        priority_confidence: decision.priority_confidence,
        priority_probs: decision.priority_probs,
        priority_source,
        overrides: decision.overrides,
        meta,
    }
}
