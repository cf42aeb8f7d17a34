use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use kssv_triage::config::{self, TriageConfig};
use kssv_triage::pipeline::audit::NoopAuditSink;
use kssv_triage::pipeline::reply::{reply_or_fallback, OllamaReplyGenerator, ReplyGenerator};
use kssv_triage::{EnrichedResult, TriagePipeline};

#[derive(Parser)]
#[command(name = "kssv-triage")]
#[command(about = "Classify a dormitory incident report and extract its metadata", long_about = None)]
#[command(version = config::APP_VERSION)]
struct Cli {
    /// Report text (Vietnamese)
    text: String,

    /// Directory holding phobert_kssv/ and phobert_priority/
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Also generate an acknowledgement reply
    #[arg(long)]
    reply: bool,

    /// Do not append to the prediction log
    #[arg(long)]
    no_audit: bool,
}

#[derive(Serialize)]
struct Output<'a> {
    #[serde(flatten)]
    result: &'a EnrichedResult,
    category_display: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<String>,
}

fn main() -> ExitCode {
    kssv_triage::init_tracing();
    let cli = Cli::parse();

    let mut triage_config = TriageConfig::from_env();
    if let Some(dir) = &cli.models_dir {
        triage_config.label_model_dir = dir.join(config::LABEL_MODEL_NAME);
        triage_config.priority_model_dir = dir.join(config::PRIORITY_MODEL_NAME);
    }
    let reply_config = triage_config.reply.clone();

    let mut pipeline = TriagePipeline::from_config(triage_config);
    if cli.no_audit {
        pipeline = pipeline.with_audit_sink(Box::new(NoopAuditSink));
    }

    let result = pipeline.classify_with_fallback(&cli.text);

    let reply = cli.reply.then(|| {
        let generator = OllamaReplyGenerator::new(&reply_config)
            .inspect_err(|e| tracing::warn!(error = %e, "Reply generator unavailable"))
            .ok();
        reply_or_fallback(
            generator.as_ref().map(|g| g as &dyn ReplyGenerator),
            &cli.text,
            result.category.as_deref(),
            result.priority,
        )
    });

    let output = Output {
        result: &result,
        category_display: result.category_display_name(),
        reply,
    };

    match serde_json::to_string_pretty(&output) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize result");
            ExitCode::FAILURE
        }
    }
}
