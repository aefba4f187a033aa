use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::heuristics::score_profile;
use crate::llm::{
    LanguageModel, SYSTEM_PROMPT, build_batch_prompt, build_record_prompt, extract_json,
    profile_tool, validate_batch_response,
};
use crate::models::{CompanyProfile, FirmRecord, Outcome, SearchFields};

/// How the model stage calls the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LlmMode {
    /// One free-text call per chunk, answered with a JSON array
    #[default]
    Batch,
    /// One structured call per record
    PerRecord,
}

/// Configuration for the model enrichment stage
#[derive(Debug, Clone)]
pub struct LlmStageConfig {
    /// Records per model call in batch mode
    pub batch_size: usize,
    pub mode: LlmMode,
}

impl Default for LlmStageConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            mode: LlmMode::Batch,
        }
    }
}

/// Result of the model enrichment stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmStageReport {
    pub chunks_enriched: usize,
    pub chunks_degraded: usize,
    pub records_scored: usize,
    pub model_available: bool,
}

/// Fill the target fields for one firm.
///
/// Without a model, or when the call fails, the search fields are copied over
/// and every model-only field stays null.
pub async fn enrich_record(
    model: Option<&dyn LanguageModel>,
    base: &FirmRecord,
    search: &SearchFields,
) -> Outcome<CompanyProfile> {
    let Some(model) = model else {
        return Outcome::degraded(CompanyProfile::from_search(search), "no language model configured");
    };

    let prompt = build_record_prompt(base, search);
    match model
        .complete_structured(SYSTEM_PROMPT, &prompt, &profile_tool())
        .await
    {
        Ok(value) => Outcome::Enriched(CompanyProfile::from_model_value(&value, &base.firm)),
        Err(e) => {
            warn!("Model call failed for {}: {:#}", base.firm, e);
            Outcome::degraded(CompanyProfile::from_search(search), format!("model call failed: {e}"))
        }
    }
}

/// Execute the model enrichment stage over all records, in place.
///
/// Every record is scored at the end, whether or not its chunk was enriched.
pub async fn execute_llm_stage(
    model: Option<&dyn LanguageModel>,
    records: &mut [FirmRecord],
    config: &LlmStageConfig,
) -> LlmStageReport {
    let mut report = LlmStageReport {
        model_available: model.is_some(),
        ..Default::default()
    };

    match model {
        None => info!("Model: no backend configured; attaching scores only"),
        Some(model) => match config.mode {
            LlmMode::Batch => enrich_batches(model, records, config, &mut report).await,
            LlmMode::PerRecord => enrich_each(model, records, &mut report).await,
        },
    }

    report.records_scored = score_records(records);
    info!(
        "Model: {} chunks enriched, {} degraded, {} records scored",
        report.chunks_enriched, report.chunks_degraded, report.records_scored
    );
    report
}

/// Attach fresh scores to every record; returns how many were scored
pub fn score_records(records: &mut [FirmRecord]) -> usize {
    for record in records.iter_mut() {
        let scores = score_profile(&record.profile);
        record.apply_scores(&scores);
    }
    records.len()
}

async fn enrich_batches(
    model: &dyn LanguageModel,
    records: &mut [FirmRecord],
    config: &LlmStageConfig,
    report: &mut LlmStageReport,
) {
    let batch_size = config.batch_size.max(1);
    let total = records.len();

    for (chunk_index, chunk) in records.chunks_mut(batch_size).enumerate() {
        let start = chunk_index * batch_size;
        info!(
            "Model: processing chunk {}-{}/{}",
            start + 1,
            start + chunk.len(),
            total
        );

        match request_chunk(model, chunk).await {
            Ok(profiles) => {
                for (record, profile) in chunk.iter_mut().zip(profiles) {
                    record.profile.merge_filled(profile);
                }
                report.chunks_enriched += 1;
            }
            Err(e) => {
                // The whole chunk keeps its current values
                warn!(
                    "Model: chunk {}-{} left unchanged: {:#}",
                    start + 1,
                    start + chunk.len(),
                    e
                );
                report.chunks_degraded += 1;
            }
        }
    }
}

async fn request_chunk(model: &dyn LanguageModel, chunk: &[FirmRecord]) -> Result<Vec<CompanyProfile>> {
    let prompt = build_batch_prompt(chunk);
    let text = model.complete(SYSTEM_PROMPT, &prompt).await?;
    let items = validate_batch_response(extract_json(&text)?, chunk)?;

    Ok(chunk
        .iter()
        .zip(items.iter())
        .map(|(record, item)| CompanyProfile::from_model_value(item, &record.firm))
        .collect())
}

async fn enrich_each(model: &dyn LanguageModel, records: &mut [FirmRecord], report: &mut LlmStageReport) {
    for record in records.iter_mut() {
        let search = record.search_fields();
        match enrich_record(Some(model), record, &search).await {
            Outcome::Enriched(profile) => {
                record.profile = profile;
                report.chunks_enriched += 1;
            }
            Outcome::Degraded { value, reason } => {
                debug!("Model degraded for {}: {}", record.firm, reason);
                record.profile = value;
                report.chunks_degraded += 1;
            }
        }
    }
}
