use std::collections::{HashMap, HashSet};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::llm::{
    LanguageModel, ResponseError, SCORING_SYSTEM_PROMPT, build_scoring_prompt, echoed_sequence,
    extract_json, record_array,
};
use crate::models::FirmRecord;

/// Configuration for model-judged lead scoring
#[derive(Debug, Clone)]
pub struct LlmScoreConfig {
    /// Records per model call
    pub batch_size: usize,
    /// 1-based position of the first record to score
    pub start: usize,
    /// How many records to consider from `start`; `None` means all
    pub count: Option<usize>,
}

impl Default for LlmScoreConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            start: 1,
            count: None,
        }
    }
}

/// Result of a model scoring run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmScoreReport {
    pub batches_scored: usize,
    pub batches_failed: usize,
    pub records_scored: usize,
    /// Records already present in the output and left alone
    pub records_skipped: usize,
}

/// One model verdict, keyed by record sequence
#[derive(Debug, Clone, PartialEq)]
pub struct ModelScore {
    pub sequence: usize,
    pub lead_score: u8,
    pub completeness_score: f64,
    pub relevance_score: f64,
}

impl ModelScore {
    fn from_value(item: &Value) -> Option<Self> {
        let number = |key: &str| match item.get(key) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        Some(Self {
            sequence: echoed_sequence(item)?,
            lead_score: number("lead_score").unwrap_or(0.0).clamp(0.0, 100.0).round() as u8,
            completeness_score: unit_score(number("completeness_score").unwrap_or(0.0)),
            relevance_score: unit_score(number("relevance_score").unwrap_or(0.0)),
        })
    }
}

/// Parse a scoring reply; items without a usable sequence are skipped
pub fn parse_model_scores(text: &str) -> Result<Vec<ModelScore>, ResponseError> {
    let items = record_array(extract_json(text)?)?;
    Ok(items.iter().filter_map(ModelScore::from_value).collect())
}

/// Attach model scores to a batch by sequence.
///
/// Records the model did not answer for keep any earlier model scores, or
/// get zeros. The deterministic score fields are never touched.
pub fn merge_model_scores(batch: &mut [FirmRecord], scores: &[ModelScore]) {
    let by_sequence: HashMap<usize, &ModelScore> = scores.iter().map(|s| (s.sequence, s)).collect();

    for record in batch.iter_mut() {
        match by_sequence.get(&record.sequence) {
            Some(score) => {
                record.llm_lead_score = Some(score.lead_score);
                record.llm_completeness_score = Some(score.completeness_score);
                record.relevance_score = Some(score.relevance_score);
            }
            None => {
                record.llm_lead_score.get_or_insert(0);
                record.llm_completeness_score.get_or_insert(0.0);
                record.relevance_score.get_or_insert(0.0);
            }
        }
    }
}

/// Score records with the model in small batches, appending to `scored`.
///
/// Sequences already in `scored` are skipped, so an interrupted run can be
/// resumed against its own output. `save` receives the full output after
/// every batch; a save failure stops the run.
pub async fn execute_llm_scoring<F>(
    model: &dyn LanguageModel,
    records: &[FirmRecord],
    scored: &mut Vec<FirmRecord>,
    config: &LlmScoreConfig,
    mut save: F,
) -> Result<LlmScoreReport>
where
    F: FnMut(&[FirmRecord]) -> Result<()>,
{
    let mut report = LlmScoreReport::default();
    let mut processed: HashSet<usize> = scored.iter().map(|r| r.sequence).collect();

    let begin = config.start.saturating_sub(1).min(records.len());
    let end = config
        .count
        .map_or(records.len(), |count| (begin + count).min(records.len()));
    let batch_size = config.batch_size.max(1);

    info!(
        "Model scoring: records {}-{} of {} (batch size={})",
        begin + 1,
        end,
        records.len(),
        batch_size
    );

    for batch in records[begin..end].chunks(batch_size) {
        let mut pending: Vec<FirmRecord> = batch
            .iter()
            .filter(|r| !processed.contains(&r.sequence))
            .cloned()
            .collect();
        report.records_skipped += batch.len() - pending.len();
        if pending.is_empty() {
            continue;
        }

        let view: Vec<String> = pending.iter().map(|r| r.sequence.to_string()).collect();
        match request_scores(model, &pending).await {
            Ok(scores) => {
                merge_model_scores(&mut pending, &scores);
                report.batches_scored += 1;
                info!("Model scoring: scored [{}]", view.join(", "));
            }
            Err(e) => {
                merge_model_scores(&mut pending, &[]);
                report.batches_failed += 1;
                warn!("Model scoring: batch [{}] saved with default scores: {:#}", view.join(", "), e);
            }
        }

        report.records_scored += pending.len();
        processed.extend(pending.iter().map(|r| r.sequence));
        scored.extend(pending);
        save(scored)?;
    }

    info!(
        "Model scoring: {} batches scored, {} failed, {} records skipped",
        report.batches_scored, report.batches_failed, report.records_skipped
    );
    Ok(report)
}

async fn request_scores(model: &dyn LanguageModel, batch: &[FirmRecord]) -> Result<Vec<ModelScore>> {
    let text = model
        .complete(SCORING_SYSTEM_PROMPT, &build_scoring_prompt(batch))
        .await?;
    Ok(parse_model_scores(&text)?)
}

fn unit_score(value: f64) -> f64 {
    (value.clamp(0.0, 1.0) * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolSpec;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies from a fixed list; `None` entries fail the call
    struct ScriptedScorer {
        replies: Mutex<Vec<Option<&'static str>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedScorer {
        fn new(mut replies: Vec<Option<&'static str>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedScorer {
        async fn complete(&self, _system: &str, user: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(user.to_string());
            match self.replies.lock().unwrap().pop().flatten() {
                Some(text) => Ok(text.to_string()),
                None => anyhow::bail!("rate limited"),
            }
        }

        async fn complete_structured(&self, _system: &str, _user: &str, _tool: &ToolSpec) -> Result<Value> {
            anyhow::bail!("not used")
        }
    }

    fn records(n: usize) -> Vec<FirmRecord> {
        (1..=n)
            .map(|i| {
                let mut record = FirmRecord::new(i, format!("Firm {i}"));
                record.lead_score = Some(42);
                record
            })
            .collect()
    }

    #[test]
    fn test_parse_model_scores() {
        let text = r#"```json
{"results": [
  {"sequence": 2, "lead_score": 71.6, "completeness_score": 0.81234, "relevance_score": "0.9"},
  {"firm": "no sequence", "lead_score": 10},
  {"sequence": "3", "lead_score": 140, "relevance_score": -1}
]}
```"#;

        let scores = parse_model_scores(text).unwrap();

        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].sequence, 2);
        assert_eq!(scores[0].lead_score, 72);
        assert_eq!(scores[0].completeness_score, 0.812);
        assert_eq!(scores[0].relevance_score, 0.9);
        assert_eq!(scores[1].lead_score, 100);
        assert_eq!(scores[1].completeness_score, 0.0);
        assert_eq!(scores[1].relevance_score, 0.0);
    }

    #[test]
    fn test_merge_by_sequence_defaults_missing() {
        let mut batch = records(2);
        let scores = vec![ModelScore {
            sequence: 2,
            lead_score: 55,
            completeness_score: 0.5,
            relevance_score: 0.75,
        }];

        merge_model_scores(&mut batch, &scores);

        assert_eq!(batch[0].llm_lead_score, Some(0));
        assert_eq!(batch[0].relevance_score, Some(0.0));
        assert_eq!(batch[1].llm_lead_score, Some(55));
        assert_eq!(batch[1].llm_completeness_score, Some(0.5));
        assert_eq!(batch[1].relevance_score, Some(0.75));
        assert!(batch.iter().all(|r| r.lead_score == Some(42)));
    }

    #[tokio::test]
    async fn test_batches_saved_after_each_call() {
        let model = ScriptedScorer::new(vec![
            Some(r#"[{"sequence": 2, "lead_score": 80, "completeness_score": 0.6, "relevance_score": 0.7},
                     {"sequence": 1, "lead_score": 20, "completeness_score": 0.1, "relevance_score": 0.2}]"#),
            None,
        ]);
        let input = records(3);
        let mut scored = Vec::new();
        let mut saves = Vec::new();
        let config = LlmScoreConfig {
            batch_size: 2,
            ..Default::default()
        };

        let report = execute_llm_scoring(&model, &input, &mut scored, &config, |all| {
            saves.push(all.len());
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(saves, vec![2, 3]);
        assert_eq!(report.batches_scored, 1);
        assert_eq!(report.batches_failed, 1);
        assert_eq!(report.records_scored, 3);

        // Keyed by sequence, not position
        assert_eq!(scored[0].llm_lead_score, Some(20));
        assert_eq!(scored[1].llm_lead_score, Some(80));
        // Failed batch still carries the fields
        assert_eq!(scored[2].llm_lead_score, Some(0));
        assert_eq!(scored[2].relevance_score, Some(0.0));
        assert!(scored.iter().all(|r| r.lead_score == Some(42)));
    }

    #[tokio::test]
    async fn test_resume_skips_scored_sequences_and_honours_range() {
        let model = ScriptedScorer::new(vec![Some(
            r#"[{"sequence": 3, "lead_score": 30, "completeness_score": 0.3, "relevance_score": 0.3}]"#,
        )]);
        let input = records(5);
        let mut scored = vec![input[1].clone()];
        let config = LlmScoreConfig {
            batch_size: 5,
            start: 2,
            count: Some(2),
        };

        let report = execute_llm_scoring(&model, &input, &mut scored, &config, |_| Ok(()))
            .await
            .unwrap();

        assert_eq!(report.records_skipped, 1);
        assert_eq!(report.records_scored, 1);
        let sequences: Vec<usize> = scored.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![2, 3]);
        assert_eq!(scored[1].llm_lead_score, Some(30));

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Firm 3"));
        assert!(!prompts[0].contains("Firm 2\""));
    }

    #[tokio::test]
    async fn test_save_failure_stops_the_run() {
        let model = ScriptedScorer::new(vec![Some("[]"), Some("[]")]);
        let input = records(4);
        let mut scored = Vec::new();
        let config = LlmScoreConfig {
            batch_size: 2,
            ..Default::default()
        };

        let err = execute_llm_scoring(&model, &input, &mut scored, &config, |_| {
            anyhow::bail!("disk full")
        })
        .await
        .unwrap_err();

        assert!(err.to_string().contains("disk full"));
        assert_eq!(model.prompts.lock().unwrap().len(), 1);
    }
}
