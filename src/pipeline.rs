use anyhow::Result;
use tracing::info;

use crate::io::{
    LOCATION_SNAPSHOT, RAW_SNAPSHOT, RunManifest, SCORED_SNAPSHOT, SEARCH_SNAPSHOT, SnapshotSink,
};
use crate::llm::LanguageModel;
use crate::models::{FirmRecord, TableBlock};
use crate::search::SearchBackend;
use crate::stages::{
    LlmStageConfig, NormalizeConfig, SearchStageConfig, derive_locations, execute_llm_stage,
    execute_search_stage, normalize,
};

/// Options for a full pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub normalize: NormalizeConfig,
    pub search: SearchStageConfig,
    pub llm: LlmStageConfig,
    pub skip_search: bool,
    /// Skip model calls; records are still scored
    pub skip_llm: bool,
}

/// Final records plus the manifest written for the run
#[derive(Debug)]
pub struct PipelineReport {
    pub records: Vec<FirmRecord>,
    pub manifest: RunManifest,
}

/// Run every stage in order, persisting a snapshot after each.
///
/// Only normalization and snapshot I/O can fail the run; the enrichment
/// stages degrade per record or per chunk instead.
pub async fn run_pipeline(
    blocks: &[TableBlock],
    search: Option<&dyn SearchBackend>,
    model: Option<&dyn LanguageModel>,
    sink: &mut dyn SnapshotSink,
    options: &PipelineOptions,
) -> Result<PipelineReport> {
    let mut manifest = RunManifest::start();
    info!("Run {}: {} table blocks", manifest.run_id, blocks.len());

    // Stage 0: table normalization
    let normalized = normalize(blocks, &options.normalize)?;
    manifest.fragments_used = normalized.fragments_used;
    manifest.rows_dropped = normalized.rows_dropped;
    let mut records = normalized.records;
    manifest.record_count = records.len();
    manifest.snapshots.push(sink.persist(RAW_SNAPSHOT, &records)?);

    // Stage 1: location derivation
    derive_locations(&mut records);
    manifest.snapshots.push(sink.persist(LOCATION_SNAPSHOT, &records)?);

    // Stage 2: search enrichment
    match search {
        Some(client) if !options.skip_search => {
            let report = execute_search_stage(client, &mut records, &options.search).await;
            manifest.search = Some(report);
        }
        _ => info!("Skipping search enrichment"),
    }
    manifest.snapshots.push(sink.persist(SEARCH_SNAPSHOT, &records)?);

    // Stage 3: model enrichment and scoring
    let model = if options.skip_llm { None } else { model };
    let report = execute_llm_stage(model, &mut records, &options.llm).await;
    manifest.llm = Some(report);
    manifest.snapshots.push(sink.persist(SCORED_SNAPSHOT, &records)?);

    manifest.finish();
    let manifest_path = sink.persist_manifest(&manifest)?;
    info!(
        "Run {} complete: {} records, manifest at {:?}",
        manifest.run_id,
        records.len(),
        manifest_path
    );

    Ok(PipelineReport { records, manifest })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TableError;
    use crate::io::{JsonSnapshotStore, load_records};
    use crate::llm::ToolSpec;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Keeps every persisted stage in memory
    #[derive(Default)]
    struct MemorySink {
        stages: Vec<(String, Vec<FirmRecord>)>,
        manifests: usize,
    }

    impl SnapshotSink for MemorySink {
        fn persist(&mut self, stage: &str, records: &[FirmRecord]) -> Result<PathBuf> {
            self.stages.push((stage.to_string(), records.to_vec()));
            Ok(PathBuf::from(stage))
        }

        fn persist_manifest(&mut self, _manifest: &RunManifest) -> Result<PathBuf> {
            self.manifests += 1;
            Ok(PathBuf::from("manifest"))
        }
    }

    struct FixedModel(&'static str);

    #[async_trait]
    impl LanguageModel for FixedModel {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(self.0.to_string())
        }

        async fn complete_structured(&self, _system: &str, _user: &str, _tool: &ToolSpec) -> Result<Value> {
            anyhow::bail!("not scripted")
        }
    }

    fn blocks() -> Vec<TableBlock> {
        vec![
            TableBlock::from_cells(vec![
                vec!["RANK 2024", "RANK 2023", "FIRM", "REVENUE $ MIL"],
                vec!["1", "2", "Acme Co, Omaha, Neb.", "1,200.5"],
            ]),
            TableBlock::from_cells(vec![vec!["2", "1", "Beta LLC, Toronto, Ontario, Canada", "900"]]),
        ]
    }

    #[tokio::test]
    async fn test_pipeline_snapshots_every_stage() {
        let mut sink = MemorySink::default();
        let model = FixedModel(
            r#"[{"sequence": 1, "industry": "Water infrastructure"}, {"sequence": 2, "industry": null}]"#,
        );

        let report = run_pipeline(&blocks(), None, Some(&model), &mut sink, &PipelineOptions::default())
            .await
            .unwrap();

        let stages: Vec<&str> = sink.stages.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(
            stages,
            vec![RAW_SNAPSHOT, LOCATION_SNAPSHOT, SEARCH_SNAPSHOT, SCORED_SNAPSHOT]
        );
        assert_eq!(sink.manifests, 1);

        // Raw snapshot still has the unsplit firm
        assert_eq!(sink.stages[0].1[0].firm, "Acme Co, Omaha, Neb.");
        assert_eq!(sink.stages[1].1[0].firm, "Acme Co");
        assert_eq!(sink.stages[1].1[1].location.as_deref(), Some("Toronto, Ontario, Canada"));
        assert!(sink.stages[2].1[0].lead_score.is_none());

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].profile.industry.as_deref(), Some("Water infrastructure"));
        assert_eq!(report.records[0].water_focus_score, Some(25));
        assert_eq!(report.records[0].infra_focus_score, Some(25));
        assert!(report.records.iter().all(|r| r.scores().is_some()));
        assert!(report.manifest.search.is_none());
        assert_eq!(report.manifest.llm.as_ref().unwrap().chunks_enriched, 1);
        assert_eq!(report.manifest.snapshots.len(), 4);
    }

    #[tokio::test]
    async fn test_skip_llm_still_scores() {
        let mut sink = MemorySink::default();
        let model = FixedModel("[]");
        let options = PipelineOptions {
            skip_llm: true,
            ..Default::default()
        };

        let report = run_pipeline(&blocks(), None, Some(&model), &mut sink, &options)
            .await
            .unwrap();

        let llm = report.manifest.llm.unwrap();
        assert!(!llm.model_available);
        assert_eq!(llm.records_scored, 2);
        assert!(report.records.iter().all(|r| r.lead_score == Some(0)));
    }

    #[tokio::test]
    async fn test_missing_header_aborts_before_any_snapshot() {
        let mut sink = MemorySink::default();
        let blocks = vec![TableBlock::from_cells(vec![vec!["a", "b", "c"]])];

        let err = run_pipeline(&blocks, None, None, &mut sink, &PipelineOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<TableError>(),
            Some(TableError::HeaderNotFound { .. })
        ));
        assert!(sink.stages.is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_writes_json_files() {
        let tmp = TempDir::new().unwrap();
        let mut store = JsonSnapshotStore::new(tmp.path());

        run_pipeline(&blocks(), None, None, &mut store, &PipelineOptions::default())
            .await
            .unwrap();

        let scored = load_records(&tmp.path().join("step4_records_after_llm_scoring.json")).unwrap();
        assert_eq!(scored.len(), 2);
        assert_eq!(scored[1].firm, "Beta LLC");
        assert!(tmp.path().join("step2_records_with_loc.json").exists());
        assert!(tmp.path().join("manifest.json").exists());
    }
}
