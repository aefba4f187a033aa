pub mod error;
pub mod heuristics;
pub mod io;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod stages;

pub use error::TableError;
pub use heuristics::score_profile;
pub use io::{
    JsonSnapshotStore, RecordQuery, RunManifest, SnapshotSink, SortKey, load_existing_records, load_records,
    read_table_blocks,
};
pub use llm::{AnthropicClient, AnthropicConfig, LanguageModel};
pub use models::{CompanyProfile, FirmRecord, LeadScores, Outcome, SearchFields, TableBlock};
pub use pipeline::{PipelineOptions, PipelineReport, run_pipeline};
pub use search::{SearchBackend, SearchClient, SearchConfig};
pub use stages::{
    LlmMode, LlmScoreConfig, LlmScoreReport, LlmStageConfig, NormalizeConfig, SearchStageConfig,
    derive_locations, execute_llm_scoring, execute_llm_stage, execute_search_stage, normalize,
    score_records,
};
