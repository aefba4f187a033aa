use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use firmleads::io::{render_detail, render_summary, write_json};
use firmleads::{
    AnthropicClient, AnthropicConfig, JsonSnapshotStore, LanguageModel, LlmMode, LlmScoreConfig,
    LlmStageConfig, PipelineOptions, RecordQuery, SearchBackend, SearchClient, SearchConfig,
    SearchStageConfig, SortKey, execute_llm_scoring, load_existing_records, load_records,
    read_table_blocks, run_pipeline, score_records,
};

#[derive(Parser)]
#[command(name = "firmleads")]
#[command(author, version, about = "Ranked-firms enrichment and lead scoring pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize, enrich and score a ranked-firms table
    Run {
        /// Extracted table blocks (JSON)
        #[arg(short, long)]
        tables: PathBuf,

        /// Directory for the per-stage snapshots and the run manifest
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// Records per search chunk
        #[arg(long, default_value = "15")]
        search_batch_size: usize,

        /// Pause between search lookups in milliseconds
        #[arg(long, default_value = "400")]
        search_delay_ms: u64,

        /// Per-request search timeout in seconds
        #[arg(long, default_value = "15")]
        search_timeout_secs: u64,

        /// Records per language-model call
        #[arg(long, default_value = "10")]
        llm_batch_size: usize,

        /// One call per chunk, or one structured call per record
        #[arg(long, value_enum, default_value_t = LlmMode::Batch)]
        llm_mode: LlmMode,

        /// Skip web search enrichment
        #[arg(long)]
        skip_search: bool,

        /// Skip language-model enrichment (scores are still attached)
        #[arg(long)]
        skip_llm: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Recompute scores for a snapshot without any network calls
    Rescore {
        /// Record snapshot (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the rescored records
        #[arg(short, long)]
        output: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Ask the language model to judge scored records as leads
    ScoreLlm {
        /// Scored record snapshot (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file; records already in it are not scored again
        #[arg(short, long)]
        output: PathBuf,

        /// 1-based position of the first record to score
        #[arg(long, default_value = "1")]
        start: usize,

        /// Number of records to consider from `start`
        #[arg(long)]
        count: Option<usize>,

        /// Records per model call
        #[arg(long, default_value = "5")]
        batch_size: usize,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Browse a snapshot as a filtered, sorted table
    Inspect {
        /// Record snapshot (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Only firms in this country
        #[arg(long)]
        country: Option<String>,

        /// Only firms with at least this lead score
        #[arg(long)]
        min_lead_score: Option<u8>,

        /// Substring of the firm name
        #[arg(long)]
        search: Option<String>,

        /// Sort order
        #[arg(long, value_enum, default_value_t = SortKey::Lead)]
        sort: SortKey,

        /// Maximum rows to show
        #[arg(long)]
        limit: Option<usize>,

        /// Show every field of one record
        #[arg(long)]
        sequence: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            tables,
            output_dir,
            search_batch_size,
            search_delay_ms,
            search_timeout_secs,
            llm_batch_size,
            llm_mode,
            skip_search,
            skip_llm,
            verbose,
        } => {
            setup_logging(verbose);
            let options = PipelineOptions {
                search: SearchStageConfig {
                    batch_size: search_batch_size,
                    delay: Duration::from_millis(search_delay_ms),
                },
                llm: LlmStageConfig {
                    batch_size: llm_batch_size,
                    mode: llm_mode,
                },
                skip_search,
                skip_llm,
                ..Default::default()
            };
            run(tables, output_dir, Duration::from_secs(search_timeout_secs), options).await
        }
        Commands::Rescore {
            input,
            output,
            verbose,
        } => {
            setup_logging(verbose);
            rescore(input, output)
        }
        Commands::ScoreLlm {
            input,
            output,
            start,
            count,
            batch_size,
            verbose,
        } => {
            setup_logging(verbose);
            let config = LlmScoreConfig {
                batch_size,
                start,
                count,
            };
            score_llm(input, output, config).await
        }
        Commands::Inspect {
            input,
            country,
            min_lead_score,
            search,
            sort,
            limit,
            sequence,
        } => {
            setup_logging(false);
            let query = RecordQuery {
                country,
                min_lead_score,
                search,
                sort,
                limit,
            };
            inspect(input, query, sequence)
        }
    }
}

fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(
    tables: PathBuf,
    output_dir: PathBuf,
    search_timeout: Duration,
    options: PipelineOptions,
) -> Result<()> {
    info!("Loading table blocks from {:?}", tables);
    let blocks = read_table_blocks(&tables).context("Failed to load table blocks")?;

    let search = if options.skip_search {
        None
    } else {
        Some(SearchClient::new(SearchConfig {
            timeout: search_timeout,
            ..Default::default()
        })?)
    };

    let model = if options.skip_llm {
        None
    } else {
        match AnthropicConfig::from_env() {
            Ok(config) => {
                let client = AnthropicClient::new(config);
                info!("Language model: {}", client.model());
                Some(client)
            }
            Err(e) => {
                warn!("{:#}; continuing with search data and scoring only", e);
                None
            }
        }
    };

    let mut store = JsonSnapshotStore::new(output_dir);
    let report = run_pipeline(
        &blocks,
        search.as_ref().map(|s| s as &dyn SearchBackend),
        model.as_ref().map(|m| m as &dyn LanguageModel),
        &mut store,
        &options,
    )
    .await?;

    let top = report
        .records
        .iter()
        .max_by_key(|r| r.lead_score)
        .map(|r| format!("{} ({})", r.firm, r.lead_score.unwrap_or(0)))
        .unwrap_or_else(|| "-".to_string());
    info!(
        "Complete: {} records written to {:?}, top lead {}",
        report.records.len(),
        store.dir(),
        top
    );

    Ok(())
}

fn rescore(input: PathBuf, output: PathBuf) -> Result<()> {
    let mut records = load_records(&input)?;
    let scored = score_records(&mut records);
    write_json(&output, &records)?;
    info!("Rescored {} records into {:?}", scored, output);
    Ok(())
}

async fn score_llm(input: PathBuf, output: PathBuf, config: LlmScoreConfig) -> Result<()> {
    let records = load_records(&input)?;
    let client = AnthropicClient::new(
        AnthropicConfig::from_env().context("Model scoring needs a language model")?,
    );
    info!("Language model: {}", client.model());

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    let mut scored = load_existing_records(&output);
    if !scored.is_empty() {
        info!("Resuming: {} records already in {:?}", scored.len(), output);
    }

    let report = execute_llm_scoring(&client, &records, &mut scored, &config, |all| {
        write_json(&output, all)
    })
    .await?;

    info!(
        "Model scoring complete: {} records scored, {} skipped, {} total in {:?}",
        report.records_scored,
        report.records_skipped,
        scored.len(),
        output
    );
    Ok(())
}

fn inspect(input: PathBuf, query: RecordQuery, sequence: Option<usize>) -> Result<()> {
    let records = load_records(&input)?;

    if let Some(sequence) = sequence {
        let record = records
            .iter()
            .find(|r| r.sequence == sequence)
            .with_context(|| format!("No record #{} in {:?}", sequence, input))?;
        print!("{}", render_detail(record));
        return Ok(());
    }

    let selected = query.apply(&records);
    print!("{}", render_summary(&selected));
    Ok(())
}
