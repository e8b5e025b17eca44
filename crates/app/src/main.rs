use acervo_core::{
    is_truthy, Answer, ChatModel, DataPaths, MeiliClient, OpenAiChat, OpenAiChatConfig,
    PdftotextExtractor, Pipeline, PipelineConfig, QueryOptions, SearchCoordinator, SearchEngine,
    SearchHit, StageFlags, DEFAULT_CHAT_MODEL,
};
use anyhow::Context;
use chrono::Utc;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SNIPPET_CHARS: usize = 400;

#[derive(Parser)]
#[command(name = "acervo", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Meilisearch base URL
    #[arg(long, env = "MEILI_URL", default_value = "http://127.0.0.1:7700")]
    meili_url: String,

    /// Meilisearch master key
    #[arg(long, env = "MEILI_MASTER_KEY", default_value = "", hide_env_values = true)]
    meili_key: String,

    /// Index the dataset is synchronized into
    #[arg(long, env = "MEILI_INDEX", default_value = "documentos")]
    index: String,

    /// OpenAI key, used for the embedder and the chat assistant
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Build the dataset from the raw PDFs and synchronize it into the index.
    Run(RunArgs),
    /// Run one query and print the matching chunks.
    Search {
        /// Query text
        query: String,
        /// Number of hits to return.
        #[arg(long, default_value = "5")]
        limit: usize,
        /// Weight of the semantic side of hybrid search.
        #[arg(long, default_value = "0.7")]
        semantic_ratio: f32,
        /// Keyword search only.
        #[arg(long, default_value_t = false)]
        full_text: bool,
    },
    /// Interactive question loop. `:quit` or end of input leaves it.
    Chat {
        /// Chat model used for rewriting and summaries.
        #[arg(long, default_value = DEFAULT_CHAT_MODEL)]
        model: String,
        #[arg(long, default_value = "5")]
        limit: usize,
        #[arg(long, default_value = "0.7")]
        semantic_ratio: f32,
        /// Search the question as typed.
        #[arg(long, default_value_t = false)]
        no_rewrite: bool,
        /// Print hits without asking the model for a summary.
        #[arg(long, default_value_t = false)]
        no_summary: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Root holding `1-raw`, `2-processed` and `3-out`.
    #[arg(long, env = "ACERVO_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Change ledger file. Keep it out of temporary storage.
    #[arg(long, env = "LEDGER_PATH")]
    ledger_path: PathBuf,

    /// pdftotext executable
    #[arg(long, env = "PDFTOTEXT", default_value = "pdftotext")]
    pdftotext: PathBuf,

    /// Correct common OCR misreadings before chunking.
    #[arg(long, env = "FIX_OCR_TYPOS", value_parser = parse_truthy, action = ArgAction::Set,
          num_args = 0..=1, default_value = "false", default_missing_value = "true")]
    fix_ocr_typos: bool,

    /// Last page read from each PDF.
    #[arg(long, default_value = "9999")]
    max_pages: u32,

    /// Documents per upload task.
    #[arg(long, default_value = "1000")]
    batch_size: usize,

    #[command(flatten)]
    stages: StageArgs,
}

#[derive(Args)]
struct StageArgs {
    #[arg(long, env = "SKIP_DATASET", value_parser = parse_truthy, action = ArgAction::Set,
          num_args = 0..=1, default_value = "false", default_missing_value = "true")]
    skip_dataset: bool,
    #[arg(long, env = "SKIP_INDEX", value_parser = parse_truthy, action = ArgAction::Set,
          num_args = 0..=1, default_value = "false", default_missing_value = "true")]
    skip_index: bool,
    #[arg(long, env = "SKIP_UPSERT", value_parser = parse_truthy, action = ArgAction::Set,
          num_args = 0..=1, default_value = "false", default_missing_value = "true")]
    skip_upsert: bool,
    #[arg(long, env = "SKIP_SETTINGS", value_parser = parse_truthy, action = ArgAction::Set,
          num_args = 0..=1, default_value = "false", default_missing_value = "true")]
    skip_settings: bool,
    #[arg(long, env = "SKIP_EMBEDDINGS", value_parser = parse_truthy, action = ArgAction::Set,
          num_args = 0..=1, default_value = "false", default_missing_value = "true")]
    skip_embeddings: bool,
    #[arg(long, env = "SKIP_SANITY", value_parser = parse_truthy, action = ArgAction::Set,
          num_args = 0..=1, default_value = "false", default_missing_value = "true")]
    skip_sanity: bool,
}

impl From<StageArgs> for StageFlags {
    fn from(args: StageArgs) -> Self {
        Self {
            skip_dataset: args.skip_dataset,
            skip_index: args.skip_index,
            skip_upsert: args.skip_upsert,
            skip_settings: args.skip_settings,
            skip_embeddings: args.skip_embeddings,
            skip_sanity: args.skip_sanity,
        }
    }
}

fn parse_truthy(value: &str) -> Result<bool, String> {
    Ok(is_truthy(value))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let openai_api_key = non_blank(cli.openai_api_key);

    let engine = MeiliClient::new(&cli.meili_url, Some(cli.meili_key), cli.index.clone())
        .with_context(|| format!("invalid Meilisearch URL {}", cli.meili_url))?;

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        meili_url = %cli.meili_url,
        index = %cli.index,
        "acervo boot"
    );

    match cli.command {
        Command::Run(args) => run(args, &engine, openai_api_key).await?,
        Command::Search {
            query,
            limit,
            semantic_ratio,
            full_text,
        } => {
            let options = QueryOptions {
                semantic_ratio,
                limit,
                ..QueryOptions::default()
            };
            let coordinator = SearchCoordinator::new(&engine, None, options);
            let hits = coordinator
                .search(&query, limit, !full_text)
                .await
                .with_context(|| format!("search failed for {query:?}"))?;

            println!("query: {query}");
            if hits.is_empty() {
                println!("no hits");
            }
            print_hits(&hits);
        }
        Command::Chat {
            model,
            limit,
            semantic_ratio,
            no_rewrite,
            no_summary,
        } => {
            let chat = match openai_api_key {
                Some(key) => {
                    let mut config = OpenAiChatConfig::new(key);
                    config.model = model;
                    Some(OpenAiChat::new(config).context("failed to build the chat client")?)
                }
                None => {
                    warn!("OPENAI_API_KEY not set, questions are searched as typed");
                    None
                }
            };
            let options = QueryOptions {
                semantic_ratio,
                limit,
                rewrite_query: !no_rewrite,
                summarize: !no_summary,
                ..QueryOptions::default()
            };
            let coordinator = SearchCoordinator::new(
                &engine,
                chat.as_ref().map(|chat| chat as &dyn ChatModel),
                options,
            );
            chat_loop(&coordinator).await?;
        }
    }

    Ok(())
}

async fn run(
    args: RunArgs,
    engine: &MeiliClient,
    openai_api_key: Option<String>,
) -> anyhow::Result<()> {
    let mut config = PipelineConfig::new(DataPaths::under(&args.data_dir, args.ledger_path));
    config.preprocess.correct_ocr_typos = args.fix_ocr_typos;
    config.preprocess.max_pages = args.max_pages;
    config.sync.batch_size = args.batch_size;
    config.llm_api_key = openai_api_key;
    config.stages = args.stages.into();

    let extractor = PdftotextExtractor::new(args.pdftotext);
    let report = Pipeline::new(&config, engine, &extractor)
        .run()
        .await
        .context("pipeline failed")?;

    if report.no_sources {
        println!(
            "no PDFs found in {}, nothing to do",
            config.paths.raw_dir.display()
        );
        return Ok(());
    }

    if let Some(records) = report.merged_records {
        println!("{records} records in {}", config.paths.merged_file.display());
    }
    if let Some(upserted) = report.upserted {
        println!("{upserted} new or changed records sent to {}", engine.index_uid());
    }
    for result in &report.sanity {
        println!("sanity: {}", result.query);
        for citation in &result.citations {
            println!("  - {citation}");
        }
    }
    println!(
        "finished at {}",
        report.finished_at.unwrap_or_else(Utc::now).to_rfc3339()
    );
    Ok(())
}

async fn chat_loop(coordinator: &SearchCoordinator<'_, MeiliClient>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush().context("failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            println!();
            break;
        };
        let question = line.trim();
        if question == ":quit" {
            break;
        }
        if question.is_empty() {
            continue;
        }

        match coordinator.ask(question).await {
            Ok(Answer::NotFound { message, .. }) => println!("{message}"),
            Ok(Answer::Found {
                query,
                summary,
                hits,
            }) => {
                println!("query: {query}");
                if let Some(summary) = summary {
                    println!("{summary}");
                }
                print_hits(&hits);
            }
            Err(error) => warn!(%error, "question failed"),
        }
    }

    Ok(())
}

fn print_hits(hits: &[SearchHit]) {
    for hit in hits {
        println!("- {}", hit.citation());
        let snippet = hit.snippet(SNIPPET_CHARS);
        if !snippet.is_empty() {
            println!("  {snippet}");
        }
    }
}
