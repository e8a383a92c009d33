//! Command-line interface for evidence-backed financial analysis

use agent_core::Source;
use agent_finance::{
    AnalyzeRequest, DocumentCorpus, Orchestrator, RetrievalConfig, Retriever, YahooProvider,
};
use agent_llm::providers::OpenAIProvider;
use agent_utils::Settings;
use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "finance-cli")]
#[command(about = "Evidence-backed financial analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the sources retrieved for a query
    Retrieve(QueryArgs),
    /// Run every analysis agent and print the final answer
    Ask(QueryArgs),
}

#[derive(Args)]
struct QueryArgs {
    /// Free-text question, e.g. "What is AAPL's operating income?"
    query: String,

    /// Maximum number of sources
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Ticker to look up ahead of the ones found in the query
    #[arg(short, long)]
    ticker: Option<String>,

    /// Skip live market data
    #[arg(long)]
    offline: bool,

    /// Extra documents to add to the seeded corpus (JSON array)
    #[arg(long, value_name = "FILE")]
    corpus: Option<PathBuf>,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    agent_utils::init_tracing();

    let cli = Cli::parse();
    let settings = Settings::from_env().context("invalid settings")?;

    match cli.command {
        Commands::Retrieve(args) => retrieve(&args, &settings).await,
        Commands::Ask(args) => ask(args, settings).await,
    }
}

async fn retrieve(args: &QueryArgs, settings: &Settings) -> anyhow::Result<()> {
    let retriever = build_retriever(args)?;
    let top_k = args.top_k.unwrap_or(settings.top_k);

    let retrieval = retriever.gather(&args.query, args.ticker.as_deref(), top_k).await;
    let sources = retrieval.evidence.sources();

    if args.json {
        let body = serde_json::json!({
            "sources": sources,
            "warnings": retrieval.warnings,
            "tickers": retrieval.tickers,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("{}", sources_table(sources));
    for warning in &retrieval.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(())
}

async fn ask(args: QueryArgs, settings: Settings) -> anyhow::Result<()> {
    let retriever = build_retriever(&args)?;
    let mut orchestrator = Orchestrator::new(retriever, settings)?;

    match OpenAIProvider::from_env() {
        Ok(provider) => {
            info!(api_base = %provider.config().api_base, "Using generation provider");
            orchestrator = orchestrator.with_llm(Arc::new(provider));
        },
        Err(e) => info!("No generation provider configured ({e}); using evidence digests"),
    }

    let mut request = AnalyzeRequest::new(args.query);
    if let Some(ticker) = args.ticker {
        request = request.with_ticker(ticker);
    }
    if let Some(top_k) = args.top_k {
        request = request.with_top_k(top_k);
    }

    let response = orchestrator.run(request).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{}", response.final_answer);
    for warning in &response.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(())
}

fn build_retriever(args: &QueryArgs) -> anyhow::Result<Retriever> {
    let mut corpus = DocumentCorpus::seeded()?;
    if let Some(path) = &args.corpus {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read corpus file {}", path.display()))?;
        corpus.extend(DocumentCorpus::from_json(&json)?)?;
        info!(path = %path.display(), documents = corpus.len(), "Loaded corpus");
    }

    let retriever = Retriever::new(corpus, RetrievalConfig::default())?;
    if args.offline {
        return Ok(retriever);
    }

    match YahooProvider::new() {
        Ok(provider) => Ok(retriever.with_market_data(Arc::new(provider))),
        Err(e) => {
            warn!(error = %e, "Market data unavailable; continuing with documents only");
            Ok(retriever)
        },
    }
}

fn sources_table(sources: &[Source]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Title", "Snippet", "URL"]);

    for source in sources {
        table.add_row(vec![
            source.id.as_str(),
            source.title.as_str(),
            source.snippet.as_deref().unwrap_or("-"),
            source.url.as_deref().unwrap_or("-"),
        ]);
    }
    table
}
