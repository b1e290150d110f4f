//! hltb - HowLongToBeat search command line interface.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use hltb_search::{
    CompletionCategory, HltbConfig, HltbEntry, HowLongToBeat, HttpFetcher, ScriptResolver,
    SearchError, SearchModifier,
};

/// hltb - look up game lengths on HowLongToBeat
#[derive(Parser)]
#[command(name = "hltb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Site root to query
    #[arg(long, global = true)]
    base_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a game
    Search(SearchArgs),

    /// Discover the current search credential and print it
    Credential {
        /// Scan every script on the page, not just the app bundle
        #[arg(short, long)]
        exhaustive: bool,
    },
}

#[derive(Parser)]
struct SearchArgs {
    /// Game title
    query: String,

    /// Server-side filter: none, only-dlc, only-mods, only-hacks, hide-dlc
    #[arg(short, long, default_value = "none")]
    modifier: SearchModifier,

    /// Result page
    #[arg(short, long, default_value = "1")]
    page: u32,

    /// Minimum similarity between 0 and 1
    #[arg(short = 's', long, default_value = "0.5")]
    min_similarity: f64,

    /// Maximum number of results to display
    #[arg(short, long, default_value = "10")]
    limit: usize,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// Compact single-line output
    Compact,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    let mut config = HltbConfig::default();
    if let Some(base_url) = cli.base_url {
        config = config.with_base_url(base_url);
    }

    match cli.command {
        Commands::Search(args) => run_search(config, args).await,
        Commands::Credential { exhaustive } => show_credential(config, exhaustive).await,
    }
}

async fn run_search(config: HltbConfig, args: SearchArgs) -> Result<()> {
    let hltb = HowLongToBeat::with_config(config.with_min_similarity(args.min_similarity))?;
    let entries = hltb
        .search_page(&args.query, args.modifier, args.page)
        .await;

    match args.format {
        OutputFormat::Text => {
            println!(
                "\nResults for \"{}\" ({} found):\n",
                args.query,
                entries.len()
            );
            for (i, entry) in entries.iter().take(args.limit).enumerate() {
                print_entry(i + 1, entry);
            }
        }
        OutputFormat::Json => {
            let output: Vec<_> = entries.iter().take(args.limit).collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Compact => {
            for entry in entries.iter().take(args.limit) {
                let main = entry
                    .main
                    .map(|stat| format!("{:.1}h", stat.hours()))
                    .unwrap_or_else(|| "-".to_string());
                println!("{}\t{}\t{}", entry.id, entry.name, main);
            }
        }
    }

    Ok(())
}

fn print_entry(rank: usize, entry: &HltbEntry) {
    match entry.release_year {
        Some(year) => println!("{}. {} ({})", rank, entry.name, year),
        None => println!("{}. {}", rank, entry.name),
    }
    if !entry.alias.is_empty() {
        println!("   Alias: {}", entry.alias);
    }
    if !entry.platforms.is_empty() {
        println!("   Platforms: {}", entry.platforms.join(", "));
    }
    for category in CompletionCategory::ALL {
        if let Some(stat) = entry.stat(category) {
            println!(
                "   {:<14} {:>7.1}h  ({} submissions)",
                category.label(),
                stat.hours(),
                stat.count
            );
        }
    }
    if let Some(image_url) = &entry.image_url {
        println!("   Image: {}", image_url);
    }
    println!("   Similarity: {:.2}", entry.similarity);
    println!();
}

async fn show_credential(config: HltbConfig, exhaustive: bool) -> Result<()> {
    let credential = if exhaustive {
        let fetcher = Arc::new(HttpFetcher::new(&config)?);
        ScriptResolver::new(fetcher, config)?.resolve(true).await
    } else {
        HowLongToBeat::with_config(config)?.resolve_credential().await
    };

    match credential {
        Some(credential) => {
            println!("Kind:     {:?}", credential.kind);
            println!("Key:      {}", credential.key);
            println!(
                "Endpoint: {}",
                credential
                    .endpoint_override
                    .as_deref()
                    .unwrap_or("(default)")
            );
            Ok(())
        }
        None => Err(SearchError::NoCredential.into()),
    }
}
