use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

mod library;
mod output;

use citecount_core::source::semantic_scholar::SemanticScholar;
use citecount_core::{
    RequestPacer, config_file, estimate_batch_seconds, parse_citation_block, update_items,
};
use library::JsonLibrary;
use output::ColorMode;

/// Fetch Semantic Scholar citation counts into a JSON library export
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch citation counts and write them into items' extra fields
    Update {
        /// Path to the JSON library export
        library: PathBuf,

        /// Update only these item ids (comma-separated)
        #[arg(long, value_delimiter = ',')]
        ids: Vec<i64>,

        /// Update every regular item in the library
        #[arg(long)]
        all: bool,

        /// Semantic Scholar API key
        #[arg(long)]
        api_key: Option<String>,

        /// Skip the confirmation prompt for --all
        #[arg(short, long)]
        yes: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// List items with their stored citation counts
    List {
        /// Path to the JSON library export
        library: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Update {
            library,
            ids,
            all,
            api_key,
            yes,
            no_color,
        } => update(library, ids, all, api_key, yes, no_color).await,
        Command::List { library } => list(library),
    }
}

async fn update(
    library_path: PathBuf,
    ids: Vec<i64>,
    all: bool,
    api_key: Option<String>,
    yes: bool,
    no_color: bool,
) -> anyhow::Result<()> {
    // Resolve configuration: CLI flags > env vars > config file > defaults
    let mut config = config_file::load_config().into_config();
    config.api_key = api_key
        .or_else(|| std::env::var("S2_API_KEY").ok())
        .or(config.api_key);
    tracing::debug!(?config, "resolved configuration");

    let library = JsonLibrary::open(&library_path)?;

    let mut items = if !ids.is_empty() {
        let items = library.items(Some(&ids));
        if items.len() != ids.len() {
            anyhow::bail!("some of the requested ids are not in {}", library_path.display());
        }
        items
    } else if all {
        // Full-library runs only touch regular items, like the host's
        // "update all" action; selection by id passes everything through.
        let mut items = library.items(None);
        items.retain(|i| i.is_regular());
        items
    } else {
        anyhow::bail!("nothing selected: pass --ids <id,...> or --all");
    };

    if items.is_empty() {
        anyhow::bail!("no items found in {}", library_path.display());
    }

    if all && !yes {
        let secs = estimate_batch_seconds(items.len(), config.min_request_interval);
        print!(
            "This will fetch citation counts for {} items. This may take about {} seconds due to rate limiting. Continue? [y/N] ",
            items.len(),
            secs
        );
        std::io::stdout().flush()?;
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            println!("aborted");
            return Ok(());
        }
    }

    let source = SemanticScholar::from_config(&config);
    let client = reqwest::Client::new();
    let pacer = RequestPacer::new(config.min_request_interval);

    // Ctrl-C stops the batch at the next item boundary
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let pb = output::progress_bar(items.len() as u64);
    let progress_pb = pb.clone();

    let outcome = update_items(
        &mut items,
        &source,
        &client,
        &config,
        &pacer,
        move |event| output::render_event(&progress_pb, &event),
        cancel.clone(),
    )
    .await;

    pb.finish_and_clear();
    if cancel.is_cancelled() {
        println!("cancelled; partial results below");
    }
    output::print_summary(&outcome, ColorMode(!no_color));

    Ok(())
}

fn list(library_path: PathBuf) -> anyhow::Result<()> {
    let library = JsonLibrary::open(&library_path)?;

    for record in library.records() {
        if !record.is_regular() {
            continue;
        }
        let count = record
            .fields
            .get("extra")
            .and_then(|extra| parse_citation_block(extra));
        let title = record.fields.get("title").map(String::as_str).unwrap_or("");
        match count {
            Some(count) => println!("{:>6}  {:>8}  {}", record.id, count, title),
            None => println!("{:>6}  {:>8}  {}", record.id, "-", title),
        }
    }

    Ok(())
}
