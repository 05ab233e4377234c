//! devscope CLI entry point.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{error::ErrorKind, Parser, Subcommand};

use devscope::types::DEFAULT_INDEX_DIR;
use devscope::{query, FileSnippets, IndexBuilder, IndexReader, Searcher};

/// DevScope - code & log search engine.
#[derive(Parser, Debug)]
#[command(name = "devscope")]
#[command(version)]
#[command(about = "Index and search source code and application logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Recursively index a directory tree into ./.devscope/
    Index {
        /// Root directory to index
        path: PathBuf,
    },
    /// Search the index in ./.devscope/
    Search {
        /// Query string; multiple arguments are joined with spaces
        #[arg(required = true)]
        query: Vec<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devscope=info".into()),
        )
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                e.exit();
            }
            let _ = e.print();
            std::process::exit(1);
        }
    };

    let outcome = match cli.command {
        Commands::Index { path } => run_index(&path),
        Commands::Search { query } => run_search(&query.join(" ")),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run_index(root: &Path) -> devscope::Result<()> {
    println!("Indexing {} -> {}", root.display(), DEFAULT_INDEX_DIR);

    let stats = IndexBuilder::new(DEFAULT_INDEX_DIR).build(root)?;

    println!(
        "Indexing complete: {} files, {} distinct terms.",
        stats.files_indexed, stats.distinct_terms
    );
    Ok(())
}

fn run_search(query_str: &str) -> devscope::Result<()> {
    let reader = IndexReader::open(Path::new(DEFAULT_INDEX_DIR))?;
    let snippets = FileSnippets;
    let searcher = Searcher::new(&reader, &snippets);

    let start = Instant::now();
    let parsed = query::parse(query_str);
    let results = searcher.search(&parsed)?;
    let duration = start.elapsed();

    println!("Found {} results in {:?}:", results.len(), duration);
    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. {} (Line: {}, Score: {:.2}, Matches: {})",
            i + 1,
            result.path,
            result.line_num,
            result.score,
            result.total_hits
        );
        println!("   {}\n", result.snippet);
    }
    Ok(())
}
