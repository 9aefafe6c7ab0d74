use anyhow::Result;
use clap::{Parser, Subcommand};
use search_core::persist::{load_index, save_index, IndexPaths};
use search_core::{default_fallback_path, load_with_fallback, FieldWeights, InvertedIndex, RetrievalEngine, SynonymTable};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and inspect the product catalog TF-IDF index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a JSON, JSONL or CSV product catalog
    Build {
        /// Catalog file
        #[arg(long)]
        input: PathBuf,
        /// Catalog file to use when the primary one cannot be loaded (default: <stem>_clean.csv)
        #[arg(long)]
        fallback: Option<PathBuf>,
        /// Output index directory
        #[arg(long)]
        output: PathBuf,
        /// Weight applied to title-field occurrences
        #[arg(long, default_value_t = 3.0)]
        title_weight: f32,
        /// Weight applied to description/brand/category occurrences
        #[arg(long, default_value_t = 1.0)]
        body_weight: f32,
    },
    /// Run a query against a built index and print the ranked results
    Query {
        /// Index directory
        #[arg(long)]
        index: PathBuf,
        /// JSON synonym file replacing the built-in table
        #[arg(long)]
        synonyms: Option<PathBuf>,
        /// Number of results
        #[arg(long, default_value_t = 10)]
        k: usize,
        query: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, fallback, output, title_weight, body_weight } => {
            let fallback = fallback.unwrap_or_else(|| default_fallback_path(&input));
            let docs = load_with_fallback(&input, Some(fallback.as_path()))?;
            let index = InvertedIndex::build_with_weights(docs, FieldWeights { title: title_weight, body: body_weight });
            save_index(&IndexPaths::new(&output), &index)?;
            tracing::info!(output = %output.display(), num_docs = index.num_docs(), num_terms = index.num_terms(), "index build complete");
            Ok(())
        }
        Commands::Query { index, synonyms, k, query } => {
            let synonyms = match synonyms {
                Some(path) => SynonymTable::from_json_file(path)?,
                None => SynonymTable::builtin(),
            };
            let engine = RetrievalEngine::new(load_index(&IndexPaths::new(&index))?, synonyms);
            for hit in engine.search_top(&query, k) {
                let title = engine.document(&hit.doc_id).map(|d| d.title.clone()).unwrap_or_default();
                println!("{:>3}  {:>9.4}  {}  {}", hit.rank, hit.score, hit.doc_id, title);
            }
            Ok(())
        }
    }
}
