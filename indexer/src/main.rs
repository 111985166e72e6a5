use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use search_core::import::{import_path, DEFAULT_BATCH_SIZE};
use search_core::persist::{open_store, save_meta, try_load_meta, IndexPaths, MetaFile};
use search_core::{EngineConfig, RankingEngine};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Load postings into the inverted index and rank documents against it", long_about = None)]
struct Cli {
    /// Index directory
    #[arg(long, global = true, default_value = "./index")]
    index: String,
    // Usage is printed when omitted.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import tab-delimited postings from a file or a directory of .tsv/.txt files
    Import {
        /// Input path (file or directory)
        source: String,
        /// Postings written per storage batch
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
    /// Rank documents for the given words with both scoring schemes
    Query {
        /// Query words, already normalized
        #[arg(required = true)]
        words: Vec<String>,
        /// Corpus size used for idf; defaults to the number of indexed documents
        #[arg(long, env = "CORPUS_SIZE")]
        corpus_size: Option<u32>,
        /// Results shown per scheme
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let paths = IndexPaths::new(&cli.index);

    match cli.command {
        Some(Commands::Import { source, batch_size }) => import(&paths, &source, batch_size),
        Some(Commands::Query { words, corpus_size, top }) => query(&paths, &words, corpus_size, top),
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

fn import(paths: &IndexPaths, source: &str, batch_size: usize) -> Result<()> {
    let store = open_store(paths)?;
    let stats = import_path(source, &store, batch_size)?;
    store.flush()?;

    let corpus_size = u32::try_from(store.document_count()).unwrap_or(u32::MAX);
    save_meta(paths, &MetaFile::now(corpus_size, store.len() as u64))?;
    tracing::info!(
        source,
        imported = stats.imported,
        skipped = stats.skipped,
        documents = corpus_size,
        "import complete"
    );
    Ok(())
}

fn query(paths: &IndexPaths, words: &[String], corpus_size: Option<u32>, top: usize) -> Result<()> {
    let store = open_store(paths)?;
    let corpus_size = match corpus_size {
        Some(n) => Some(n),
        None => try_load_meta(paths)?.map(|m| m.corpus_size),
    };
    let engine = RankingEngine::new(store, &EngineConfig { corpus_size })?;
    tracing::info!(corpus_size = engine.corpus_size(), ?words, "running query");

    let additive = engine.rank_documents(words);
    println!("additive ranking ({} documents):", additive.len());
    for doc in additive.top(top) {
        println!("{doc}");
    }

    println!("============");
    let vector = engine.lookup_documents(words);
    println!("vector-space ranking ({} documents):", vector.len());
    for doc in vector.top(top) {
        println!("{doc}");
    }

    if !additive.unknown_words.is_empty() {
        println!("not in index: {}", additive.unknown_words.join(" "));
    }
    if additive.is_partial() || vector.is_partial() {
        let mut failed = additive.failed_words.clone();
        failed.extend(vector.failed_words.iter().filter(|w| !additive.failed_words.contains(w)).cloned());
        println!("partial results, retrieval failed for: {}", failed.join(" "));
    }
    Ok(())
}
