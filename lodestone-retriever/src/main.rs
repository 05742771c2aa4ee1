use clap::{ArgAction, Parser, Subcommand};
use lodestone_embed::{ModelKind, create_model};
use lodestone_retriever::{
    EmbeddingStoreIngestor, RetrieverConfig,
    config::CONFIG_FILE_NAME,
    document::{
        Document, DocumentSplitter, FileSystemSource, TextDocumentParser, load_document,
        load_documents,
    },
    filter::Filter,
    retrieval::{Content, ContentRetriever, Query},
    storage::{EmbeddingStore, SqliteEmbeddingStore},
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::Level;

/// Index text files and retrieve the passages most relevant to a query.
#[derive(Parser, Debug)]
#[command(name = "lodestone", author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Embedding database, overriding the configured one
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the embedding database and a default config file
    Init,
    /// Load, split, embed and store files or directories
    Ingest {
        /// Files or directories to ingest
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Retrieve the stored segments most relevant to a query
    Retrieve {
        /// Query text
        query: String,
        /// Maximum number of results
        #[arg(short = 'n', long)]
        max_results: Option<usize>,
        /// Minimum relevance score (0.0 to 1.0)
        #[arg(short = 's', long)]
        min_score: Option<f64>,
        /// Metadata filter, e.g. "file_name=notes.md, line_start>=10"
        #[arg(long)]
        filter: Option<String>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show database statistics
    Stats {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Remove every stored embedding
    Clear,
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Full,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "full" => Ok(OutputFormat::Full),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[derive(Serialize)]
struct DatabaseStats {
    database: PathBuf,
    embeddings: usize,
    model: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = RetrieverConfig::load(&args.config)?;
    if let Some(database) = args.database {
        config.database = database;
    }

    match args.command {
        Commands::Init => {
            let _store = SqliteEmbeddingStore::open(&config.database).await?;
            if !args.config.exists() {
                std::fs::write(&args.config, config.to_toml_string()?)?;
                println!("Wrote default configuration to {}", args.config.display());
            }
            println!("Initialized embedding database at {}", config.database.display());
            Ok(())
        }
        Commands::Ingest { paths } => {
            let store = Arc::new(SqliteEmbeddingStore::open(&config.database).await?);
            let model = create_model(&config.model).await?;

            let mut documents = Vec::new();
            for path in &paths {
                documents.extend(load_path(path).await?);
            }
            if documents.is_empty() {
                println!("No documents found");
                return Ok(());
            }

            let ingestor = EmbeddingStoreIngestor::new(config.splitter()?, model, store);
            let result = ingestor.ingest(&documents).await?;
            println!(
                "Ingested {} documents as {} segments in {:.2}s",
                result.documents,
                result.segments,
                result.elapsed.as_secs_f64()
            );
            Ok(())
        }
        Commands::Retrieve {
            query,
            max_results,
            min_score,
            filter,
            format,
        } => {
            let store = Arc::new(SqliteEmbeddingStore::open(&config.database).await?);
            let model = create_model(&config.model).await?;

            let mut builder = config
                .retriever_builder()
                .embedding_store(store)
                .embedding_model(model);
            if let Some(n) = max_results {
                builder = builder.max_results(n);
            }
            if let Some(score) = min_score {
                builder = builder.min_score(score);
            }
            if let Some(expression) = filter {
                builder = builder.filter(Filter::parse(&expression)?);
            }
            let retriever = builder.build()?;

            let contents = retriever.retrieve(&Query::from(query)).await?;
            print_contents(&contents, &format)?;
            Ok(())
        }
        Commands::Stats { format } => {
            let store = SqliteEmbeddingStore::open(&config.database).await?;
            let stats = DatabaseStats {
                database: config.database.clone(),
                embeddings: store.count().await?,
                model: match config.model.kind {
                    ModelKind::Hashing => {
                        format!("hashing ({} dimensions)", config.model.dimension)
                    }
                    ModelKind::Fastembed => config.model.model_name().to_string(),
                },
            };

            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Database Statistics:");
                println!("  Database: {}", stats.database.display());
                println!("  Embeddings: {}", stats.embeddings);
                println!("  Model: {}", stats.model);
            }
            Ok(())
        }
        Commands::Clear => {
            let store = SqliteEmbeddingStore::open(&config.database).await?;
            let removed = store.count().await?;
            store.remove_all().await?;
            println!("Removed {removed} embeddings");
            Ok(())
        }
    }
}

/// Load a single file or every file under a directory.
async fn load_path(path: &Path) -> anyhow::Result<Vec<Document>> {
    if path.is_dir() {
        Ok(load_documents(path, &TextDocumentParser).await?)
    } else {
        let source = FileSystemSource::new(path)?;
        Ok(vec![load_document(&source, &TextDocumentParser).await?])
    }
}

fn print_contents(contents: &[Content], format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(contents)?);
        }
        OutputFormat::Summary => {
            println!("Found {} relevant segments:", contents.len());
            for content in contents {
                let metadata = &content.text_segment.metadata;
                println!(
                    "  Score: {:.3} | File: {} | Lines: {}-{}",
                    content.score().unwrap_or_default(),
                    metadata.get_string(Document::FILE_NAME).unwrap_or("-"),
                    metadata.get_integer(DocumentSplitter::LINE_START).unwrap_or(0),
                    metadata.get_integer(DocumentSplitter::LINE_END).unwrap_or(0),
                );
            }
        }
        OutputFormat::Full => {
            for content in contents {
                let metadata = &content.text_segment.metadata;
                println!("Score: {:.3}", content.score().unwrap_or_default());
                println!("Embedding ID: {}", content.embedding_id().unwrap_or("-"));
                if let (Some(dir), Some(name)) = (
                    metadata.get_string(Document::ABSOLUTE_DIRECTORY_PATH),
                    metadata.get_string(Document::FILE_NAME),
                ) {
                    println!("File: {}", Path::new(dir).join(name).display());
                }
                println!("Content:\n{}", content.text());
                println!("---");
            }
        }
    }
    Ok(())
}
