//! ragd CLI - Command-line interface
//!
//! Usage:
//!   ragd ingest [path]
//!   ragd ask <question> [--stream] [--top-k N]
//!   ragd status

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures::StreamExt;

use ragd_core::config::AppConfig;
use ragd_rag::{OllamaClient, RagPipeline};
use ragd_vector::{QdrantStore, ResilientEmbedder};

#[derive(Parser)]
#[command(name = "ragd")]
#[command(about = "Retrieval-augmented question answering over local documents")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file; environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk, embed, and index documents
    Ingest {
        /// Directory to scan; defaults to the configured docs dir
        path: Option<PathBuf>,
    },
    /// Ask a question against the indexed documents
    Ask {
        /// Question to ask
        question: String,

        /// Stream the answer as it is generated
        #[arg(long)]
        stream: bool,

        /// Override the number of retrieved passages
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Show index and model status
    Status,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

fn build_pipeline(config: &AppConfig) -> anyhow::Result<RagPipeline> {
    let embedder = Arc::new(ResilientEmbedder::from_config(&config.embedding));
    let index = Arc::new(QdrantStore::new(&config.qdrant)?);
    let llm = Arc::new(OllamaClient::from_config(&config.llm));
    Ok(RagPipeline::new(config.clone(), embedder, index, llm))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ragd=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Ingest { path } => {
            let pipeline = build_pipeline(&config)?;
            let root = path.unwrap_or_else(|| config.chunking.docs_dir.clone());

            println!("Ingesting documents from {}", root.display());
            let report = pipeline.ingest_dir(&root).await?;
            println!("Indexed {} chunk(s)", report.indexed);
        }

        Commands::Ask {
            question,
            stream,
            top_k,
        } => {
            let pipeline = build_pipeline(&config)?;

            if stream {
                let mut events = pipeline.ask_stream(&question).await?;
                let mut stdout = std::io::stdout();
                while let Some(event) = events.next().await {
                    stdout.write_all(event.as_bytes())?;
                    stdout.flush()?;
                }
                println!();
            } else {
                let response = pipeline.ask(&question, top_k).await?;
                println!("{}", response.answer);
                if !response.sources.is_empty() {
                    println!("\nSources:");
                    for source in &response.sources {
                        println!("- {source}");
                    }
                }
            }
        }

        Commands::Status => {
            let pipeline = build_pipeline(&config)?;
            let llm = OllamaClient::from_config(&config.llm);

            println!("Collection: {}", config.qdrant.collection);
            match pipeline.indexed_points().await {
                Ok(points) => println!("Indexed points: {points}"),
                Err(e) => println!("Indexed points: unavailable ({e})"),
            }

            println!("LLM model: {}", config.llm.model);
            match llm.installed_models().await {
                Ok(models) => {
                    let available = models.iter().any(|m| m == &config.llm.model);
                    println!("Model installed: {available}");
                    println!("Available models: {}", models.join(", "));
                }
                Err(e) => println!("LLM server unreachable: {e}"),
            }

            println!("Docs dir: {}", config.chunking.docs_dir.display());
        }
    }

    Ok(())
}
