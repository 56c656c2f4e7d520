//! ragd RAG - Retrieval-augmented generation orchestrator
//!
//! Ties the pipeline together: chunked documents go in through
//! [`RagPipeline::ingest`], questions come back answered through
//! [`RagPipeline::ask`] and [`RagPipeline::ask_stream`]. The embedding
//! provider, vector index, and generation backend are injected behind
//! their seam traits, so the orchestration logic tests against
//! in-memory fakes.

pub mod llm;

pub use llm::OllamaClient;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::OnceCell;

use ragd_core::config::AppConfig;
use ragd_core::{
    AskResponse, Embedder, EmbeddingMode, GenerationBackend, GenerationRequest, IndexPoint,
    IngestReport, Result, VectorIndex, QUERY_PREFIX,
};
use ragd_loader::DocumentLoader;

/// Context placeholder used when retrieval returns nothing usable. The
/// prompt always carries a context block, even an empty-handed one.
pub const NO_CONTEXT_PLACEHOLDER: &str = "No specific context retrieved.";

/// Token budget for interactive streaming answers. Smaller than the
/// one-shot budget to keep time-to-last-token low.
const STREAM_MAX_TOKENS: u32 = 100;

/// How much of each retrieved passage the streaming preamble previews.
const PREVIEW_CHARS: usize = 300;
const PREVIEW_DOCS: usize = 2;

/// Build the generation prompt from system instruction, retrieved
/// contexts, and the user's question.
pub fn build_prompt(system: &str, contexts: &[String], question: &str) -> String {
    let context_block = contexts
        .iter()
        .map(|c| format!("- {c}"))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("System: {system}\n\nContext:\n{context_block}\n\nUser question: {question}\n\nAnswer:")
}

/// The RAG pipeline: ingest documents, answer questions.
pub struct RagPipeline {
    config: AppConfig,
    loader: DocumentLoader,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn GenerationBackend>,
    collection_ready: OnceCell<()>,
}

impl RagPipeline {
    pub fn new(
        config: AppConfig,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn GenerationBackend>,
    ) -> Self {
        let loader = DocumentLoader::from_config(&config.chunking);
        Self {
            config,
            loader,
            embedder,
            index,
            llm,
            collection_ready: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Whether the embedding provider most recently took its fallback path
    pub fn is_degraded(&self) -> bool {
        self.embedder.is_degraded()
    }

    /// Number of entries currently in the index
    pub async fn indexed_points(&self) -> Result<u64> {
        self.index.count().await
    }

    /// Collection bootstrap runs at most once per process; the recreate
    /// directive, if set, is consumed by that first call.
    async fn ensure_ready(&self) -> Result<()> {
        self.collection_ready
            .get_or_try_init(|| self.index.ensure_collection(self.embedder.dimension()))
            .await?;
        Ok(())
    }

    /// Ingest the configured documents directory.
    pub async fn ingest(&self) -> Result<IngestReport> {
        let root = self.config.chunking.docs_dir.clone();
        self.ingest_dir(&root).await
    }

    /// Chunk, embed, and index every supported file under `root`.
    /// An empty directory is a valid zero-chunk run, not an error.
    pub async fn ingest_dir(&self, root: &Path) -> Result<IngestReport> {
        self.ensure_ready().await?;

        let chunks = self.loader.load_all(root);
        if chunks.is_empty() {
            tracing::info!("no indexable content under {}", root.display());
            return Ok(IngestReport { indexed: 0 });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let batch = self.embedder.embed(&texts).await;
        if batch.mode == EmbeddingMode::Fallback {
            tracing::warn!(
                "indexing {} chunk(s) with fallback vectors; retrieval will be degraded",
                chunks.len()
            );
        }

        let points: Vec<IndexPoint> = chunks
            .iter()
            .zip(batch.vectors)
            .map(|(chunk, vector)| IndexPoint {
                id: chunk.id.clone(),
                vector,
                payload: chunk.payload(),
            })
            .collect();

        let indexed = points.len();
        self.index.upsert(points).await?;

        tracing::info!("indexed {indexed} chunk(s) from {}", root.display());
        Ok(IngestReport { indexed })
    }

    /// Embed the question and collect context strings from the nearest
    /// indexed passages. Hits without stored text degrade to a source
    /// reference; an empty result degrades to the placeholder.
    async fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<String>> {
        self.ensure_ready().await?;

        let query = self
            .embedder
            .embed_query(&format!("{QUERY_PREFIX}{question}"))
            .await;
        if query.mode == EmbeddingMode::Fallback {
            tracing::warn!("query embedded with fallback vector; retrieval order is arbitrary");
        }

        let hits = self.index.search(query.vector, top_k, None).await?;

        let mut contexts = Vec::with_capacity(hits.len());
        for hit in &hits {
            if let Some(text) = hit.text() {
                contexts.push(text.to_string());
            } else if let Some(source) = hit.source() {
                contexts.push(format!("See: {source}"));
            }
        }
        if contexts.is_empty() {
            contexts.push(NO_CONTEXT_PLACEHOLDER.to_string());
        }

        Ok(contexts)
    }

    /// Answer a question in one shot. The answer field always carries
    /// renderable text: timeouts and generation failures surface as
    /// diagnostic answers, with the retrieved sources intact.
    pub async fn ask(&self, question: &str, top_k: Option<usize>) -> Result<AskResponse> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(AskResponse {
                answer: String::new(),
                sources: Vec::new(),
            });
        }

        // A zero override means "use the configured default"; the
        // backend rejects limit 0 outright.
        let top_k = top_k
            .filter(|k| *k > 0)
            .unwrap_or(self.config.rag.top_k);
        let contexts = self.retrieve(question, top_k).await?;
        let prompt = build_prompt(&self.config.rag.system_prompt, &contexts, question);

        let llm = &self.config.llm;
        let outcome = self
            .llm
            .generate(GenerationRequest {
                model: llm.model.clone(),
                prompt,
                system: None,
                temperature: llm.temperature,
                max_tokens: llm.max_tokens,
                timeout: Duration::from_secs(llm.timeout_secs),
            })
            .await;

        if !outcome.is_completed() {
            tracing::warn!("generation did not complete: {outcome:?}");
        }

        Ok(AskResponse {
            answer: outcome.into_answer(),
            sources: contexts,
        })
    }

    /// Answer a question as a stream of renderable events: a retrieval
    /// preamble (documents found, previews, summary), then the model's
    /// tokens behind a one-time response marker. Retrieval errors
    /// propagate; generation failures end the stream with a diagnostic
    /// event instead.
    pub async fn ask_stream(&self, question: &str) -> Result<BoxStream<'static, String>> {
        let question = question.trim().to_string();
        if question.is_empty() {
            return Ok(stream::empty().boxed());
        }

        let contexts = self.retrieve(&question, self.config.rag.top_k).await?;

        let mut preamble = Vec::new();
        preamble.push(format!("🔍 **Found relevant documents for: {question}**\n\n"));
        for (i, context) in contexts.iter().take(PREVIEW_DOCS).enumerate() {
            let preview: String = context.chars().take(PREVIEW_CHARS).collect();
            preamble.push(format!("**Document {}**: {preview}...\n\n", i + 1));
        }
        preamble.push(format!(
            "📊 **Summary**: Retrieved {} relevant passages from your indexed documents.\n\n",
            contexts.len()
        ));
        preamble.push("🤖 **Attempting LLM response**...\n\n".to_string());

        let prompt = build_prompt(&self.config.rag.system_prompt, &contexts, &question);
        let llm = &self.config.llm;
        let tokens = self
            .llm
            .stream(GenerationRequest {
                model: llm.model.clone(),
                prompt,
                system: None,
                temperature: llm.temperature,
                max_tokens: STREAM_MAX_TOKENS,
                timeout: Duration::from_secs(llm.stream_timeout_secs),
            })
            .await;

        // Response marker precedes the first token only
        let tokens = tokens.enumerate().flat_map(|(i, token)| {
            let marker = (i == 0).then(|| "**LLM Response**: ".to_string());
            stream::iter(marker.into_iter().chain(std::iter::once(token)))
        });

        Ok(stream::iter(preamble).chain(tokens).boxed())
    }
}
