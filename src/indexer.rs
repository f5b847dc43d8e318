use prof_rag::application::IndexService;
use prof_rag::domain::StaticCorpus;
use prof_rag::infrastructure::{build_providers, logging, AppConfig, RetrievalBackend, Secrets};
use tracing::info;

/// Embeds every review in the static corpus and upserts it into the
/// configured vector index.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let app_config = AppConfig::load()?;
    logging::init(&app_config.config.logging, "prof_rag=info,indexer=info");

    let config = &app_config.config;
    if config.retrieval.backend == RetrievalBackend::Memory {
        anyhow::bail!("the memory backend is rebuilt by the api server at startup; pick pinecone or qdrant to index");
    }

    let corpus = StaticCorpus::load(&config.corpus.path)?;
    info!(source = corpus.source(), reviews = corpus.len(), "static corpus loaded");

    let providers = build_providers(&app_config, &Secrets::from_env()).await?;
    let report = IndexService::new(providers.embedding, providers.vector_store)
        .index(corpus.reviews())
        .await?;

    info!(
        upserted = report.upserted,
        skipped = report.skipped,
        "indexing finished"
    );

    if report.upserted == 0 && !corpus.is_empty() {
        anyhow::bail!("no reviews were indexed");
    }

    Ok(())
}
