use prof_rag::api::{create_router, AppState};
use prof_rag::application::{ContextAssembler, IndexService, RagPipeline};
use prof_rag::domain::StaticCorpus;
use prof_rag::infrastructure::{build_providers, logging, AppConfig, RetrievalBackend, Secrets};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let app_config = AppConfig::load()?;
    logging::init(
        &app_config.config.logging,
        "prof_rag=debug,api=debug,tower_http=debug",
    );

    let config = &app_config.config;
    let secrets = Secrets::from_env();
    info!(?secrets, backend = ?config.retrieval.backend, "configuration loaded");

    let corpus = Arc::new(StaticCorpus::load(&config.corpus.path)?);
    info!(source = corpus.source(), reviews = corpus.len(), "static corpus loaded");

    let providers = build_providers(&app_config, &secrets).await?;

    if config.retrieval.backend == RetrievalBackend::Memory {
        let report = IndexService::new(providers.embedding.clone(), providers.vector_store.clone())
            .index(corpus.reviews())
            .await?;
        info!(
            upserted = report.upserted,
            skipped = report.skipped,
            "in-memory index built"
        );
    }

    let pipeline = RagPipeline::new(
        providers.embedding,
        providers.vector_store,
        providers.llm,
        corpus,
        ContextAssembler::new(app_config.prompts.clone()),
        config.retrieval.top_k,
    )?;

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let state = AppState::new(Arc::new(pipeline), app_config.clone());
    let app = create_router(state);

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
