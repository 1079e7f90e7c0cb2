//! Construction of the shared pipeline handles from configuration.
//!
//! Every handle is built once per command and injected; nothing here is
//! global.

use std::sync::Arc;
use std::time::Duration;
use tutor_core::{config::AppConfig, AppResult};
use tutor_knowledge::embeddings::create_provider;
use tutor_knowledge::search::create_search_provider;
use tutor_knowledge::{
    config::get_index_path, AnswerSynthesizer, ExternalSearcher, Retriever, SqliteVectorIndex,
};
use tutor_llm::create_client;
use tutor_prompt::{load_prompt, PromptComposer};

/// Options a single command can layer over the `rag:` settings.
#[derive(Debug, Default, Clone)]
pub struct PipelineOverrides {
    pub base: Option<String>,
    pub top_k: Option<usize>,
    pub no_external: bool,
}

/// Resolve the knowledge base name, falling back to `rag.knowledgeBase`.
pub fn base_name<'a>(config: &'a AppConfig, base: Option<&'a str>) -> &'a str {
    base.unwrap_or(config.rag.knowledge_base.as_str())
}

/// Open the SQLite index of a knowledge base with the configured embedder.
pub fn open_index(config: &AppConfig, base: &str) -> AppResult<SqliteVectorIndex> {
    let api_key = config.resolve_embedding_api_key();
    let embedder = create_provider(&config.embedding, api_key.as_deref())?;
    let path = get_index_path(&config.workspace, base);

    tracing::debug!(
        "Opening knowledge base '{}' at {:?} ({} / {})",
        base,
        path,
        embedder.provider_name(),
        embedder.model_name()
    );

    Ok(SqliteVectorIndex::new(path, embedder))
}

/// Build the answer synthesizer and everything it depends on.
pub fn build_synthesizer(
    config: &AppConfig,
    overrides: &PipelineOverrides,
) -> AppResult<AnswerSynthesizer> {
    let base = base_name(config, overrides.base.as_deref());
    let index = open_index(config, base)?;
    let retriever =
        Retriever::new(Arc::new(index)).with_oversample_factor(config.rag.oversample_factor);

    let search_provider =
        create_search_provider(&config.search, config.resolve_search_api_key())?;
    let searcher = ExternalSearcher::new(search_provider)
        .with_timeout(Duration::from_secs(config.search.timeout_secs));

    let definition = load_prompt(&config.workspace, &config.rag.prompt_id)?;
    let composer = Arc::new(PromptComposer::new(&definition)?);

    let provider_config = config.get_provider_config(&config.provider);
    let api_key = config.resolve_api_key(&config.provider);
    let llm = create_client(
        &config.provider,
        provider_config.and_then(|pc| pc.endpoint()),
        api_key.as_deref(),
        provider_config.and_then(|pc| pc.timeout_secs()),
    )?;

    let external_search = config.search.enabled && !overrides.no_external;

    tracing::debug!(
        base,
        prompt_id = %definition.id,
        provider = %config.provider,
        model = %config.model,
        external_search,
        "Answer pipeline ready"
    );

    Ok(
        AnswerSynthesizer::new(retriever, searcher, composer, llm, config.model.as_str())
            .with_top_k(overrides.top_k.unwrap_or(config.rag.top_k))
            .with_temperature(config.rag.temperature)
            .with_external_search(external_search),
    )
}
