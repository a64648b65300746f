use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use medlit_model::{OpenAiChatModel, OpenAiEmbeddingProvider};
use medlit_rag::{PipelineConfig, QueryPipeline};
use medlit_server::corpus::{CorpusPaths, load_corpus};
use medlit_server::server::{AppState, ServerConfig, run_server};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let host = env_or("MEDLIT_HOST", "127.0.0.1");
    let port = std::env::var("MEDLIT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(5000);

    let data_dir = PathBuf::from(env_or("MEDLIT_DATA_DIR", "data"));
    let (index, store) = load_corpus(&CorpusPaths::from_dir(&data_dir))?;

    let timeout = std::env::var("MEDLIT_PROVIDER_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(60));

    let mut chat = OpenAiChatModel::from_env()?
        .with_model(env_or("MEDLIT_CHAT_MODEL", "gpt-4o"))
        .with_timeout(timeout)?;
    if let Ok(base_url) = std::env::var("MEDLIT_OPENAI_BASE_URL") {
        chat = chat.with_base_url(base_url);
    }

    let embedding_model = env_or("MEDLIT_EMBEDDING_MODEL", "text-embedding-3-small");
    let dimensions = if index.is_empty() { 1536 } else { index.dimensions() };
    let mut embedder = OpenAiEmbeddingProvider::from_env()?
        .with_model(embedding_model.clone(), dimensions)
        .with_timeout(timeout)?;
    if let Ok(base_url) = std::env::var("MEDLIT_OPENAI_BASE_URL") {
        embedder = embedder.with_base_url(base_url);
    }

    let pipeline = QueryPipeline::builder()
        .config(PipelineConfig::default())
        .chat_model(Arc::new(chat))
        .embedding_provider(Arc::new(embedder))
        .index(index)
        .store(store)
        .build()?;

    let state = AppState { pipeline: Arc::new(pipeline), embedding_model };
    run_server(ServerConfig { host, port }, state).await
}
