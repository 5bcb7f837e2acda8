use std::env;
use std::path::PathBuf;

/// Filesystem locations used by the backend.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub db_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let data_dir = env::var("AGENTBOX_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let log_dir = data_dir.join("logs");
        let db_path = data_dir.join("agentbox.db");

        Self {
            data_dir,
            log_dir,
            db_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide configuration, built once in `main` and passed explicitly.
///
/// Core logic never reads the environment; everything it needs arrives
/// through this value.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Fixed embedding width; every vector in the store must match it.
    pub embedding_dimension: usize,
    pub embedding_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub temperature: f64,
    pub max_tokens: u32,
    pub max_upload_bytes: usize,
    pub requests_per_minute: u32,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub anthropic_api_key: String,
    pub anthropic_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            embedding_dimension: 1536,
            embedding_model: "text-embedding-3-small".to_string(),
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 3,
            temperature: 0.7,
            max_tokens: 1000,
            max_upload_bytes: 1024 * 1024,
            requests_per_minute: 100,
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com".to_string(),
            anthropic_api_key: String::new(),
            anthropic_base_url: "https://api.anthropic.com".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(dim) = env_parse::<usize>("AGENTBOX_EMBEDDING_DIMENSION") {
            config.embedding_dimension = dim;
        }
        if let Ok(model) = env::var("AGENTBOX_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Some(size) = env_parse::<usize>("AGENTBOX_CHUNK_SIZE") {
            config.chunk_size = size;
        }
        if let Some(overlap) = env_parse::<usize>("AGENTBOX_CHUNK_OVERLAP") {
            config.chunk_overlap = overlap;
        }
        if let Some(top_k) = env_parse::<usize>("AGENTBOX_TOP_K") {
            config.top_k = top_k;
        }
        if let Some(rpm) = env_parse::<u32>("AGENTBOX_REQUESTS_PER_MINUTE") {
            config.requests_per_minute = rpm;
        }
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            config.openai_api_key = key;
        }
        if let Ok(url) = env::var("OPENAI_BASE_URL") {
            config.openai_base_url = url;
        }
        if let Ok(key) = env::var("ANTHROPIC_API_KEY") {
            config.anthropic_api_key = key;
        }
        if let Ok(url) = env::var("ANTHROPIC_BASE_URL") {
            config.anthropic_base_url = url;
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|val| val.parse().ok())
}
