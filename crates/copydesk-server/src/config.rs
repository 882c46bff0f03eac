use clap::Parser;

/// Configuration for the copydesk server.
#[derive(Parser, Debug, Clone)]
#[command(name = "copydesk-server")]
#[command(about = "Article lifecycle server for the copydesk editorial backend")]
pub struct Config {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "COPYDESK_HOST")]
    pub host: String,

    /// Port to bind to
    #[arg(long, default_value = "8700", env = "COPYDESK_PORT")]
    pub port: u16,

    /// Document store backend: memory or elastic
    #[arg(long, default_value = "memory", env = "COPYDESK_STORE")]
    pub store: StoreBackend,

    /// Elasticsearch base URL (elastic backend)
    #[arg(long, default_value = "http://127.0.0.1:9200", env = "COPYDESK_ELASTIC_URL")]
    pub elastic_url: String,

    /// Index name prefix (elastic backend)
    #[arg(long, default_value = "article", env = "COPYDESK_ELASTIC_INDEX_PREFIX")]
    pub elastic_index_prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StoreBackend {
    Memory,
    Elastic,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Elastic => write!(f, "elastic"),
        }
    }
}
