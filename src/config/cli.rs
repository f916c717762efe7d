use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the soccer sample server.
#[derive(Debug, Parser)]
#[command(name = "soccer", version, about = "Soccer players and teams over a CRUD REST API")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "SKUE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP API.
    Serve(Box<ServeArgs>),
    /// Print the number of documents stored in a collection.
    Count(CollectionArgs),
    /// Remove every document from a collection.
    Drop(CollectionArgs),
    /// Drop the secondary indexes of a collection; they are rebuilt on the next `serve`.
    DropIndexes(CollectionArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct CollectionArgs {
    #[command(flatten)]
    pub store: StoreOverrides,

    /// Collection name, e.g. `players`.
    #[arg(value_name = "COLLECTION")]
    pub collection: String,
}

#[derive(Debug, Args, Default, Clone)]
pub struct StoreOverrides {
    /// Override the store backend (memory|mongodb|postgres).
    #[arg(long = "store-backend", value_name = "BACKEND")]
    pub store_backend: Option<String>,

    /// Override the MongoDB address (host:port).
    #[arg(long = "mongodb-address", value_name = "HOST:PORT")]
    pub mongodb_address: Option<String>,

    /// Override the PostgreSQL connection URL.
    #[arg(long = "postgres-url", value_name = "URL")]
    pub postgres_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub store: StoreOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the cache backend (none|memory|redis).
    #[arg(long = "cache-backend", value_name = "BACKEND")]
    pub cache_backend: Option<String>,

    /// Override the cache entry time-to-live.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Override the response format (json|xml).
    #[arg(long = "api-view", value_name = "FORMAT")]
    pub api_view: Option<String>,
}
