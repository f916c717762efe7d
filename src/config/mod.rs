//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    env,
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::crud::{DEFAULT_LIST_LIMIT, ListLimits, MAX_LIST_LIMIT};
use crate::infra::http::View;

mod cli;

pub use cli::{CliArgs, CollectionArgs, Command, ServeArgs, ServeOverrides, StoreOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "skue";
const ENV_PREFIX: &str = "SKUE";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3020;
const DEFAULT_MONGODB_DATABASE: &str = "skue";
const DEFAULT_POSTGRES_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_CACHE_TTL_SECS: u64 = 120;
const MAX_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;
const DEFAULT_MEMORY_CACHE_CAPACITY: usize = 1024;
const DEFAULT_REDIS_ADDRESS: &str = "127.0.0.1:6379";

/// Environment variables understood by earlier deployments of the soccer API.
///
/// They only fill values that no other source has set.
pub mod legacy_env {
    pub const MONGODB_ADDRESS: &str = "MG_DB_ADDRESS";
    pub const MONGODB_USERNAME: &str = "MG_DB_USER";
    pub const MONGODB_PASSWORD: &str = "MG_DB_PASS";
    pub const MONGODB_DATABASE: &str = "MG_DB_DBNAME";
    pub const REDIS_PASSWORD: &str = "RCACHE_REDIS_PASS";
    pub const API_KEY: &str = "SOCCER_API_KEY";
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub store: StoreSettings,
    pub cache: CacheSettings,
    pub api: ApiSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub enum StoreSettings {
    Memory,
    MongoDb(MongoSettings),
    Postgres(PostgresSettings),
}

#[derive(Clone)]
pub struct MongoSettings {
    pub address: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: String,
}

impl std::fmt::Debug for MongoSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoSettings")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PostgresSettings {
    pub url: String,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub enum CacheBackend {
    None,
    Memory { capacity: NonZeroUsize },
    Redis(RedisSettings),
}

#[derive(Clone)]
pub struct RedisSettings {
    pub address: String,
    pub password: Option<String>,
}

impl std::fmt::Debug for RedisSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSettings")
            .field("address", &self.address)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Clone)]
pub struct ApiSettings {
    pub key: Option<String>,
    pub view: View,
    pub list_limits: ListLimits,
}

impl std::fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSettings")
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("view", &self.view)
            .field("list_limits", &self.list_limits)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_legacy_env(|name| env::var(name).ok());

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Count(args))
        | Some(Command::Drop(args))
        | Some(Command::DropIndexes(args)) => {
            raw.apply_store_overrides(&args.store)
        }
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    store: RawStoreSettings,
    cache: RawCacheSettings,
    api: RawApiSettings,
}

impl RawSettings {
    /// Fill unset values from the legacy variables, then pick MongoDB when
    /// only a legacy address is present.
    fn apply_legacy_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mongodb = &mut self.store.mongodb;

        let legacy_address = lookup(legacy_env::MONGODB_ADDRESS);
        if self.store.backend.is_none() && mongodb.address.is_none() && legacy_address.is_some() {
            self.store.backend = Some("mongodb".to_string());
        }

        fill(&mut mongodb.address, legacy_address);
        fill(&mut mongodb.username, lookup(legacy_env::MONGODB_USERNAME));
        fill(&mut mongodb.password, lookup(legacy_env::MONGODB_PASSWORD));
        fill(&mut mongodb.database, lookup(legacy_env::MONGODB_DATABASE));
        fill(
            &mut self.cache.redis.password,
            lookup(legacy_env::REDIS_PASSWORD),
        );
        fill(&mut self.api.key, lookup(legacy_env::API_KEY));
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(backend) = overrides.cache_backend.as_ref() {
            self.cache.backend = Some(backend.clone());
        }
        if let Some(ttl) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(ttl);
        }
        if let Some(view) = overrides.api_view.as_ref() {
            self.api.view = Some(view.clone());
        }

        self.apply_store_overrides(&overrides.store);
    }

    fn apply_store_overrides(&mut self, overrides: &StoreOverrides) {
        if let Some(backend) = overrides.store_backend.as_ref() {
            self.store.backend = Some(backend.clone());
        }
        if let Some(address) = overrides.mongodb_address.as_ref() {
            self.store.mongodb.address = Some(address.clone());
        }
        if let Some(url) = overrides.postgres_url.as_ref() {
            self.store.postgres.url = Some(url.clone());
        }
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            store,
            cache,
            api,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            store: build_store_settings(store)?,
            cache: build_cache_settings(cache)?,
            api: build_api_settings(api)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_store_settings(store: RawStoreSettings) -> Result<StoreSettings, LoadError> {
    let backend = normalized(store.backend).unwrap_or_else(|| "memory".to_string());

    match backend.as_str() {
        "memory" => Ok(StoreSettings::Memory),
        "mongodb" | "mongo" => {
            let RawMongoSettings {
                address,
                username,
                password,
                database,
            } = store.mongodb;
            let address = non_empty(address).ok_or_else(|| {
                LoadError::invalid("store.mongodb.address", "required for the mongodb backend")
            })?;
            let database =
                non_empty(database).unwrap_or_else(|| DEFAULT_MONGODB_DATABASE.to_string());

            Ok(StoreSettings::MongoDb(MongoSettings {
                address,
                username: non_empty(username),
                password,
                database,
            }))
        }
        "postgres" | "postgresql" => {
            let url = non_empty(store.postgres.url).ok_or_else(|| {
                LoadError::invalid("store.postgres.url", "required for the postgres backend")
            })?;
            let max_connections = non_zero_u32(
                store
                    .postgres
                    .max_connections
                    .unwrap_or(DEFAULT_POSTGRES_MAX_CONNECTIONS)
                    .into(),
                "store.postgres.max_connections",
            )?;

            Ok(StoreSettings::Postgres(PostgresSettings {
                url,
                max_connections,
            }))
        }
        other => Err(LoadError::invalid(
            "store.backend",
            format!("unknown backend `{other}` (expected memory, mongodb or postgres)"),
        )),
    }
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let ttl_seconds = cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    if ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            "must be greater than zero",
        ));
    }
    if ttl_seconds > MAX_CACHE_TTL_SECS {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            format!("must not exceed {MAX_CACHE_TTL_SECS} seconds (30 days)"),
        ));
    }
    let ttl = Duration::from_secs(ttl_seconds);

    let backend = normalized(cache.backend).unwrap_or_else(|| "none".to_string());
    let backend = match backend.as_str() {
        "none" | "off" => CacheBackend::None,
        "memory" => {
            let capacity = cache
                .memory_capacity
                .unwrap_or(DEFAULT_MEMORY_CACHE_CAPACITY);
            let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
                LoadError::invalid("cache.memory_capacity", "must be greater than zero")
            })?;
            CacheBackend::Memory { capacity }
        }
        "redis" => {
            let address = non_empty(cache.redis.address)
                .unwrap_or_else(|| DEFAULT_REDIS_ADDRESS.to_string());
            CacheBackend::Redis(RedisSettings {
                address,
                password: non_empty(cache.redis.password),
            })
        }
        other => {
            return Err(LoadError::invalid(
                "cache.backend",
                format!("unknown backend `{other}` (expected none, memory or redis)"),
            ));
        }
    };

    Ok(CacheSettings { backend, ttl })
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let view = match normalized(api.view).as_deref() {
        None | Some("json") => View::Json,
        Some("xml") => View::Xml,
        Some(other) => {
            return Err(LoadError::invalid(
                "api.view",
                format!("unknown view `{other}` (expected json or xml)"),
            ));
        }
    };

    let default = api.default_list_limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let max = api.max_list_limit.unwrap_or(MAX_LIST_LIMIT);
    if default == 0 {
        return Err(LoadError::invalid(
            "api.default_list_limit",
            "must be greater than zero",
        ));
    }
    if max < default {
        return Err(LoadError::invalid(
            "api.max_list_limit",
            format!("must be at least the default list limit ({default})"),
        ));
    }

    Ok(ApiSettings {
        key: non_empty(api.key),
        view,
        list_limits: ListLimits { default, max },
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    backend: Option<String>,
    mongodb: RawMongoSettings,
    postgres: RawPostgresSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMongoSettings {
    address: Option<String>,
    username: Option<String>,
    password: Option<String>,
    database: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPostgresSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    backend: Option<String>,
    ttl_seconds: Option<u64>,
    memory_capacity: Option<usize>,
    redis: RawRedisSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRedisSettings {
    address: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    key: Option<String>,
    view: Option<String>,
    default_list_limit: Option<u32>,
    max_list_limit: Option<u32>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn normalized(value: Option<String>) -> Option<String> {
    non_empty(value).map(|value| value.to_ascii_lowercase())
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
