use clap::{Args, Parser, ValueEnum};
use ipnetwork::IpNetwork;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub auth: AuthConfig,

    #[command(flatten)]
    pub rate_limit: RateLimitConfig,

    #[command(flatten)]
    pub messaging: MessagingConfig,

    #[command(flatten)]
    pub notifications: NotificationConfig,

    #[command(flatten)]
    pub websocket: WsConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "RELAY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the public API
    #[arg(long, env = "RELAY_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Comma-separated list of CIDRs to trust for X-Forwarded-For IP extraction
    #[arg(
        long,
        env = "RELAY_TRUSTED_PROXIES",
        default_value = "10.0.0.0/8,172.16.0.0/12,192.168.0.0/16,127.0.0.1/32",
        value_delimiter = ','
    )]
    pub trusted_proxies: Vec<IpNetwork>,

    /// Port for the liveness and readiness endpoints
    #[arg(long, env = "RELAY_MGMT_PORT", default_value_t = 9090)]
    pub mgmt_port: u16,

    /// Per-request timeout for REST handlers
    #[arg(long, env = "RELAY_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Timeout for the readiness database round trip
    #[arg(long, env = "RELAY_HEALTH_DB_TIMEOUT_MS", default_value_t = 2000)]
    pub health_db_timeout_ms: u64,

    /// How long to wait for background tasks on shutdown
    #[arg(long, env = "RELAY_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct DatabaseConfig {
    /// Postgres connection URL
    #[arg(long = "database-url", env = "RELAY_DATABASE_URL")]
    pub url: String,

    #[arg(long = "db-max-connections", env = "RELAY_DB_MAX_CONNECTIONS", default_value_t = 20)]
    pub max_connections: u32,

    #[arg(long = "db-min-connections", env = "RELAY_DB_MIN_CONNECTIONS", default_value_t = 2)]
    pub min_connections: u32,

    #[arg(long = "db-acquire-timeout-secs", env = "RELAY_DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 5)]
    pub acquire_timeout_secs: u64,

    #[arg(long = "db-idle-timeout-secs", env = "RELAY_DB_IDLE_TIMEOUT_SECS", default_value_t = 600)]
    pub idle_timeout_secs: u64,

    #[arg(long = "db-max-lifetime-secs", env = "RELAY_DB_MAX_LIFETIME_SECS", default_value_t = 1800)]
    pub max_lifetime_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct AuthConfig {
    /// Secret used to verify bearer tokens (HS256)
    #[arg(long, env = "RELAY_JWT_SECRET")]
    pub jwt_secret: String,
}

#[derive(Clone, Debug, Args)]
pub struct RateLimitConfig {
    /// Requests per second allowed per client IP
    #[arg(long = "rate-limit-per-second", env = "RELAY_RATE_LIMIT_PER_SECOND", default_value_t = 10)]
    pub per_second: u32,

    /// Burst allowance per client IP
    #[arg(long = "rate-limit-burst", env = "RELAY_RATE_LIMIT_BURST", default_value_t = 40)]
    pub burst: u32,
}

#[derive(Clone, Debug, Args)]
pub struct MessagingConfig {
    /// Maximum message length in characters
    #[arg(long, env = "RELAY_MAX_CONTENT_LENGTH", default_value_t = 5000)]
    pub max_content_length: usize,

    /// Length of the last-message preview in conversation summaries
    #[arg(long, env = "RELAY_PREVIEW_LENGTH", default_value_t = 120)]
    pub preview_length: usize,
}

#[derive(Clone, Debug, Args)]
pub struct NotificationConfig {
    /// Push invalidation signals over WebSocket. Polling stays authoritative either way.
    #[arg(long, env = "RELAY_PUSH_ENABLED", default_value_t = true, action = clap::ArgAction::Set)]
    pub push_enabled: bool,

    /// Capacity of the in-process domain event bus
    #[arg(long, env = "RELAY_EVENT_BUS_CAPACITY", default_value_t = 1024)]
    pub event_bus_capacity: usize,

    /// How often to reclaim closed push channels
    #[arg(long, env = "RELAY_GC_INTERVAL_SECS", default_value_t = 60)]
    pub gc_interval_secs: u64,

    /// Default page size for notification listings
    #[arg(long, env = "RELAY_NOTIFICATION_LIST_LIMIT", default_value_t = 50)]
    pub default_list_limit: i64,

    /// Upper bound for the notification listing page size
    #[arg(long, env = "RELAY_NOTIFICATION_MAX_LIST_LIMIT", default_value_t = 200)]
    pub max_list_limit: i64,
}

#[derive(Clone, Debug, Args)]
pub struct WsConfig {
    /// Size of each channel's outbound frame buffer
    #[arg(long, env = "RELAY_WS_OUTBOUND_BUFFER_SIZE", default_value_t = 32)]
    pub outbound_buffer_size: usize,

    /// Seconds a new socket may wait before sending its authenticate frame
    #[arg(long, env = "RELAY_WS_AUTH_TIMEOUT_SECS", default_value_t = 10)]
    pub auth_timeout_secs: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// OTLP collector endpoint (gRPC). Export is disabled when unset.
    #[arg(long, env = "RELAY_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    #[arg(long, env = "RELAY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}
