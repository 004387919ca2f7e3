use anyhow::Context;
use derive_builder::Builder;

#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct Settings {
    #[builder(default = "\"sqlite:menu.db\".to_string()")]
    pub database_url: String,
    #[builder(default = "5")]
    pub max_connections: u32,
    #[builder(default = "30")]
    pub acquire_timeout_secs: u64,
    #[builder(default = "\"127.0.0.1\".to_string()")]
    pub host: String,
    #[builder(default = "8080")]
    pub port: u16,
    /// CORS origin, any origin is allowed when unset
    #[builder(setter(into, strip_option), default)]
    pub allowed_origin: Option<String>,
}

impl Settings {
    /// Read settings from the process environment, loading `.env` first if present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut builder = SettingsBuilder::default();

        if let Some(url) = lookup("DATABASE_URL") {
            builder.database_url(url);
        }
        if let Some(max) = lookup("DATABASE_MAX_CONNECTIONS") {
            let max: u32 = max
                .parse()
                .with_context(|| format!("invalid DATABASE_MAX_CONNECTIONS `{max}`"))?;
            builder.max_connections(max);
        }
        if let Some(secs) = lookup("DATABASE_ACQUIRE_TIMEOUT") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("invalid DATABASE_ACQUIRE_TIMEOUT `{secs}`"))?;
            builder.acquire_timeout_secs(secs);
        }
        if let Some(host) = lookup("HOST") {
            builder.host(host);
        }
        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .parse()
                .with_context(|| format!("invalid PORT `{port}`"))?;
            builder.port(port);
        }
        if let Some(origin) = lookup("CORS_ALLOWED_ORIGIN") {
            builder.allowed_origin(origin);
        }

        builder.build().context("fail to build settings")
    }

    /// Settings for a throwaway in-memory database
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout_secs: 5,
            host: "127.0.0.1".to_string(),
            port: 0,
            allowed_origin: None,
        }
    }
}
