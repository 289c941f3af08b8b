use anyhow::Context;
use derive_builder::Builder;

#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct ApiConfig {
    #[builder(default = "String::from(\"127.0.0.1\")")]
    pub host: String,
    #[builder(default = "3000")]
    pub port: u16,
    #[builder(default = "String::from(\"sqlite:database.sqlite\")")]
    pub database_url: String,
    #[builder(default = "5")]
    pub max_connections: u32,
    #[builder(default = "tracing::Level::INFO")]
    pub log_level: tracing::Level,
}

impl ApiConfig {
    /// Read the config from process environment. Call `dotenvy::dotenv()` first
    /// if a `.env` file should be honored.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut builder = ApiConfigBuilder::default();

        if let Some(host) = lookup("FOODIE_HOST") {
            builder.host(host);
        }
        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .parse()
                .with_context(|| format!("PORT is not a valid port: {port}"))?;
            builder.port(port);
        }
        if let Some(url) = lookup("DATABASE_URL") {
            builder.database_url(url);
        }
        if let Some(max) = lookup("DATABASE_MAX_CONNECTIONS") {
            let max: u32 = max
                .parse()
                .with_context(|| format!("DATABASE_MAX_CONNECTIONS is not a number: {max}"))?;
            builder.max_connections(max);
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            let level: tracing::Level = level
                .parse()
                .with_context(|| format!("LOG_LEVEL is not a log level: {level}"))?;
            builder.log_level(level);
        }

        builder.build().context("fail to build api config")
    }
}
