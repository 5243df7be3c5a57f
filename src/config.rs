use anyhow::Context;
use axum::http::HeaderValue;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// 実行環境を表すenum
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(anyhow::anyhow!("Invalid environment: {}", s)),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Development
    }
}

impl<'de> Deserialize<'de> for Environment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Environment::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub access_key: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub env: Environment,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5050
}

impl ServerConfig {
    /// 環境に応じたallowed_originsをHeaderValueとして取得
    ///
    /// # Errors
    /// プロダクション環境でallowed_originsが設定されていない場合にエラーを返す
    pub fn get_allowed_origins(
        &self,
        addr: &std::net::SocketAddr,
    ) -> anyhow::Result<Vec<HeaderValue>> {
        let origin_strings = match self.env {
            Environment::Production => {
                if self.allowed_origins.is_empty() {
                    anyhow::bail!(
                        "Production environment requires explicit ALLOWED_ORIGINS configuration. \
                        Set ALLOWED_ORIGINS environment variable"
                    );
                }
                self.allowed_origins.clone()
            }
            Environment::Development => {
                // 開発環境: ローカルホスト関連のオリジンを許可
                let mut origins = vec![
                    format!("http://localhost:{}", addr.port()),
                    format!("http://127.0.0.1:{}", addr.port()),
                    "http://localhost:3000".to_string(),
                    format!("http://{}", addr),
                ];
                origins.extend(self.allowed_origins.clone());
                origins
            }
        };

        // 変換に失敗したものはログ出力してスキップ
        let headers: Vec<HeaderValue> = origin_strings
            .into_iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(header_value) => {
                    info!(%origin, "Allowed origin");
                    Some(header_value)
                }
                Err(e) => {
                    warn!(%origin, error = %e, "Failed to parse origin");
                    None
                }
            })
            .collect();

        if headers.is_empty() {
            anyhow::bail!("No valid CORS origins configured");
        }

        Ok(headers)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeminiConfig {
    /// 空の場合、要約リクエスト時に ConfigurationError になる
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_endpoint")]
    pub endpoint: String,
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash-001".to_string()
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_gemini_model(),
            endpoint: default_gemini_endpoint(),
        }
    }
}

impl Config {
    /// 環境変数、または Config.toml から設定を読み込む
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let lookup = |key: &str| env::var(key).ok();

        if lookup("DATABASE_URL").is_some() {
            return Self::from_lookup(lookup);
        }

        // Config.tomlから読み込む場合（ローカル開発）
        let path = path.unwrap_or(Path::new("Config.toml"));
        let config_str = fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read {}. Use environment variables or provide Config.toml",
                path.display()
            )
        })?;
        let mut config = Self::from_toml_str(&config_str)?;
        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// 環境変数から読み込む場合
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = GeminiConfig::default();
        let config = Config {
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").context("DATABASE_URL must be set")?,
                access_key: lookup("DATABASE_ACCESS_KEY")
                    .context("DATABASE_ACCESS_KEY must be set when using env vars")?,
                max_connections: match lookup("DATABASE_MAX_CONNECTIONS") {
                    Some(n) => n.parse().context("Invalid DATABASE_MAX_CONNECTIONS")?,
                    None => default_max_connections(),
                },
            },
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or_else(default_host),
                port: match lookup("SERVER_PORT") {
                    Some(port) => port.parse().context("Invalid SERVER_PORT")?,
                    None => default_port(),
                },
                env: lookup("ENVIRONMENT")
                    .and_then(|s| Environment::from_str(&s).ok())
                    .unwrap_or_default(),
                allowed_origins: lookup("ALLOWED_ORIGINS")
                    .map(|s| {
                        s.split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            logging: LoggingConfig {
                level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            },
            gemini: GeminiConfig {
                api_key: lookup("GEMINI_API_KEY").unwrap_or_default(),
                model: lookup("GEMINI_MODEL").unwrap_or(defaults.model),
                endpoint: lookup("GEMINI_ENDPOINT").unwrap_or(defaults.endpoint),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(config_str: &str) -> anyhow::Result<Self> {
        toml::from_str(config_str).context("Failed to parse Config.toml")
    }

    // 環境変数があれば優先する
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("DATABASE_ACCESS_KEY") {
            self.database.access_key = key;
        }
        if let Some(api_key) = lookup("GEMINI_API_KEY") {
            self.gemini.api_key = api_key;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// データストアの認証情報が無い場合は起動できない
    fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.trim().is_empty() {
            anyhow::bail!("Data store URL is not configured");
        }
        if self.database.access_key.trim().is_empty() {
            anyhow::bail!("Data store access key is not configured");
        }
        Ok(())
    }
}
