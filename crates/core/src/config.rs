use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `SMS_MAILER__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub mailing: MailingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Directory holding `index.html` and the frontend assets.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
    /// Answer every call with canned provider responses instead of hitting the network.
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
    /// Per-call deadline. Unset keeps the transport default.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailingConfig {
    /// Recipients every `/send/` mailing goes to. The request does not carry them.
    /// Accepts a comma-separated string or a list; phones are kept verbatim.
    #[serde(
        default = "default_fallback_recipients",
        deserialize_with = "deserialize_recipients"
    )]
    pub fallback_recipients: Vec<String>,
    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    5000
}
fn default_static_dir() -> String {
    "frontend".to_string()
}
fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}
fn default_key_prefix() -> String {
    "sms".to_string()
}
fn default_gateway_base_url() -> String {
    "https://smsc.ru/sys".to_string()
}
fn default_dry_run() -> bool {
    true
}
fn default_fallback_recipients() -> Vec<String> {
    vec!["79778838763".to_string()]
}
fn default_sync_interval_ms() -> u64 {
    1000
}
fn default_metrics_port() -> u16 {
    9091
}

fn deserialize_recipients<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Recipients {
        Joined(String),
        List(Vec<String>),
    }

    let recipients = match Recipients::deserialize(deserializer)? {
        Recipients::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        Recipients::List(list) => list,
    };
    Ok(recipients
        .into_iter()
        .map(|phone| phone.trim().to_string())
        .filter(|phone| !phone.is_empty())
        .collect())
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            password: None,
            key_prefix: default_key_prefix(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_base_url(),
            login: String::new(),
            password: String::new(),
            dry_run: default_dry_run(),
            timeout_ms: None,
        }
    }
}

impl Default for MailingConfig {
    fn default() -> Self {
        Self {
            fallback_recipients: default_fallback_recipients(),
            sync_interval_ms: default_sync_interval_ms(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug: false,
            api: ApiConfig::default(),
            redis: RedisConfig::default(),
            gateway: GatewayConfig::default(),
            mailing: MailingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::from_environment(None)
    }

    /// Values stay strings here; numbers and flags are converted per field,
    /// so phones like `+7...` or `0123` survive intact.
    fn from_environment(
        vars: Option<config::Map<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("SMS_MAILER")
                .separator("__")
                .source(vars),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Reject settings the service cannot start with.
    pub fn validate(&self) -> Result<(), crate::MailerError> {
        if self.mailing.fallback_recipients.iter().all(|r| r.trim().is_empty()) {
            return Err(crate::MailerError::Config(
                "mailing.fallback_recipients must name at least one phone".to_string(),
            ));
        }
        if self.mailing.sync_interval_ms == 0 {
            return Err(crate::MailerError::Config(
                "mailing.sync_interval_ms must be positive".to_string(),
            ));
        }
        if !self.gateway.dry_run && (self.gateway.login.is_empty() || self.gateway.password.is_empty()) {
            return Err(crate::MailerError::Config(
                "gateway.login and gateway.password are required unless gateway.dry_run is set"
                    .to_string(),
            ));
        }
        Ok(())
    }
}
