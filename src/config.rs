//! Strongly-typed configuration for the operator pipeline.
//!
//! Configuration is constructed once at process start, either from defaults
//! or from environment variables (with optional `.env` support), and is
//! immutable for the process lifetime. The provider credential is a secret:
//! the hand-written `Debug` impl only reports whether one is present.

use std::env;
use std::fmt;
use std::num::ParseIntError;
use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default endpoint for the direct provider (single fixed vendor).
pub const DEFAULT_DIRECT_API_URL: &str = "https://api.deepseek.com/v1";
/// Default endpoint for the routed provider (cost-routing aggregator).
pub const DEFAULT_ROUTED_API_URL: &str = "https://openrouter.ai/api/v1";
/// Default endpoint for the local provider (same-host inference server).
pub const DEFAULT_LOCAL_API_URL: &str = "http://localhost:11434/v1";

/// Default per-request network timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
/// Default action step budget per task invocation.
pub const DEFAULT_STEP_BUDGET: u32 = 5;

/// Shared logger callback signature used by the configuration.
pub type LoggerCallback = Arc<dyn Fn(&str) + Send + Sync + 'static>;

/// Which language-model backend the translator talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// One fixed vendor endpoint with one API key.
    Direct,
    /// Aggregator endpoint that fans out per declared routing preferences.
    Routed,
    /// Same-host inference server; no credential required.
    Local,
}

impl Default for ProviderKind {
    fn default() -> Self {
        ProviderKind::Direct
    }
}

impl ProviderKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "direct" => Some(ProviderKind::Direct),
            "routed" => Some(ProviderKind::Routed),
            "local" => Some(ProviderKind::Local),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Direct => "direct",
            ProviderKind::Routed => "routed",
            ProviderKind::Local => "local",
        }
    }

    /// Default chat endpoint for this provider kind.
    pub fn default_endpoint(self) -> &'static str {
        match self {
            ProviderKind::Direct => DEFAULT_DIRECT_API_URL,
            ProviderKind::Routed => DEFAULT_ROUTED_API_URL,
            ProviderKind::Local => DEFAULT_LOCAL_API_URL,
        }
    }

    /// Default model identifier for this provider kind.
    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Direct => "deepseek-reasoner",
            ProviderKind::Routed => "deepseek/deepseek-chat",
            ProviderKind::Local => "llama3.1",
        }
    }

    /// Vendor-specific credential variable consulted after `OPERATOR_API_KEY`.
    pub fn credential_env_var(self) -> Option<&'static str> {
        match self {
            ProviderKind::Direct => Some("DEEPSEEK_API_KEY"),
            ProviderKind::Routed => Some("OPENROUTER_API_KEY"),
            ProviderKind::Local => None,
        }
    }
}

/// Verbosity level for operator logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Minimal,
    Medium,
    Detailed,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Medium
    }
}

impl Verbosity {
    pub fn as_u8(self) -> u8 {
        match self {
            Verbosity::Minimal => 0,
            Verbosity::Medium => 1,
            Verbosity::Detailed => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Verbosity::Minimal),
            1 => Some(Verbosity::Medium),
            2 => Some(Verbosity::Detailed),
            _ => None,
        }
    }
}

/// Routing preferences forwarded to the aggregator as request metadata.
///
/// The client never inspects these; they ride along with each request so the
/// aggregator can pick an underlying vendor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct RoutingPreferences {
    /// Ordered vendor names to try first.
    #[serde(alias = "order")]
    pub vendor_order: Vec<String>,
    /// Ask the aggregator to rank candidates by price.
    pub sort_by_price: bool,
    /// Permit falling back to any vendor when the ordered list is exhausted.
    pub allow_fallbacks: bool,
}

impl RoutingPreferences {
    /// Render as the aggregator's `provider` request-metadata object.
    pub fn to_request_metadata(&self) -> serde_json::Value {
        let mut metadata = serde_json::Map::new();
        if !self.vendor_order.is_empty() {
            metadata.insert(
                "order".to_string(),
                serde_json::Value::Array(
                    self.vendor_order
                        .iter()
                        .map(|vendor| serde_json::Value::String(vendor.clone()))
                        .collect(),
                ),
            );
        }
        if self.sort_by_price {
            metadata.insert("sort".to_string(), serde_json::Value::String("price".into()));
        }
        metadata.insert(
            "allow_fallbacks".to_string(),
            serde_json::Value::Bool(self.allow_fallbacks),
        );
        serde_json::Value::Object(metadata)
    }
}

/// Configuration values for one operator process.
#[derive(Clone)]
pub struct OperatorConfig {
    pub provider_kind: ProviderKind,
    pub model_id: String,
    /// Provider credential; `None` is only valid for [`ProviderKind::Local`].
    pub credential: Option<String>,
    pub base_endpoint: String,
    pub request_timeout: Duration,
    pub routing: Option<RoutingPreferences>,
    /// Optional per-site planner hints (known selectors etc.); configuration,
    /// not code, so they can be swapped per target site.
    pub site_hints: Option<String>,
    pub step_budget: u32,
    pub verbose: Verbosity,
    pub logger: Option<LoggerCallback>,
    pub headless: bool,
    pub chrome_executable: Option<String>,
    /// Attach to an already-running browser over CDP instead of launching.
    pub cdp_url: Option<String>,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        let provider_kind = ProviderKind::default();
        OperatorConfig {
            provider_kind,
            model_id: provider_kind.default_model().to_string(),
            credential: None,
            base_endpoint: provider_kind.default_endpoint().to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            routing: None,
            site_hints: None,
            step_budget: DEFAULT_STEP_BUDGET,
            verbose: Verbosity::default(),
            logger: None,
            headless: true,
            chrome_executable: None,
            cdp_url: None,
        }
    }
}

impl OperatorConfig {
    /// Construct a configuration for the given provider kind with that kind's
    /// default endpoint and model.
    pub fn for_provider(kind: ProviderKind) -> Self {
        OperatorConfig {
            provider_kind: kind,
            model_id: kind.default_model().to_string(),
            base_endpoint: kind.default_endpoint().to_string(),
            ..OperatorConfig::default()
        }
    }

    /// Build a configuration from environment variables, after loading a
    /// `.env` file if present.
    pub fn from_env() -> Result<Self, OperatorConfigError> {
        let _ = dotenv();

        let provider_kind = match env_var("OPERATOR_PROVIDER") {
            Some(value) => ProviderKind::parse(&value).ok_or_else(|| {
                OperatorConfigError::invalid_enum("OPERATOR_PROVIDER", value.clone())
            })?,
            None => ProviderKind::default(),
        };

        let mut config = OperatorConfig::for_provider(provider_kind);

        if let Some(value) = env_var("OPERATOR_MODEL") {
            config.model_id = value;
        }

        config.credential = env_var("OPERATOR_API_KEY").or_else(|| {
            provider_kind
                .credential_env_var()
                .and_then(env_var)
        });

        if let Some(value) = env_var("OPERATOR_BASE_URL") {
            config.base_endpoint = value;
        }

        if let Some(value) = env_var("OPERATOR_TIMEOUT_SECS") {
            config.request_timeout =
                Duration::from_secs(parse_u64("OPERATOR_TIMEOUT_SECS", &value)?);
        }

        if let Some(value) = env_var("OPERATOR_STEP_BUDGET") {
            let budget = parse_u32("OPERATOR_STEP_BUDGET", &value)?;
            if budget == 0 {
                return Err(OperatorConfigError::InvalidEnumVariant {
                    field: "OPERATOR_STEP_BUDGET",
                    value,
                });
            }
            config.step_budget = budget;
        }

        if let Some(value) = env_var("OPERATOR_SITE_HINTS") {
            config.site_hints = Some(value);
        }

        if let Some(value) = env_var("OPERATOR_VERBOSE") {
            let parsed = parse_u8("OPERATOR_VERBOSE", &value)?;
            config.verbose = Verbosity::from_u8(parsed).ok_or_else(|| {
                OperatorConfigError::invalid_enum("OPERATOR_VERBOSE", parsed.to_string())
            })?;
        }

        if let Some(value) = env_var("OPERATOR_HEADLESS") {
            config.headless = parse_bool("OPERATOR_HEADLESS", &value)?;
        }

        if let Some(value) = env_var("OPERATOR_CHROME_BIN") {
            config.chrome_executable = Some(value);
        }

        if let Some(value) = env_var("OPERATOR_CDP_URL") {
            config.cdp_url = Some(value);
        }

        let order = env_var("OPERATOR_ROUTING_ORDER");
        let sort_by_price = match env_var("OPERATOR_ROUTE_SORT_PRICE") {
            Some(value) => parse_bool("OPERATOR_ROUTE_SORT_PRICE", &value)?,
            None => false,
        };
        let allow_fallbacks = match env_var("OPERATOR_ROUTE_ALLOW_FALLBACKS") {
            Some(value) => parse_bool("OPERATOR_ROUTE_ALLOW_FALLBACKS", &value)?,
            None => true,
        };

        if provider_kind == ProviderKind::Routed {
            config.routing = Some(RoutingPreferences {
                vendor_order: order
                    .map(|list| {
                        list.split(',')
                            .map(|vendor| vendor.trim().to_string())
                            .filter(|vendor| !vendor.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
                sort_by_price,
                allow_fallbacks,
            });
        }

        Ok(config)
    }

    /// Whether this configuration is expected to carry a credential.
    pub fn requires_credential(&self) -> bool {
        self.provider_kind != ProviderKind::Local
    }
}

impl fmt::Debug for OperatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorConfig")
            .field("provider_kind", &self.provider_kind)
            .field("model_id", &self.model_id)
            .field("credential_present", &self.credential.is_some())
            .field("base_endpoint", &self.base_endpoint)
            .field("request_timeout", &self.request_timeout)
            .field("routing", &self.routing)
            .field("site_hints", &self.site_hints)
            .field("step_budget", &self.step_budget)
            .field("verbose", &self.verbose)
            .field("logger_present", &self.logger.is_some())
            .field("headless", &self.headless)
            .field("chrome_executable", &self.chrome_executable)
            .field("cdp_url", &self.cdp_url)
            .finish()
    }
}

/// Errors that can arise while constructing an [`OperatorConfig`].
#[derive(Debug, Error)]
pub enum OperatorConfigError {
    #[error("invalid value '{value}' for {field}")]
    InvalidEnumVariant { field: &'static str, value: String },
    #[error("invalid boolean '{value}' for {field}")]
    InvalidBool { field: &'static str, value: String },
    #[error("invalid number '{value}' for {field}: {source}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

impl OperatorConfigError {
    fn invalid_enum(field: &'static str, value: String) -> Self {
        OperatorConfigError::InvalidEnumVariant { field, value }
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_bool(field: &'static str, value: &str) -> Result<bool, OperatorConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(OperatorConfigError::InvalidBool {
            field,
            value: value.to_string(),
        }),
    }
}

fn parse_u8(field: &'static str, value: &str) -> Result<u8, OperatorConfigError> {
    value
        .trim()
        .parse::<u8>()
        .map_err(|source| OperatorConfigError::InvalidNumber {
            field,
            value: value.to_string(),
            source,
        })
}

fn parse_u32(field: &'static str, value: &str) -> Result<u32, OperatorConfigError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|source| OperatorConfigError::InvalidNumber {
            field,
            value: value.to_string(),
            source,
        })
}

fn parse_u64(field: &'static str, value: &str) -> Result<u64, OperatorConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|source| OperatorConfigError::InvalidNumber {
            field,
            value: value.to_string(),
            source,
        })
}
