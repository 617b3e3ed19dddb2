//! Provider configuration
//!
//! Read from the provider block attributes, or from `TF_VAR_`-prefixed
//! environment variables when running sweepers and checks outside a plan.

use std::collections::HashMap;
use std::time::Duration;

use cirrus_core::resource::Value;
use cirrus_core::{RetryPolicy, WaitConfig};
use thiserror::Error;

use crate::utils::{is_valid_ocid, normalize_region};

/// Service name used for Golden Gate retry settings
pub const GOLDEN_GATE_SERVICE: &str = "golden_gate";

const ENV_PREFIX: &str = "TF_VAR_";

const DEFAULT_REGION: &str = "us-phoenix-1";
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(20 * 60);
const DEFAULT_SWEEP_TIMEOUT: Duration = Duration::from_secs(3 * 60);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid type for '{key}': expected {expected}, got {found}")]
    InvalidType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

impl ConfigError {
    fn invalid_value(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Long-running operation a wait belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Sweep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub region: String,
    pub compartment_id: Option<String>,
    pub create_timeout: Duration,
    pub update_timeout: Duration,
    pub delete_timeout: Duration,
    /// Per-deployment wait used by sweepers
    pub sweep_timeout: Duration,
    pub poll_interval: Duration,
    pub default_retry: RetryPolicy,
    /// Per-service overrides of `default_retry`
    pub service_retry: HashMap<String, RetryPolicy>,
    /// Sweeper names that must not run
    pub sweep_exclude: Vec<String>,
    /// Identifiers of resources the sweepers never delete
    pub default_resource_ids: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            compartment_id: None,
            create_timeout: DEFAULT_OPERATION_TIMEOUT,
            update_timeout: DEFAULT_OPERATION_TIMEOUT,
            delete_timeout: DEFAULT_OPERATION_TIMEOUT,
            sweep_timeout: DEFAULT_SWEEP_TIMEOUT,
            poll_interval: WaitConfig::DEFAULT_POLL_INTERVAL,
            default_retry: RetryPolicy::default(),
            service_retry: HashMap::new(),
            sweep_exclude: Vec::new(),
            default_resource_ids: Vec::new(),
        }
    }
}

/// Attribute keys and whether they hold seconds, counts or lists
#[derive(Clone, Copy)]
enum Kind {
    Text,
    Number,
    List,
}

const KEYS: &[(&str, Kind)] = &[
    ("region", Kind::Text),
    ("compartment_id", Kind::Text),
    ("create_timeout_secs", Kind::Number),
    ("update_timeout_secs", Kind::Number),
    ("delete_timeout_secs", Kind::Number),
    ("sweep_timeout_secs", Kind::Number),
    ("poll_interval_secs", Kind::Number),
    ("retry_max_attempts", Kind::Number),
    ("golden_gate_retry_max_attempts", Kind::Number),
    ("sweep_exclude", Kind::List),
    ("default_resource_ids", Kind::List),
];

impl ProviderConfig {
    /// Build from provider block attributes; absent keys keep their defaults
    pub fn from_attributes(attributes: &HashMap<String, Value>) -> Result<Self, ConfigError> {
        let mut config = ProviderConfig::default();

        if let Some(region) = get_string(attributes, "region")? {
            config.region = normalize_region(region);
        }
        config.compartment_id = get_ocid(attributes, "compartment_id")?;

        for (key, slot) in [
            ("create_timeout_secs", &mut config.create_timeout),
            ("update_timeout_secs", &mut config.update_timeout),
            ("delete_timeout_secs", &mut config.delete_timeout),
            ("sweep_timeout_secs", &mut config.sweep_timeout),
            ("poll_interval_secs", &mut config.poll_interval),
        ] {
            if let Some(secs) = get_count(attributes, key)? {
                *slot = Duration::from_secs(secs);
            }
        }

        if let Some(attempts) = get_count(attributes, "retry_max_attempts")? {
            config.default_retry.max_attempts = to_attempts("retry_max_attempts", attempts)?;
        }
        if let Some(attempts) = get_count(attributes, "golden_gate_retry_max_attempts")? {
            let mut policy = config.default_retry.clone();
            policy.max_attempts = to_attempts("golden_gate_retry_max_attempts", attempts)?;
            config
                .service_retry
                .insert(GOLDEN_GATE_SERVICE.to_string(), policy);
        }

        config.sweep_exclude = get_list(attributes, "sweep_exclude")?;
        config.default_resource_ids = get_list(attributes, "default_resource_ids")?;

        Ok(config)
    }

    /// Build from the process environment (`TF_VAR_region`, `TF_VAR_compartment_id`, ...)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from `TF_VAR_`-prefixed variables resolved by `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut attributes = HashMap::new();
        for (key, kind) in KEYS {
            let Some(raw) = lookup(&format!("{}{}", ENV_PREFIX, key)) else {
                continue;
            };
            if raw.trim().is_empty() {
                continue;
            }
            let value = match kind {
                Kind::Text => Value::String(raw),
                Kind::Number => Value::Int(raw.trim().parse().map_err(|_| {
                    ConfigError::invalid_value(key, format!("'{}' is not a number", raw))
                })?),
                Kind::List => Value::List(
                    raw.split(',')
                        .map(str::trim)
                        .filter(|item| !item.is_empty())
                        .map(|item| Value::String(item.to_string()))
                        .collect(),
                ),
            };
            attributes.insert(key.to_string(), value);
        }
        Self::from_attributes(&attributes)
    }

    /// Retry policy for transient failures of `service`
    pub fn retry_policy(&self, service: &str) -> RetryPolicy {
        self.service_retry
            .get(service)
            .cloned()
            .unwrap_or_else(|| self.default_retry.clone())
    }

    /// Wait settings for an operation against `service`
    pub fn wait_config(&self, service: &str, operation: Operation) -> WaitConfig {
        let config = match operation {
            Operation::Create => WaitConfig::until_created(self.create_timeout),
            Operation::Update => WaitConfig::until_updated(self.update_timeout),
            Operation::Delete => WaitConfig::until_deleted(self.delete_timeout),
            Operation::Sweep => WaitConfig::until_deleted(self.sweep_timeout),
        };
        config
            .with_poll_interval(self.poll_interval)
            .with_retry(self.retry_policy(service))
    }

    pub fn is_sweeper_excluded(&self, name: &str) -> bool {
        self.sweep_exclude.iter().any(|excluded| excluded == name)
    }

    pub fn is_default_resource(&self, identifier: &str) -> bool {
        self.default_resource_ids.iter().any(|id| id == identifier)
    }
}

fn get_string<'a>(
    attributes: &'a HashMap<String, Value>,
    key: &str,
) -> Result<Option<&'a str>, ConfigError> {
    match attributes.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(invalid_type(key, "String", other)),
    }
}

fn get_ocid(attributes: &HashMap<String, Value>, key: &str) -> Result<Option<String>, ConfigError> {
    match get_string(attributes, key)? {
        None => Ok(None),
        Some(ocid) if is_valid_ocid(ocid) => Ok(Some(ocid.to_string())),
        Some(other) => Err(ConfigError::invalid_value(
            key,
            format!("'{}' is not an OCID", other),
        )),
    }
}

fn get_count(attributes: &HashMap<String, Value>, key: &str) -> Result<Option<u64>, ConfigError> {
    match attributes.get(key) {
        None => Ok(None),
        Some(Value::Int(n)) => u64::try_from(*n)
            .map(Some)
            .map_err(|_| ConfigError::invalid_value(key, "must not be negative")),
        Some(other) => Err(invalid_type(key, "Int", other)),
    }
}

fn get_list(attributes: &HashMap<String, Value>, key: &str) -> Result<Vec<String>, ConfigError> {
    match attributes.get(key) {
        None => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()),
        Some(Value::List(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(invalid_type(key, "List of String", other)),
            })
            .collect(),
        Some(other) => Err(invalid_type(key, "List", other)),
    }
}

fn to_attempts(key: &str, attempts: u64) -> Result<u32, ConfigError> {
    u32::try_from(attempts).map_err(|_| ConfigError::invalid_value(key, "too large"))
}

fn invalid_type(key: &str, expected: &'static str, found: &Value) -> ConfigError {
    ConfigError::InvalidType {
        key: key.to_string(),
        expected,
        found: found.type_name(),
    }
}
