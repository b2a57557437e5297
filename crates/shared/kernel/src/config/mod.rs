use config::{Config, Environment, File};
use mshield_domain::ShieldConfig;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, info};

/// Prefix of environment overrides, e.g. `MSHIELD__SCORING__PHISHING_THRESHOLD=65`.
pub const ENV_PREFIX: &str = "MSHIELD";

/// Custom error type for config loading.
#[mshield_derive::mshield_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },

    #[error("Invalid configuration{}: {message}", format_context(context))]
    Invalid { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// A reusable configuration loader that combines file-based settings with environment overrides.
///
/// Layers, lowest priority first:
/// 1. **Defaults** of `T` (through `#[serde(default)]`).
/// 2. **File**: when `path` is given the file must exist; its format follows the extension
///    (TOML, JSON, YAML, ...).
/// 3. **Environment**: variables prefixed with `MSHIELD__`. Nested keys use double
///    underscores (`MSHIELD__KEYRING__ALLOW_PRIVATE_EXPORT=true` maps to
///    `keyring.allow_private_export`). Values are parsed into numbers and booleans.
///
/// # Errors
/// Returns [`ConfigError::Config`] if the file is missing or unreadable, or the merged
/// sources do not match `T`.
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    load_with_env(path, environment())
}

/// Loads a [`ShieldConfig`] and validates its numeric invariants.
///
/// # Errors
/// Returns [`ConfigError::Config`] for loading failures and [`ConfigError::Invalid`]
/// when the merged values violate a section invariant.
pub fn load_shield_config(path: Option<impl AsRef<Path>>) -> Result<ShieldConfig, ConfigError> {
    let config: ShieldConfig = load_config(path)?;
    validate(config)
}

fn validate(config: ShieldConfig) -> Result<ShieldConfig, ConfigError> {
    config.validate().map_err(|message| ConfigError::Invalid {
        message: message.into(),
        context: Some("Validating shield config".into()),
    })?;
    Ok(config)
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .convert_case(config::Case::Snake)
        .try_parsing(true)
}

fn load_with_env<T>(path: Option<impl AsRef<Path>>, env: Environment) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let mut builder = Config::builder();

    if let Some(path) = path {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading config file");
        builder = builder.add_source(File::from(path).required(true));
    } else {
        debug!("No config file given, using defaults and environment");
    }

    let config = builder
        .add_source(env)
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
