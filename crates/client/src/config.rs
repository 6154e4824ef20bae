//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CATERING_BACKEND_URL` - Base URL of the hosted backend (e.g., `https://xyz.supabase.co`)
//! - `CATERING_ANON_KEY` - Public (anon) API key sent with every request
//!
//! ## Optional
//! - `CATERING_DATA_DIR` - Directory for the local key-value store (default: `.catering`)
//! - `CATERING_HTTP_TIMEOUT_SECS` - Request timeout in seconds (default: 30)
//! - `CATERING_CATALOG_CACHE_TTL_SECS` - Menu cache lifetime in seconds (default: 300)
//! - `CATERING_CONTACT_PHONE` - Caterer's WhatsApp number (default: 6285256596234)

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default caterer contact number (international format, no `+`).
pub const DEFAULT_CONTACT_PHONE: &str = "6285256596234";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
    "ganti",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Catering client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Hosted backend connection settings
    pub backend: BackendConfig,
    /// Directory holding the local key-value store (cart, session)
    pub data_dir: PathBuf,
    /// Settings that do not depend on the backend flavour
    pub options: ClientOptions,
}

/// Hosted backend connection settings.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL; REST lives under `/rest/v1`, auth under `/auth/v1`
    pub url: Url,
    /// Public anon key
    pub anon_key: SecretString,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Backend-independent client settings.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// How long catalog lookups stay cached
    pub catalog_cache_ttl: Duration,
    /// Caterer's WhatsApp number used for order enquiries
    pub contact_phone: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            catalog_cache_ttl: Duration::from_secs(300),
            contact_phone: DEFAULT_CONTACT_PHONE.to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the anon key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let backend = BackendConfig::from_env()?;
        let data_dir = PathBuf::from(get_env_or_default("CATERING_DATA_DIR", ".catering"));
        let catalog_cache_ttl = Duration::from_secs(get_parsed_or_default(
            "CATERING_CATALOG_CACHE_TTL_SECS",
            300,
        )?);
        let contact_phone = normalize_phone(&get_env_or_default(
            "CATERING_CONTACT_PHONE",
            DEFAULT_CONTACT_PHONE,
        ))
        .ok_or_else(|| {
            ConfigError::InvalidEnvVar(
                "CATERING_CONTACT_PHONE".to_string(),
                "must contain digits only (optionally prefixed with +)".to_string(),
            )
        })?;

        Ok(Self {
            backend,
            data_dir,
            options: ClientOptions {
                catalog_cache_ttl,
                contact_phone,
            },
        })
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("CATERING_BACKEND_URL")?;
        let url = Url::parse(&raw_url).map_err(|e| {
            ConfigError::InvalidEnvVar("CATERING_BACKEND_URL".to_string(), e.to_string())
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "CATERING_BACKEND_URL".to_string(),
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        Ok(Self {
            url,
            anon_key: get_validated_secret("CATERING_ANON_KEY")?,
            timeout: Duration::from_secs(get_parsed_or_default("CATERING_HTTP_TIMEOUT_SECS", 30)?),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a numeric environment variable with a default value.
fn get_parsed_or_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Strip a leading `+` and reject anything that is not all digits.
fn normalize_phone(raw: &str) -> Option<String> {
    let digits = raw.trim().trim_start_matches('+');
    (!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())).then(|| digits.to_string())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the key from the backend dashboard."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(value.trim(), key)?;
    Ok(SecretString::from(value.trim().to_string()))
}

impl BackendConfig {
    /// The anon key, for request headers.
    pub(crate) fn anon_key(&self) -> &str {
        self.anon_key.expose_secret()
    }
}
