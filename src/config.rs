use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ReportError, Result};

/// Environment variable overriding `secret_key`
pub const ENV_SECRET_KEY: &str = "BRZ_SECRET_KEY";
/// Environment variable overriding `agency_value`
pub const ENV_AGENCY_VALUE: &str = "BRZ_AGENCY_VALUE";

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Key for all token computations
///
/// The bytes are wiped when the key is dropped and never appear in `Debug`
/// output.
#[derive(Clone, Default, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(from = "String")]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for SecretKey {
    fn from(value: String) -> Self {
        SecretKey(value.into_bytes())
    }
}

impl From<&str> for SecretKey {
    fn from(value: &str) -> Self {
        SecretKey(value.as_bytes().to_vec())
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(<{} bytes>)", self.0.len())
    }
}

/// Process-wide report configuration
///
/// Read once at startup from a TOML secrets file and then shared read-only
/// with every request. The keys match the dashboard's secrets file:
///
/// ```toml
/// secret_key = "..."
/// agency_value = "..."
/// spreadsheet_name = "Delivery"
/// sheet_name = "Daily"
/// spreadsheet_campaigns = "Campaigns"
/// sheet_campaigns = "Active"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Shared secret used as the HMAC key
    #[serde(default)]
    pub secret_key: SecretKey,

    /// Sentinel identity whose token grants the full report
    #[serde(default)]
    pub agency_value: String,

    /// Spreadsheet holding the delivery rows
    pub spreadsheet_name: String,

    /// Worksheet inside `spreadsheet_name`
    pub sheet_name: String,

    /// Spreadsheet holding campaign metadata
    pub spreadsheet_campaigns: String,

    /// Worksheet inside `spreadsheet_campaigns`
    pub sheet_campaigns: String,

    /// Root directory of the CSV sheet source
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

impl Config {
    /// Parse a configuration from TOML text without validating it.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load, override from the process environment and validate
    ///
    /// # Arguments
    /// * `path` - Path to the TOML secrets file
    ///
    /// # Returns
    /// * `Result<Config>` - A configuration with a non-empty secret and agency value
    ///
    /// # Errors
    /// * `ReportError::Io` if the file cannot be read
    /// * `ReportError::Toml` if it is not valid TOML for this structure
    /// * `ReportError::MissingConfig` if the secret or the agency value is empty
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&contents)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        log::info!(
            "Loaded configuration from {} (data source {}/{})",
            path.display(),
            config.spreadsheet_name,
            config.sheet_name
        );
        Ok(config)
    }

    /// Replace the secret and the agency value with non-empty values from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup(ENV_SECRET_KEY).filter(|v| !v.is_empty()) {
            self.secret_key = SecretKey::from(secret);
        }
        if let Some(agency) = lookup(ENV_AGENCY_VALUE).filter(|v| !v.is_empty()) {
            self.agency_value = agency;
        }
    }

    /// Fail fast on values the token validator cannot work without.
    pub fn validate(&self) -> Result<()> {
        if self.secret_key.is_empty() {
            return Err(ReportError::MissingConfig { key: "secret_key" });
        }
        if self.agency_value.trim().is_empty() {
            return Err(ReportError::MissingConfig { key: "agency_value" });
        }
        for (key, value) in [
            ("spreadsheet_name", &self.spreadsheet_name),
            ("sheet_name", &self.sheet_name),
            ("spreadsheet_campaigns", &self.spreadsheet_campaigns),
            ("sheet_campaigns", &self.sheet_campaigns),
        ] {
            if value.trim().is_empty() {
                return Err(ReportError::MissingConfig { key });
            }
        }
        Ok(())
    }
}
