//! Layered settings
//!
//! Sources, lowest precedence first: an optional TOML file given with
//! `--config`, then `APPSTORE_JWS_*` environment variables. Command-line flags
//! are applied on top by each command.
//!
//! Nothing here can relax verification. Skipping the chain and signature
//! checks takes `--unverified` on the individual invocation.

use std::path::{Path, PathBuf};

use appstore_jws::DEFAULT_MAX_CHAIN_LENGTH;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::CliResult;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "APPSTORE_JWS";

/// Settings shared by all commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Key ID from App Store Connect, published as `kid`
    #[serde(default)]
    pub key_id: Option<String>,

    /// Path to the `.p8` private key
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,

    /// Issuer ID from App Store Connect
    #[serde(default)]
    pub issuer_id: Option<String>,

    /// Bundle ID of the app
    #[serde(default)]
    pub bundle_id: Option<String>,

    /// Bearer token lifetime, 0 for the maximum
    #[serde(default)]
    pub token_ttl_secs: u64,

    /// Root certificate that verified chains must end at
    #[serde(default)]
    pub trust_anchor_path: Option<PathBuf>,

    /// Largest accepted `x5c` chain
    #[serde(default = "default_max_chain_length")]
    pub max_chain_length: usize,
}

fn default_max_chain_length() -> usize {
    DEFAULT_MAX_CHAIN_LENGTH
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            key_id: None,
            private_key_path: None,
            issuer_id: None,
            bundle_id: None,
            token_ttl_secs: 0,
            trust_anchor_path: None,
            max_chain_length: default_max_chain_length(),
        }
    }
}

impl Settings {
    /// Load from `config_file` (if any) and the process environment
    ///
    /// # Errors
    /// Returns [`CliError::Config`](crate::error::CliError::Config) if the file
    /// is missing or unparsable, or a value has the wrong type.
    pub fn load(config_file: Option<&Path>) -> CliResult<Self> {
        Self::load_with(config_file, environment())
    }

    pub(crate) fn load_with(config_file: Option<&Path>, env: Environment) -> CliResult<Self> {
        let mut builder = Config::builder();
        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        let settings = builder.add_source(env).build()?.try_deserialize()?;
        Ok(settings)
    }
}

pub(crate) fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
