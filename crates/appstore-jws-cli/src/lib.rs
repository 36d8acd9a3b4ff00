//! # appstore-jws-cli
//!
//! Command-line front end for [`appstore_jws`].
//!
//! ```text
//! appstore-jws sign --key-id 2X9R4HXF34 --private-key SubscriptionKey.p8 \
//!     --issuer-id 57246542-96fe-1a63-e053-0824d011072a --bundle-id com.example
//! appstore-jws verify --trust-anchor AppleRootCA-G3.cer eyJhbGciOi...
//! appstore-jws notification --trust-anchor AppleRootCA-G3.cer body.json
//! appstore-jws inspect < token.txt
//! ```
//!
//! Settings come from flags, then `APPSTORE_JWS_*` environment variables,
//! then the TOML file named by `--config`.

pub mod cli;
pub mod commands;
pub mod error;
pub mod settings;

use clap::Parser;
use tracing::debug;

pub use cli::{Cli, Command};
pub use error::{CliError, CliResult};
pub use settings::Settings;

/// Parse arguments, run the command and print its output
///
/// # Errors
/// Returns any settings, I/O, signing or verification failure.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse();
    cli.init_tracing();

    let settings = Settings::load(cli.config.as_deref())?;
    debug!(?settings, "Settings loaded");

    let output = commands::execute(&cli.command, &settings)?;
    println!("{output}");
    Ok(())
}
