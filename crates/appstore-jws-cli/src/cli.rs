//! Command-line arguments

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// appstore-jws - ES256 tokens for the App Store Server API
///
/// Sign bearer tokens with a `.p8` key, and verify signed transactions,
/// renewal info and server notifications against Apple's certificate chain.
#[derive(Parser, Debug)]
#[command(
    name = "appstore-jws",
    version,
    about = "Sign App Store Server API tokens and verify signed payloads",
    author
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// TOML settings file
    #[arg(short, long, global = true, env = "APPSTORE_JWS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v, -vv, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a signed bearer token
    Sign(SignArgs),

    /// Verify a signed token and print its payload
    Verify(VerifyArgs),

    /// Decode a V2 server notification body and its nested tokens
    Notification(NotificationArgs),

    /// Print a token's header without verifying anything
    Inspect {
        /// Compact token, or `-` / omitted for stdin
        token: Option<String>,
    },
}

/// Arguments for `sign`
///
/// # Examples
///
/// App Store Server API bearer token:
///   appstore-jws sign --key-id 2X9R4HXF34 --private-key SubscriptionKey.p8 \
///     --issuer-id 57246542-96fe-1a63-e053-0824d011072a --bundle-id com.example
///
/// Arbitrary claims:
///   appstore-jws sign --key-id 2X9R4HXF34 --private-key key.p8 --claims claims.json
#[derive(Args, Debug, Default)]
pub struct SignArgs {
    /// Key ID published in the `kid` header
    #[arg(long)]
    pub key_id: Option<String>,

    /// PKCS#8 or SEC1 PEM private key
    #[arg(long)]
    pub private_key: Option<PathBuf>,

    /// Issuer ID (`iss`)
    #[arg(long)]
    pub issuer_id: Option<String>,

    /// Bundle ID (`bid`)
    #[arg(long)]
    pub bundle_id: Option<String>,

    /// Token lifetime in seconds, at most 3600
    #[arg(long)]
    pub ttl: Option<u64>,

    /// Sign the JSON object in this file instead of API token claims
    #[arg(long, conflicts_with_all = ["issuer_id", "bundle_id", "ttl"])]
    pub claims: Option<PathBuf>,
}

/// Trust settings shared by `verify` and `notification`
#[derive(Args, Debug, Default)]
pub struct TrustArgs {
    /// Root certificate (PEM or DER) the chain must end at
    #[arg(long)]
    pub trust_anchor: Option<PathBuf>,

    /// Largest accepted `x5c` chain
    #[arg(long)]
    pub max_chain_length: Option<usize>,

    /// Skip the chain and signature checks (testing only)
    #[arg(long)]
    pub unverified: bool,
}

/// Arguments for `verify`
#[derive(Args, Debug, Default)]
pub struct VerifyArgs {
    /// Trust configuration
    #[command(flatten)]
    pub trust: TrustArgs,

    /// Compact token, or `-` / omitted for stdin
    pub token: Option<String>,
}

/// Arguments for `notification`
#[derive(Args, Debug, Default)]
pub struct NotificationArgs {
    /// Trust configuration
    #[command(flatten)]
    pub trust: TrustArgs,

    /// File holding the JSON request body, or `-` / omitted for stdin
    pub file: Option<PathBuf>,
}

impl Cli {
    /// Install the global tracing subscriber, logging to stderr
    ///
    /// `RUST_LOG` takes precedence over `-v` and `--quiet`.
    pub fn init_tracing(&self) {
        let level = if self.quiet {
            Level::ERROR
        } else {
            match self.verbose {
                0 => Level::WARN,
                1 => Level::INFO,
                2 => Level::DEBUG,
                _ => Level::TRACE,
            }
        };

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

        // A subscriber may already be installed when embedded in tests
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    }
}
