//! Command implementations
//!
//! Each command returns the text to print on stdout. Flags override
//! [`Settings`], which already merge the config file and environment.

use std::fs;
use std::io::Read;
use std::path::Path;

use appstore_jws::{
    ApiTokenClaims, Claims, SigningKey, TokenSigner, TokenVerifier, TrustAnchor, VerificationMode,
    VerifierConfig, decode_notification, inspect,
};
use tracing::{info, warn};

use crate::cli::{Command, NotificationArgs, SignArgs, TrustArgs, VerifyArgs};
use crate::error::{CliError, CliResult};
use crate::settings::Settings;

/// Run `command`, reading piped input from the process stdin
///
/// # Errors
/// Returns the first failure of settings resolution, file I/O, signing or
/// verification.
pub fn execute(command: &Command, settings: &Settings) -> CliResult<String> {
    execute_with_stdin(command, settings, std::io::stdin().lock())
}

fn execute_with_stdin(
    command: &Command,
    settings: &Settings,
    stdin: impl Read,
) -> CliResult<String> {
    match command {
        Command::Sign(args) => sign(args, settings),
        Command::Verify(args) => verify(args, settings, stdin),
        Command::Notification(args) => notification(args, settings, stdin),
        Command::Inspect { token } => {
            let token = read_token(token.as_deref(), stdin)?;
            Ok(serde_json::to_string_pretty(&inspect(&token)?)?)
        }
    }
}

fn sign(args: &SignArgs, settings: &Settings) -> CliResult<String> {
    let key_id = args
        .key_id
        .as_ref()
        .or(settings.key_id.as_ref())
        .ok_or(CliError::MissingSetting("key_id"))?;
    let key_path = args
        .private_key
        .as_ref()
        .or(settings.private_key_path.as_ref())
        .ok_or(CliError::MissingSetting("private_key_path"))?;

    let key = SigningKey::from_pem(&fs::read_to_string(key_path)?, key_id.as_str())?;
    let signer = TokenSigner::new(key);

    if let Some(path) = &args.claims {
        let claims: Claims = serde_json::from_str(&fs::read_to_string(path)?)?;
        info!(claims = claims.len(), "Signing claims file");
        return Ok(signer.sign(&claims)?);
    }

    let issuer_id = args
        .issuer_id
        .as_ref()
        .or(settings.issuer_id.as_ref())
        .ok_or(CliError::MissingSetting("issuer_id"))?;
    let bundle_id = args
        .bundle_id
        .as_ref()
        .or(settings.bundle_id.as_ref())
        .ok_or(CliError::MissingSetting("bundle_id"))?;
    let ttl = args.ttl.unwrap_or(settings.token_ttl_secs);

    let claims = ApiTokenClaims::new(issuer_id.as_str(), bundle_id.as_str(), ttl);
    info!(ttl = claims.ttl_secs(), "Signing App Store Server API token");
    Ok(signer.sign_api_token(&claims)?)
}

fn verify(args: &VerifyArgs, settings: &Settings, stdin: impl Read) -> CliResult<String> {
    let verifier = build_verifier(&args.trust, settings)?;
    let token = read_token(args.token.as_deref(), stdin)?;
    let claims = verifier.verify(&token)?;
    Ok(serde_json::to_string_pretty(&claims)?)
}

fn notification(
    args: &NotificationArgs,
    settings: &Settings,
    stdin: impl Read,
) -> CliResult<String> {
    let verifier = build_verifier(&args.trust, settings)?;
    let body = match args.file.as_deref() {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)?,
        _ => read_all(stdin)?,
    };
    let decoded = decode_notification(&body, &verifier)?;
    info!(
        notification_type = decoded.notification_type().unwrap_or_default(),
        subtype = decoded.subtype().unwrap_or_default(),
        "Notification decoded"
    );
    Ok(serde_json::to_string_pretty(decoded.payload())?)
}

fn build_verifier(trust: &TrustArgs, settings: &Settings) -> CliResult<TokenVerifier> {
    let mode = if trust.unverified {
        VerificationMode::Unverified
    } else {
        VerificationMode::Strict
    };
    let config = VerifierConfig::builder()
        .mode(mode)
        .max_chain_length(trust.max_chain_length.unwrap_or(settings.max_chain_length))
        .build()?;
    let verifier = TokenVerifier::from_config(&config)?;

    match trust
        .trust_anchor
        .as_ref()
        .or(settings.trust_anchor_path.as_ref())
    {
        Some(path) => Ok(verifier.with_trust_anchor(load_anchor(path)?)),
        None => {
            if mode.is_strict() {
                warn!("No trust anchor configured, only chain consistency is checked");
            }
            Ok(verifier)
        }
    }
}

/// Load a root certificate stored as PEM or raw DER (`.cer`)
fn load_anchor(path: &Path) -> CliResult<TrustAnchor> {
    let bytes = fs::read(path)?;
    let anchor = match std::str::from_utf8(&bytes) {
        Ok(text) if text.contains("-----BEGIN") => TrustAnchor::from_pem(text)?,
        _ => TrustAnchor::from_der(bytes)?,
    };
    info!(
        path = %path.display(),
        subject = %anchor.certificate().subject(),
        "Loaded trust anchor"
    );
    Ok(anchor)
}

fn read_token(arg: Option<&str>, stdin: impl Read) -> CliResult<String> {
    let token = match arg {
        Some(token) if token != "-" => token.to_string(),
        _ => read_all(stdin)?,
    };
    let token = token.trim();
    if token.is_empty() {
        return Err(CliError::InvalidArguments("no token given".into()));
    }
    Ok(token.to_string())
}

fn read_all(mut reader: impl Read) -> CliResult<String> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    Ok(buf)
}
