//! munge-tool - encode and decode MUNGE credentials.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[cfg(not(feature = "libmunge"))]
use anyhow::bail;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use munge_core::dev::DevContext;
use munge_core::{
    read_to_secret, ContextConfig, Credential, CredentialContext, CredentialError, Ttl,
};
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "munge-tool")]
#[command(about = "Encode and decode MUNGE credentials")]
#[command(version)]
struct Cli {
    /// munged socket path
    #[arg(short = 'S', long, env = "MUNGE_SOCKET")]
    socket: Option<PathBuf>,

    /// Use the in-process development service (credentials are NOT secure)
    #[arg(long, env = "MUNGE_DEV_MODE")]
    dev: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a credential
    Encode {
        /// Payload given on the command line
        #[arg(short, long, conflicts_with = "input")]
        string: Option<String>,
        /// Read the payload from a file ("-" for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Write the credential to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Time-to-live in seconds (0 for the default, -1 for the maximum)
        #[arg(short, long, env = "MUNGE_TTL", allow_negative_numbers = true)]
        ttl: Option<i32>,
        /// Cipher type id
        #[arg(long)]
        cipher: Option<i32>,
        /// MAC type id
        #[arg(long)]
        mac: Option<i32>,
        /// Compression type id
        #[arg(long)]
        zip: Option<i32>,
        /// Only this UID may decode the credential
        #[arg(long)]
        restrict_uid: Option<u32>,
        /// Only this GID may decode the credential
        #[arg(long)]
        restrict_gid: Option<u32>,
    },
    /// Validate a credential and print its contents
    Decode {
        /// Read the credential from a file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Write the payload to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// ============================================================================
// Entry Point
// ============================================================================

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("munge-tool: error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Service status as the exit code, like unmunge; 1 for everything else.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<CredentialError>()
        .and_then(CredentialError::status)
        .and_then(|status| u8::try_from(status.code()).ok())
        .filter(|&code| code != 0)
        .unwrap_or(1)
}

fn run(cli: Cli) -> Result<()> {
    if cli.dev {
        warn!("Development mode enabled - credentials are NOT secure");
        return dispatch::<DevContext>(cli);
    }

    #[cfg(feature = "libmunge")]
    return dispatch::<munge_ffi::MungeContext>(cli);

    #[cfg(not(feature = "libmunge"))]
    bail!("munge-tool was built without libmunge support; rebuild with `--features libmunge` or pass --dev");
}

// ============================================================================
// Commands
// ============================================================================

fn dispatch<C: CredentialContext>(cli: Cli) -> Result<()> {
    let mut config = ContextConfig {
        socket: cli.socket,
        ..ContextConfig::default()
    };

    match cli.command {
        Commands::Encode {
            string,
            input,
            output,
            ttl,
            cipher,
            mac,
            zip,
            restrict_uid,
            restrict_gid,
        } => {
            config.cipher = cipher;
            config.mac = mac;
            config.zip = zip;
            config.uid_restriction = restrict_uid;
            config.gid_restriction = restrict_gid;

            let ttl = ttl.map(Ttl::from_raw).transpose()?.unwrap_or_default();
            let mut payload = read_payload(string, input.as_deref())?;
            debug!(len = payload.len(), ?ttl, "encoding credential");

            let encoded = Credential::new()
                .with_payload(std::mem::take(&mut *payload))
                .with_ttl(ttl)
                .encode_with::<C>(&config)?;

            write_output(output.as_deref(), format!("{encoded}\n").as_bytes())
        }
        Commands::Decode { input, output } => {
            let raw = read_input(input.as_deref())?;
            let text = std::str::from_utf8(&raw)
                .context("credential is not valid UTF-8")?
                .trim();
            debug!(len = text.len(), "decoding credential");

            let credential = Credential::decode_with::<C>(text, &config)?;
            print_decoded(&credential, output.as_deref())
        }
    }
}

fn print_decoded(credential: &Credential, output: Option<&Path>) -> Result<()> {
    let payload = credential.payload();
    let mut stdout = io::stdout().lock();

    writeln!(stdout, "STATUS:  Success (0)")?;
    writeln!(stdout, "UID:     {}", display_id(credential.uid()))?;
    writeln!(stdout, "GID:     {}", display_id(credential.gid()))?;
    writeln!(stdout, "TTL:     {}", display_ttl(credential.ttl()))?;
    writeln!(stdout, "LENGTH:  {}", payload.len())?;

    match output {
        Some(path) => {
            fs::write(path, payload)
                .with_context(|| format!("Failed to write payload to {}", path.display()))?;
        }
        None if !payload.is_empty() => {
            writeln!(stdout)?;
            stdout.write_all(payload)?;
            writeln!(stdout)?;
        }
        None => {}
    }
    Ok(())
}

// ============================================================================
// I/O Helpers
// ============================================================================

fn read_payload(string: Option<String>, input: Option<&Path>) -> Result<Zeroizing<Vec<u8>>> {
    match (string, input) {
        (Some(string), _) => Ok(Zeroizing::new(string.into_bytes())),
        (None, Some(path)) => read_input(Some(path)),
        (None, None) => Ok(Zeroizing::new(Vec::new())),
    }
}

/// Reads a file, or stdin for `None` and `-`.
fn read_input(path: Option<&Path>) -> Result<Zeroizing<Vec<u8>>> {
    match path {
        Some(path) if path != Path::new("-") => {
            let file = fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            let size_hint = file
                .metadata()
                .ok()
                .and_then(|meta| usize::try_from(meta.len()).ok())
                .unwrap_or(0);
            read_to_secret(file, size_hint)
                .with_context(|| format!("Failed to read {}", path.display()))
        }
        _ => read_to_secret(io::stdin().lock(), 0).context("Failed to read stdin"),
    }
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => fs::write(path, bytes)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
            Ok(())
        }
    }
}

fn display_id(id: Option<u32>) -> String {
    id.map_or_else(|| "unknown".to_owned(), |id| id.to_string())
}

fn display_ttl(ttl: Ttl) -> String {
    match ttl {
        Ttl::Default => "default".to_owned(),
        Ttl::Maximum => "maximum".to_owned(),
        Ttl::Seconds(n) => n.to_string(),
    }
}
