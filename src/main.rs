use anyhow::{Context, Result};
use base64::Engine;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use pairing_identity::{
    DeleteOutcome, FileStore, Identity, IdentityConfig, IdentityStore, ImportedItem, MemoryStore,
    SecureStore, StoreConfig,
};

#[macro_use]
mod output;

// ============================================================================
// ERROR HANDLING STRATEGY
// ============================================================================
//
// CRITICAL I/O - Errors propagated with `?`:
//   • Bundle/certificate reads, config loading, store access
//
// DECORATIVE I/O - Errors ignored with `let _ =`:
//   • Terminal coloring and status lines (see output.rs)
// ============================================================================

/// Default environment variable for the bundle passphrase
const BUNDLE_PASSPHRASE_ENV: &str = "PAIRING_BUNDLE_PASSPHRASE";

#[derive(Parser)]
#[command(name = "pairing-identity")]
#[command(version, about = "Provision the client identity used for remote pairing")]
struct Cli {
    /// Path to config file (TOML); defaults to the platform config directory
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Override the credential label from the config
    #[arg(long, global = true)]
    label: Option<String>,

    /// Verbose logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a PKCS#12 bundle into the store
    Import {
        /// Path to the .p12/.pfx bundle
        #[arg(required_unless_present = "base64_env", conflicts_with = "base64_env")]
        bundle: Option<PathBuf>,

        /// Read a base64 encoded bundle from this environment variable instead of a file
        #[arg(long)]
        base64_env: Option<String>,

        /// Environment variable holding the bundle passphrase (prompted for when unset)
        #[arg(long, default_value = BUNDLE_PASSPHRASE_ENV)]
        passphrase_env: String,
    },

    /// Show the stored identity
    Show,

    /// Delete the stored identity
    Delete,

    /// Print the public key of a peer certificate (DER or PEM)
    PublicKey {
        certificate: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = match cli.config {
        Some(path) => path,
        None => IdentityConfig::default_path()
            .context("Could not determine config directory; pass --config")?,
    };
    let mut config = IdentityConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    if let Some(label) = cli.label {
        config.label = label;
    }

    let identities = IdentityStore::with_label(open_store(&config.store)?, config.label.clone());

    match cli.command {
        Command::Import {
            bundle,
            base64_env,
            passphrase_env,
        } => run_import(&identities, bundle.as_deref(), base64_env.as_deref(), &passphrase_env),
        Command::Show => run_show(&identities),
        Command::Delete => run_delete(&identities),
        Command::PublicKey { certificate } => run_public_key(&identities, &certificate),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pairing_identity={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn open_store(config: &StoreConfig) -> Result<Box<dyn SecureStore>> {
    match config {
        StoreConfig::Memory => {
            warn!("Using in-memory store; nothing will be persisted");
            Ok(Box::new(MemoryStore::new()))
        }
        StoreConfig::File(file) => {
            let passphrase = Zeroizing::new(std::env::var(&file.passphrase_env).with_context(
                || format!("Store passphrase not set (export {})", file.passphrase_env),
            )?);
            let dir = file.resolve_directory()?;
            let store = FileStore::open(&dir, &passphrase)
                .with_context(|| format!("Failed to open store at {}", dir.display()))?;
            Ok(Box::new(store))
        }
    }
}

fn run_import(
    identities: &IdentityStore<Box<dyn SecureStore>>,
    bundle: Option<&Path>,
    base64_env: Option<&str>,
    passphrase_env: &str,
) -> Result<()> {
    let bytes = read_bundle(bundle, base64_env)?;

    let passphrase = match std::env::var(passphrase_env) {
        Ok(value) => Zeroizing::new(value),
        Err(_) => prompt_passphrase()?,
    };

    let (items, outcome) = import_bundle(identities, &bytes, &passphrase)?;

    success!("Decoded {} identity item(s)", items.len());
    for item in &items {
        println!(
            "   {} ({})",
            item.identity().certificate().subject(),
            item.alias()
        );
    }

    match outcome {
        ImportOutcome::Kept(existing) => warn!(
            "An identity is already stored under '{}'; kept {}",
            identities.label(),
            existing.fingerprint()
        ),
        ImportOutcome::Stored => success!("Stored under label '{}'", identities.label()),
    }

    Ok(())
}

/// What an import did to the labeled slot.
#[derive(Debug)]
enum ImportOutcome {
    Stored,
    /// The slot was already taken; holds the identity left in place.
    Kept(Identity),
}

fn import_bundle<S: SecureStore>(
    identities: &IdentityStore<S>,
    bytes: &[u8],
    passphrase: &str,
) -> Result<(Vec<ImportedItem>, ImportOutcome)> {
    let existing = identities.lookup();
    let items = identities.import(bytes, passphrase)?;

    let outcome = match existing {
        Some(identity) => ImportOutcome::Kept(identity),
        None => ImportOutcome::Stored,
    };
    Ok((items, outcome))
}

/// Bundle bytes from a file, or from a base64 encoded environment variable.
fn read_bundle(bundle: Option<&Path>, base64_env: Option<&str>) -> Result<Zeroizing<Vec<u8>>> {
    match (bundle, base64_env) {
        (Some(path), _) => std::fs::read(path)
            .map(Zeroizing::new)
            .with_context(|| format!("Failed to read bundle {}", path.display())),
        (None, Some(var)) => {
            let encoded = Zeroizing::new(
                std::env::var(var).with_context(|| format!("{var} is not set"))?,
            );
            decode_base64_bundle(var, &encoded)
        }
        (None, None) => anyhow::bail!("Either a bundle path or --base64-env is required"),
    }
}

fn decode_base64_bundle(var: &str, encoded: &str) -> Result<Zeroizing<Vec<u8>>> {
    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map(Zeroizing::new)
        .with_context(|| format!("{var} is not valid base64"))
}

fn run_show(identities: &IdentityStore<Box<dyn SecureStore>>) -> Result<()> {
    let Some(identity) = identities.try_lookup()? else {
        error!("No identity stored under '{}'", identities.label());
        std::process::exit(1);
    };

    let cert = identity.certificate();
    let bufwtr = BufferWriter::stdout(ColorChoice::Auto);
    let mut buffer = bufwtr.buffer();

    let _ = writeln!(&mut buffer, "📋 Identity '{}'", identities.label());
    let _ = writeln!(&mut buffer, "   Subject:     {}", cert.subject());
    let _ = writeln!(&mut buffer, "   Issuer:      {}", cert.issuer());
    let _ = writeln!(&mut buffer, "   Serial:      {}", cert.serial());
    let _ = writeln!(&mut buffer, "   SHA-256:     {}", identity.fingerprint());
    let _ = writeln!(&mut buffer, "   Chain:       {} intermediate(s)", identity.chain().len());

    if cert.is_current(chrono::Utc::now()) {
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
        let _ = writeln!(&mut buffer, "   Valid until: {}", cert.not_after());
    } else {
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
        let _ = writeln!(
            &mut buffer,
            "   Not valid:   {} to {}",
            cert.not_before(),
            cert.not_after()
        );
    }
    let _ = buffer.reset();
    let _ = bufwtr.print(&buffer);

    Ok(())
}

fn run_delete(identities: &IdentityStore<Box<dyn SecureStore>>) -> Result<()> {
    match identities.try_delete()? {
        DeleteOutcome::Deleted => success!("Deleted identity '{}'", identities.label()),
        DeleteOutcome::NotFound => warn!("No identity stored under '{}'", identities.label()),
    }
    Ok(())
}

fn run_public_key(
    identities: &IdentityStore<Box<dyn SecureStore>>,
    certificate: &Path,
) -> Result<()> {
    let key = identities.extract_public_key(certificate)?;

    success!("{} public key, {} bits", key.algorithm(), key.bits());
    println!(
        "{}",
        base64::engine::general_purpose::STANDARD.encode(key.spki_der())
    );
    Ok(())
}

/// Prompt for the bundle passphrase on stdin. EOF yields an empty passphrase.
fn prompt_passphrase() -> Result<Zeroizing<String>> {
    print!("Bundle passphrase: ");
    io::stdout().flush()?;

    let mut input = Zeroizing::new(String::new());
    io::stdin().read_line(&mut input)?;

    Ok(Zeroizing::new(
        input.trim_end_matches(['\r', '\n']).to_string(),
    ))
}
