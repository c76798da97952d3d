//! Dataguard command-line binary.
//!
//! # Usage
//!
//! ```bash
//! # Create a 512-bit key derivation key
//! dataguard generate-key > master.key
//!
//! # Protect stdin for one hour
//! echo -n "reset-token" | dataguard --key-file master.key protect --expires-in 3600
//!
//! # Recover it
//! dataguard --key-file master.key unprotect --time-limited < payload.txt
//! ```

use std::{
    io::{self, Read, Write},
    path::PathBuf,
};

use clap::{Parser, Subcommand};
use dataguard_cli::{CliError, DEFAULT_PURPOSE, KeyOptions, Protector, generate_key};
use dataguard_crypto::{
    AuthenticatedEncryptorConfiguration, DEFAULT_MASTER_KEY_BYTES, EncryptionAlgorithm,
    ValidationAlgorithm,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

/// Dataguard authenticated encryption tool
#[derive(Parser, Debug)]
#[command(name = "dataguard")]
#[command(about = "Protect and unprotect data with authenticated encryption")]
#[command(version)]
struct Args {
    /// Hex-encoded key derivation key
    #[arg(long, env = "DATAGUARD_KEY", hide_env_values = true, global = true)]
    key_hex: Option<String>,

    /// File containing a hex-encoded key derivation key
    #[arg(long, global = true)]
    key_file: Option<PathBuf>,

    /// Encryption algorithm (AES_128_CBC ... AES_256_GCM)
    #[arg(long, default_value = "AES_256_CBC", global = true)]
    encryption: EncryptionAlgorithm,

    /// Validation algorithm for CBC (HMACSHA256, HMACSHA512)
    #[arg(long, default_value = "HMACSHA256", global = true)]
    validation: ValidationAlgorithm,

    /// Purpose string the payload is bound to
    #[arg(long, default_value = DEFAULT_PURPOSE, global = true)]
    purpose: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a new random key as hex
    GenerateKey {
        /// Key length in bytes
        #[arg(long, default_value_t = DEFAULT_MASTER_KEY_BYTES)]
        bytes: usize,
    },

    /// Protect standard input and print base64url
    Protect {
        /// Expire the payload this many seconds from now
        #[arg(long, allow_negative_numbers = true)]
        expires_in: Option<i64>,
    },

    /// Unprotect a base64url payload from standard input
    Unprotect {
        /// Payload was produced with --expires-in
        #[arg(long)]
        time_limited: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    // Move the key out of the parsed arguments so it is erased on drop.
    let key = KeyOptions {
        key_hex: args.key_hex.take().map(Zeroizing::new),
        key_file: args.key_file.take(),
    };

    run(&args, &key)?;
    Ok(())
}

fn run(args: &Args, key: &KeyOptions) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();

    let protector = |args: &Args| -> Result<Protector, CliError> {
        let config = AuthenticatedEncryptorConfiguration::new(args.encryption, args.validation);
        Protector::new(config, key.load()?, &args.purpose)
    };

    match &args.command {
        Command::GenerateKey { bytes } => {
            tracing::info!(bytes = *bytes, "generating key");
            writeln!(stdout, "{}", generate_key(*bytes).as_str())?;
        },
        Command::Protect { expires_in } => {
            let protector = protector(args)?;
            let mut plaintext = Vec::new();
            io::stdin().read_to_end(&mut plaintext)?;

            let encoded = protector.protect(&plaintext, *expires_in)?;
            writeln!(stdout, "{encoded}")?;
        },
        Command::Unprotect { time_limited } => {
            let protector = protector(args)?;
            let mut encoded = String::new();
            io::stdin().read_to_string(&mut encoded)?;

            let unprotected = protector.unprotect(&encoded, *time_limited)?;
            if let Some(expiration) = unprotected.expiration {
                tracing::info!(%expiration, "payload valid");
            }
            stdout.write_all(&unprotected.plaintext)?;
        },
    }

    stdout.flush()?;
    Ok(())
}
