//! krbtab CLI
//!
//! Inspect and edit keytab files.

use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use krbtab::crypto::{enctype, nfold};
use krbtab::keytab::FormatVersion;
use krbtab::{Config, EntrySelector, FileKeytab, Keyblock, KeytabEntry, KeytabError, Principal};
use tracing_subscriber::{fmt, EnvFilter};

/// krbtab
#[derive(Parser, Debug)]
#[command(name = "krbtab")]
#[command(about = "Manage Kerberos keytab files")]
#[command(version)]
struct Args {
    /// Keytab name (FILE:path, WRFILE:path, JAVA14:path or a plain path)
    #[arg(short, long, default_value = "FILE:/etc/krb5.keytab")]
    keytab: String,

    /// Realm for principal names given without @REALM
    #[arg(short, long)]
    realm: Option<String>,

    /// Write version 1 files when creating a keytab
    #[arg(long)]
    v1: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List keytab entries
    List {
        /// Also print key material
        #[arg(long)]
        keys: bool,
    },

    /// Add a key
    Add {
        /// Principal name
        principal: String,

        /// Key version number
        #[arg(long)]
        kvno: u32,

        /// Encryption type (name or number)
        #[arg(long)]
        enctype: String,

        /// Key material as hex
        #[arg(long)]
        key: String,

        /// Creation time in seconds since the epoch (default: now)
        #[arg(long)]
        timestamp: Option<u32>,

        /// Entry flags
        #[arg(long, default_value = "0")]
        flags: u32,
    },

    /// Remove matching keys
    Remove {
        /// Principal name
        principal: String,

        /// Only this key version
        #[arg(long)]
        kvno: Option<u32>,

        /// Only this encryption type
        #[arg(long)]
        enctype: Option<String>,
    },

    /// Show the matching key with the highest version
    Get {
        /// Principal name
        principal: String,

        /// Only this key version
        #[arg(long)]
        kvno: Option<u32>,

        /// Only this encryption type
        #[arg(long)]
        enctype: Option<String>,
    },

    /// Erase and delete the keytab file
    Destroy,

    /// Fold a string to the given number of bits
    Nfold {
        /// Input string
        input: String,

        /// Output size in bits
        bits: usize,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,krbtab=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut builder = Config::builder().default_keytab(&args.keytab);
    if let Some(realm) = &args.realm {
        builder = builder.default_realm(realm);
    }
    if args.v1 {
        builder = builder.new_file_version(FormatVersion::V1);
    }
    let config = builder.build();

    if let Err(e) = run(&config, args.command) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: &Config, command: Commands) -> krbtab::Result<()> {
    let keytab = FileKeytab::from_config(config)?;

    match command {
        Commands::List { keys } => {
            println!("Keytab name: {}", keytab.full_name());
            println!("{:>5}  {:<28}  {:<10}  Principal", "Vno", "Type", "Timestamp");
            for entry in keytab.entries()? {
                print_entry(&entry, keys);
            }
        }
        Commands::Add {
            principal,
            kvno,
            enctype,
            key,
            timestamp,
            flags,
        } => {
            let principal = parse_principal(config, &principal)?;
            let keytype = parse_enctype(&enctype)?;
            let value = hex::decode(key.trim())
                .map_err(|e| KeytabError::InvalidInput(format!("key is not hex: {}", e)))?;
            let timestamp = match timestamp {
                Some(timestamp) => timestamp,
                None => now()?,
            };

            let entry = KeytabEntry::new(principal, kvno, Keyblock::new(keytype, value))
                .with_timestamp(timestamp)
                .with_flags(flags);
            keytab.add(&entry)?;
            tracing::info!("added {} kvno {} to {}", entry.principal, kvno, keytab.full_name());
        }
        Commands::Remove {
            principal,
            kvno,
            enctype,
        } => {
            let selector = selector(config, &principal, kvno, enctype.as_deref())?;
            let removed = keytab.remove(&selector)?;
            tracing::info!("removed {} entries from {}", removed, keytab.full_name());
        }
        Commands::Get {
            principal,
            kvno,
            enctype,
        } => {
            let selector = selector(config, &principal, kvno, enctype.as_deref())?;
            print_entry(&keytab.get_entry(&selector)?, false);
        }
        Commands::Destroy => {
            let name = keytab.full_name();
            keytab.destroy()?;
            tracing::info!("destroyed {}", name);
        }
        Commands::Nfold { input, bits } => {
            let folded = nfold(input.as_bytes(), bits)?;
            println!("{}", hex::encode(&*folded));
        }
    }
    Ok(())
}

fn print_entry(entry: &KeytabEntry, keys: bool) {
    let keytype = enctype::name(entry.keyblock.keytype)
        .map(str::to_string)
        .unwrap_or_else(|| format!("unknown-{}", entry.keyblock.keytype));
    print!(
        "{:>5}  {:<28}  {:<10}  {}",
        entry.kvno, keytype, entry.timestamp, entry.principal
    );
    if keys {
        print!("  ({})", hex::encode(&*entry.keyblock.value));
    }
    println!();
}

fn parse_principal(config: &Config, name: &str) -> krbtab::Result<Principal> {
    Principal::parse(name, config.default_realm.as_deref())
}

fn parse_enctype(name: &str) -> krbtab::Result<i16> {
    enctype::parse(name).ok_or_else(|| KeytabError::InvalidInput(format!("unknown enctype {:?}", name)))
}

fn selector(
    config: &Config,
    principal: &str,
    kvno: Option<u32>,
    enctype: Option<&str>,
) -> krbtab::Result<EntrySelector> {
    let mut selector = EntrySelector::principal(parse_principal(config, principal)?);
    if let Some(kvno) = kvno {
        selector = selector.kvno(kvno);
    }
    if let Some(enctype) = enctype {
        selector = selector.keytype(parse_enctype(enctype)?);
    }
    Ok(selector)
}

/// Current time as a keytab timestamp
fn now() -> krbtab::Result<u32> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| KeytabError::InvalidInput(format!("system clock is before the epoch: {}", e)))?;
    timestamp_from_secs(elapsed.as_secs())
}

fn timestamp_from_secs(secs: u64) -> krbtab::Result<u32> {
    u32::try_from(secs)
        .map_err(|_| KeytabError::InvalidInput(format!("time {} does not fit a keytab timestamp", secs)))
}
