use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use libsondebufr::{
    config::{DecoderConfig, TableCache},
    parser::{covers, first_header, parse_with},
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sondebufr-dump")]
#[command(about = "Decode radiosonde BUFR files and print their contents", long_about = None)]
struct Cli {
    /// BUFR files, plain or gzip-compressed
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Only print sections 0 to 3
    #[arg(long)]
    header_only: bool,

    /// Print each message's decoded records as one JSON line
    #[arg(long, conflicts_with = "header_only")]
    json: bool,

    /// Directory holding master/ and local/ CSV tables
    #[arg(short, long)]
    tables: Option<PathBuf>,

    /// TOML decoder configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip files observed before this time (RFC 3339)
    #[arg(long)]
    from: Option<DateTime<Utc>>,

    /// Skip files observed at or after this time (RFC 3339)
    #[arg(long)]
    to: Option<DateTime<Utc>>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DecoderConfig::load_from_file(path)?,
        None => DecoderConfig::default(),
    };
    if cli.tables.is_some() {
        config.tables_path = cli.tables.clone();
    }

    let windowed = cli.from.is_some() || cli.to.is_some();
    let start = cli.from.unwrap_or(DateTime::<Utc>::MIN_UTC);
    let end = cli.to.unwrap_or(DateTime::<Utc>::MAX_UTC);
    let mut cache = TableCache::new(&config);

    for path in &cli.files {
        if windowed && !covers(path, start, end) {
            tracing::info!("{}: outside the requested window", path.display());
            continue;
        }

        let header = match first_header(path) {
            Ok(header) => header,
            Err(e) => {
                tracing::warn!("{}: {}", path.display(), e);
                continue;
            }
        };

        if !cli.json {
            println!("==> {}", path.display());
        }
        if cli.header_only {
            println!("{}", header);
            continue;
        }

        let file = parse_with(path, &mut cache)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        for (i, message) in file.messages().iter().enumerate() {
            if cli.json {
                println!("{}", serde_json::to_string(message.data())?);
                continue;
            }
            println!("--- message {} ---", i);
            println!("{}", message);
            println!();
            print!("{}", message.records(cache.get(&message.table_info())));
        }
    }

    Ok(())
}
