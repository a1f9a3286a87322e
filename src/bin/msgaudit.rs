//! msgaudit: fetch chat batches and media from a compliance archive.

use clap::{Parser, Subcommand};
use msgaudit_rs::consts::DEFAULT_BATCH_LIMIT;
use msgaudit_rs::{
    ArchiveClient, ArchiveConfig, ArchiveError, ChecksumAlgorithm, DecodePolicy, Transport,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Compliance archive client
#[derive(Parser, Debug)]
#[command(name = "msgaudit")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, env = "MSGAUDIT_CONFIG")]
    config: PathBuf,

    /// Proxy for archive requests, overrides the config file
    #[arg(long)]
    proxy: Option<String>,

    /// Per-request timeout in seconds, overrides the config file
    #[arg(long)]
    timeout: Option<i32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch one chat batch and print one JSON record per line
    Chat {
        /// Fetch records with a sequence id greater than this
        #[arg(long, default_value_t = 0)]
        cursor: u64,

        /// Maximum number of records
        #[arg(long, default_value_t = DEFAULT_BATCH_LIMIT)]
        limit: u32,

        /// Print records without decrypting them
        #[arg(long)]
        raw: bool,

        /// Drop records whose payload does not decode instead of failing
        #[arg(long)]
        skip_undecodable: bool,
    },
    /// Download one media object
    Media {
        /// The `sdkfileid` of the attachment
        #[arg(long)]
        file_id: String,

        /// Directory the file is created in
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Report a SHA-256 digest instead of MD5
        #[arg(long)]
        sha256: bool,
    },
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn transport(config: &ArchiveConfig, args: &Args) -> Transport {
    let mut transport = config.transport();
    if let Some(proxy) = &args.proxy {
        transport = transport.with_proxy(proxy.clone());
    }
    if let Some(timeout) = args.timeout {
        transport = transport.with_timeout(timeout);
    }
    transport
}

fn run(args: &Args) -> Result<ExitCode, ArchiveError> {
    let config = ArchiveConfig::from_path(&args.config)?;
    let client = ArchiveClient::open(&config)?;
    let transport = transport(&config, args);

    match &args.command {
        Command::Chat {
            cursor,
            limit,
            raw,
            skip_undecodable,
        } => {
            let policy = if *skip_undecodable {
                DecodePolicy::Skip
            } else {
                DecodePolicy::Abort
            };
            let options = config
                .fetch_options()
                .with_transport(transport)
                .with_decrypt(!raw)
                .with_decode_policy(policy);
            let batch = client.fetch_chat_batch(*cursor, *limit, &options)?;
            if !batch.is_ok() {
                error!(status = %batch.status, "chat fetch failed");
                return Ok(ExitCode::FAILURE);
            }

            let mut out = io::stdout().lock();
            for record in batch.records.to_json_values()? {
                serde_json::to_writer(&mut out, &record)?;
                writeln!(out)?;
            }
            info!(
                records = batch.records.len(),
                skipped = batch.skipped.len(),
                undecodable = batch.undecodable.len(),
                next_cursor = batch.next_cursor(*cursor),
                "batch done"
            );
            eprintln!(
                "records={} skipped={} undecodable={} next_cursor={}",
                batch.records.len(),
                batch.skipped.len(),
                batch.undecodable.len(),
                batch.next_cursor(*cursor)
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Media {
            file_id,
            dir,
            sha256,
        } => {
            let algorithm = if *sha256 {
                ChecksumAlgorithm::Sha256
            } else {
                config.checksum
            };
            let options = config
                .media_options()
                .with_transport(transport)
                .with_checksum(algorithm);
            let download = client.download_media(file_id, dir, &options)?;
            match &download.checksum {
                Some(checksum) if download.is_ok() => {
                    println!("{}\t{}", download.path.display(), checksum);
                    Ok(ExitCode::SUCCESS)
                }
                _ => {
                    error!(
                        status = %download.status,
                        partial = %download.path.display(),
                        bytes = download.bytes_written,
                        "media download failed"
                    );
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging();

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            eprintln!("msgaudit: {e}");
            ExitCode::FAILURE
        }
    }
}
