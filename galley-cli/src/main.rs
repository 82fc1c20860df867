use crate::commands::{accounts_impl, query_impl, resolve_impl, send_impl, up_impl};
use anyhow::Result;
use clap::Parser;
use galley::ClientBuilder;
use std::path::PathBuf;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Network to target, `embedded` for a throwaway in-process ledger
    #[clap(long, global = true)]
    network: Option<String>,
    /// Directory holding galley.json and the contract sources
    #[clap(long, global = true)]
    root: Option<PathBuf>,
    /// 0 silent, 1 errors, 2 warnings, 3 info, 4 debug
    #[clap(long, global = true)]
    log: Option<u8>,
    #[clap(subcommand)]
    action: ActionParams,
}

#[derive(clap::Subcommand, Debug)]
enum ActionParams {
    /// List the accounts of the network
    Accounts,
    /// Print a source file with its imports resolved
    Resolve { file: PathBuf },
    /// Bootstrap and report what was provisioned
    Up,
    /// Sign and send a transaction
    Send {
        file: PathBuf,
        /// Proposer, payer and authorizer
        #[clap(long)]
        signer: String,
        /// Separate payer, who also authorizes and signs the envelope
        #[clap(long)]
        payer: Option<String>,
        /// Arguments as a JSON array of {"type", "value"} objects
        #[clap(long)]
        args: Option<String>,
    },
    /// Run a read-only script
    Query {
        file: PathBuf,
        /// Arguments as a JSON array of {"type", "value"} objects
        #[clap(long)]
        args: Option<String>,
    },
}

fn level_filter(log_level: u8) -> LevelFilter {
    match log_level {
        0 => LevelFilter::OFF,
        1 => LevelFilter::ERROR,
        2 => LevelFilter::WARN,
        3 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut builder = ClientBuilder::from_root(args.root.as_deref()).await?;
    if let Some(network) = &args.network {
        builder = builder.with_network(network);
    }
    if let Some(log) = args.log {
        builder = builder.with_log_level(log);
    }

    tracing_subscriber::registry()
        .with(level_filter(builder.log_level()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.action {
        ActionParams::Accounts => accounts_impl(builder).await?,
        ActionParams::Resolve { file } => resolve_impl(builder, &file).await?,
        ActionParams::Up => up_impl(builder).await?,
        ActionParams::Send {
            file,
            signer,
            payer,
            args,
        } => send_impl(builder, &file, &signer, payer.as_deref(), args.as_deref()).await?,
        ActionParams::Query { file, args } => query_impl(builder, &file, args.as_deref()).await?,
    }
    Ok(())
}
