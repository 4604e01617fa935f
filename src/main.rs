mod cli;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use url::Url;

use dochubfs::Config;

use cli::op::{Op, OpContext};
use cli::ops;

#[derive(Parser, Debug)]
#[command(
    name = "dochubfs",
    version,
    about = "Mount a DocHub document catalog as a read-only filesystem"
)]
struct Cli {
    /// Path to the config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog base URL (overrides the config file)
    #[arg(long, global = true, env = "DOCHUB_BASE_URL")]
    base_url: Option<Url>,

    /// API token (overrides the config file)
    #[arg(long, global = true, env = "DOCHUB_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mount the catalog and block until unmounted
    Mount(ops::Mount),
    /// List a catalog directory
    Ls(ops::Ls),
    /// Print a document
    Cat(ops::Cat),
    /// Print version information
    Version(ops::Version),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dochubfs=info")),
        )
        .init();

    let cli = Cli::parse();

    if let Command::Version(version) = &cli.command {
        println!("{}", version.output());
        return Ok(());
    }

    let config = Config::resolve(cli.config, cli.base_url, cli.token)?;
    let ctx = OpContext { config };

    match cli.command {
        Command::Mount(op) => run(op, &ctx).await,
        Command::Ls(op) => run(op, &ctx).await,
        Command::Cat(op) => run(op, &ctx).await,
        Command::Version(_) => unreachable!("handled above"),
    }
}

async fn run<O: Op>(op: O, ctx: &OpContext) -> anyhow::Result<()> {
    let output = op.execute(ctx).await?;
    println!("{output}");
    Ok(())
}
