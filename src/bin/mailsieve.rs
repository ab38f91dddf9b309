#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for the mailsieve engine and its one-shot reports

use clap::{Parser, Subcommand};
use mailsieve::detect::{DetectReport, DetectSettings};
use mailsieve::{
    AutoConfirm, Confirm, Connector, DomainCatalog, Engine, HostPatterns, ImapConfig,
    ImapConnector, MailStore, RelocationPolicy, ScanStrategy, SeqRange, SieveConfig,
    TerminalPrompt, reference,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mailsieve")]
#[command(about = "Move spam out of an IMAP folder using senders learned from a spam folder")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Folder spam senders are learned from
    #[arg(long, global = true)]
    reference: Option<String>,

    /// Folder that is filtered
    #[arg(long, global = true)]
    target: Option<String>,

    /// Folder matched messages are moved to
    #[arg(long, global = true)]
    destination: Option<String>,

    /// Comma-separated host globs that never match
    #[arg(long, global = true)]
    exempt: Option<String>,

    /// Comma-separated host globs that always match
    #[arg(long, global = true)]
    block: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Watch the folders and move matches until interrupted
    Run {
        /// Ask before every move
        #[arg(long)]
        confirm: bool,

        /// How new target messages are found (exclusion or cursor)
        #[arg(long)]
        strategy: Option<ScanStrategy>,

        /// What to do with messages that failed to move (retry or skip)
        #[arg(long)]
        on_relocation_failure: Option<RelocationPolicy>,
    },

    /// Build the catalog once and print it
    Catalog,

    /// Report sender hosts of a folder
    Detect {
        /// Folder to report on (defaults to the target folder)
        #[arg(long)]
        folder: Option<String>,
    },

    /// List available IMAP folders
    Folders,
}

impl Args {
    /// Environment configuration with command-line overrides applied.
    fn sieve_config(&self) -> anyhow::Result<SieveConfig> {
        let mut sieve = SieveConfig::from_env()?;
        if let Some(folder) = &self.reference {
            sieve.folders.reference.clone_from(folder);
        }
        if let Some(folder) = &self.target {
            sieve.folders.target.clone_from(folder);
        }
        if let Some(folder) = &self.destination {
            sieve.folders.destination.clone_from(folder);
        }
        if let Some(list) = &self.exempt {
            sieve.exempt = HostPatterns::parse_list(list)?;
        }
        if let Some(list) = &self.block {
            sieve.block = HostPatterns::parse_list(list)?;
        }
        if let Command::Run {
            confirm,
            strategy,
            on_relocation_failure,
        } = &self.command
        {
            sieve.confirm |= *confirm;
            if let Some(strategy) = strategy {
                sieve.strategy = *strategy;
            }
            if let Some(policy) = on_relocation_failure {
                sieve.on_relocation_failure = *policy;
            }
        }
        Ok(sieve)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let imap = ImapConfig::from_env()?;
    let sieve = args.sieve_config()?;

    match &args.command {
        Command::Run { .. } => cmd_run(imap, sieve).await?,
        Command::Catalog => cmd_catalog(imap, &sieve, &args).await?,
        Command::Detect { folder } => {
            let folder = folder.as_deref().unwrap_or(&sieve.folders.target);
            cmd_detect(imap, &sieve, folder, &args).await?;
        }
        Command::Folders => cmd_folders(imap, &args).await?,
    }

    Ok(())
}

async fn cmd_run(imap: ImapConfig, sieve: SieveConfig) -> anyhow::Result<()> {
    if sieve.confirm {
        run_engine(imap, sieve, TerminalPrompt::stdio()).await
    } else {
        run_engine(imap, sieve, AutoConfirm).await
    }
}

async fn run_engine<P: Confirm>(
    imap: ImapConfig,
    sieve: SieveConfig,
    confirm: P,
) -> anyhow::Result<()> {
    let engine = Engine::start(imap, sieve, confirm).await?;
    engine
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Cannot listen for Ctrl-C: {e}");
            }
        })
        .await?;
    info!("Stopped");
    Ok(())
}

async fn cmd_catalog(imap: ImapConfig, sieve: &SieveConfig, args: &Args) -> anyhow::Result<()> {
    let connector = ImapConnector::new(imap);
    let mut store = connector.connect().await?;
    let catalog = reference::rebuild(&mut store, &sieve.folders.reference, &sieve.exempt).await;
    store.logout().await;
    let catalog = catalog?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
    } else {
        print_catalog(&catalog);
    }

    Ok(())
}

async fn cmd_detect(
    imap: ImapConfig,
    sieve: &SieveConfig,
    folder: &str,
    args: &Args,
) -> anyhow::Result<()> {
    let connector = ImapConnector::new(imap);
    let mut store = connector.connect().await?;
    let count = store.select(folder).await?;
    let envelopes = match SeqRange::all(count) {
        Some(range) => store.fetch_range(range).await,
        None => Ok(Vec::new()),
    };
    store.logout().await;
    let envelopes = envelopes?;

    let mut settings = DetectSettings::new(folder);
    settings.block = sieve.block.clone();
    settings.exempt = sieve.exempt.clone();
    settings.suggest_block = folder == sieve.folders.reference;
    let report = DetectReport::build(&envelopes, &settings);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }

    Ok(())
}

async fn cmd_folders(imap: ImapConfig, args: &Args) -> anyhow::Result<()> {
    let connector = ImapConnector::new(imap);
    let mut store = connector.connect().await?;
    let folders = store.list_folders().await;
    store.logout().await;
    let folders = folders?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&folders)?);
    } else {
        for folder in &folders {
            println!("{folder}");
        }
    }

    Ok(())
}

fn print_catalog(catalog: &DomainCatalog) {
    if catalog.is_empty() {
        println!("No domains found.");
        return;
    }

    for domain in catalog.sorted() {
        println!("{domain}");
        for (account, n) in domain.sorted_accounts() {
            println!("    (count={n:04}) {account}");
        }
    }

    println!(
        "\n{} domain(s), {} message(s)",
        catalog.len(),
        catalog.total_messages()
    );
}
