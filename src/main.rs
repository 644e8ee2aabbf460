use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use hisab::{
    DetectorConfig, ExpenseRecord, ImportOptions, MatcherConfig, Partner, ProjectStore, RestStore,
    ScanReport, SenderMap, StoreConfig, compute_balances, detect_expenses, load_bundle,
    match_receipts, parse_transcript, partition_seen, preview_import, run_import, settle,
};

#[derive(Parser)]
#[command(name = "hisab")]
#[command(author, version, about = "WhatsApp expense ingestion and partner settlement", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an export, detect expenses, and preview receipt matches offline
    Scan {
        /// Export directory or bare transcript .txt
        #[arg(short, long)]
        input: PathBuf,

        /// Sender-to-partner mapping JSON
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// Write the machine-readable report here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show transcript statistics without detecting or importing
    Analyze {
        /// Export directory or bare transcript .txt
        #[arg(short, long)]
        input: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Import an export into the project store
    Import {
        /// Export directory or bare transcript .txt
        #[arg(short, long)]
        input: PathBuf,

        /// Project id in the store
        #[arg(short, long)]
        project: String,

        /// Sender-to-partner mapping JSON, overlaid on stored mappings
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// Label recorded on the import run
        #[arg(long, default_value = "WhatsApp Export")]
        label: String,

        /// Preview against the store without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Compute partner balances and the transfer plan
    Settle {
        /// Project id in the store
        #[arg(short, long)]
        project: Option<String>,

        /// Local JSON snapshot with partners and expenses, instead of the store
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            input,
            mapping,
            output,
            verbose,
        } => {
            setup_logging(verbose);
            scan(input, mapping, output)
        }
        Commands::Analyze { input, verbose } => {
            setup_logging(verbose);
            analyze(input)
        }
        Commands::Import {
            input,
            project,
            mapping,
            label,
            dry_run,
            verbose,
        } => {
            setup_logging(verbose);
            import(input, project, mapping, label, dry_run).await
        }
        Commands::Settle {
            project,
            snapshot,
            verbose,
        } => {
            setup_logging(verbose);
            settle_command(project, snapshot).await
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_mapping(path: Option<&Path>) -> Result<SenderMap> {
    let Some(path) = path else {
        return Ok(SenderMap::new());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read mapping file: {:?}", path))?;
    serde_json::from_str(&content).context("Failed to parse mapping file")
}

fn scan(input: PathBuf, mapping: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let bundle = load_bundle(&input).context("Failed to load export")?;
    let senders = load_mapping(mapping.as_deref())?;

    info!("Loaded export with {} media files", bundle.media.len());
    let outcome = parse_transcript(&bundle.chat_text);
    let candidates = detect_expenses(&outcome.messages, &DetectorConfig::default());
    let matches = match_receipts(
        &candidates,
        &outcome.media_events,
        &bundle.file_names(),
        &senders,
        &MatcherConfig::default(),
    );
    // Offline scan has no seen-hash store to consult
    let partition = partition_seen(&candidates, &HashSet::new());

    let report = ScanReport::build(&outcome, &candidates, &matches, &partition, &senders, &[]);
    print!("{}", report.render_text());

    if let Some(path) = output {
        report.write_json(&path)?;
        info!("Report written to {:?}", path);
    }

    Ok(())
}

fn analyze(input: PathBuf) -> Result<()> {
    let bundle = load_bundle(&input).context("Failed to load export")?;
    let outcome = parse_transcript(&bundle.chat_text);
    let candidates = detect_expenses(&outcome.messages, &DetectorConfig::default());

    println!("Transcript Analysis");
    println!("===================");
    println!("Messages: {}", outcome.messages.len());
    println!("Media events: {}", outcome.media_events.len());
    println!("Bundle files: {}", bundle.media.len());

    if let (Some(first), Some(last)) = (outcome.messages.first(), outcome.messages.last()) {
        println!(
            "Date range: {} to {}",
            first.timestamp.date(),
            last.timestamp.date()
        );
    }
    println!();

    println!("Senders");
    println!("-------");
    let mut senders: Vec<&str> = outcome
        .messages
        .iter()
        .map(|m| m.sender.as_str())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    senders.sort();
    for sender in senders {
        let message_count = outcome
            .messages
            .iter()
            .filter(|m| m.sender == sender)
            .count();
        let media_count = outcome
            .media_events
            .iter()
            .filter(|e| e.sender == sender)
            .count();
        let candidate_count = candidates
            .iter()
            .filter(|c| c.message.sender == sender)
            .count();
        println!(
            "{}: {} messages, {} media, {} candidates",
            sender, message_count, media_count, candidate_count
        );
    }
    println!();

    println!("Candidates");
    println!("----------");
    println!("Total: {}", candidates.len());
    println!(
        "Need review: {}",
        candidates.iter().filter(|c| c.needs_review).count()
    );
    println!(
        "Total lines: {}",
        candidates.iter().filter(|c| c.is_total_line).count()
    );
    println!(
        "Excluded by default: {}",
        candidates.iter().filter(|c| c.excluded).count()
    );

    Ok(())
}

async fn import(
    input: PathBuf,
    project: String,
    mapping: Option<PathBuf>,
    label: String,
    dry_run: bool,
) -> Result<()> {
    let bundle = load_bundle(&input).context("Failed to load export")?;
    let local_mapping = load_mapping(mapping.as_deref())?;
    let store = RestStore::new(StoreConfig::from_env()?);

    let options = ImportOptions {
        filename: label,
        ..ImportOptions::default()
    };

    if dry_run {
        let report = preview_import(&store, &project, &bundle, &local_mapping, &options).await?;
        print!("{}", report.render_text());
        println!("Dry run: nothing was written.");
        return Ok(());
    }

    let report = run_import(&store, &store, &project, &bundle, &local_mapping, &options).await?;

    println!("Import Complete");
    println!("===============");
    println!("Expenses imported: {}", report.expenses_imported);
    println!("Receipts linked: {}", report.receipts_matched);
    println!("Sent to inbox: {}", report.inbox_files);
    println!("Duplicates skipped: {}", report.duplicates_skipped);
    println!("Excluded (review to include): {}", report.excluded_skipped);
    if report.failures > 0 {
        println!("Failures: {} (see log)", report.failures);
    }

    Ok(())
}

/// Local stand-in for the store when settling from a file
#[derive(Debug, Deserialize)]
struct SettleSnapshot {
    partners: Vec<Partner>,
    expenses: Vec<ExpenseRecord>,
}

async fn settle_command(project: Option<String>, snapshot: Option<PathBuf>) -> Result<()> {
    let (partners, expenses) = match (project, snapshot) {
        (Some(project), _) => {
            let store = RestStore::new(StoreConfig::from_env()?);
            let partners = store.partners(&project).await?;
            let expenses = store.expenses(&project).await?;
            (partners, expenses)
        }
        (None, Some(path)) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read snapshot: {:?}", path))?;
            let snapshot: SettleSnapshot =
                serde_json::from_str(&content).context("Failed to parse snapshot")?;
            (snapshot.partners, snapshot.expenses)
        }
        (None, None) => anyhow::bail!("settle needs either --project or --snapshot"),
    };

    let balances = compute_balances(&expenses, &partners);
    let plan = settle(&balances);

    println!("Partner Balances");
    println!("================");
    for balance in &balances {
        println!(
            "{}: paid EGP {:.2}, equal share EGP {:.2}, balance {:+.2}",
            balance.name, balance.total_contribution, balance.equal_share, balance.balance
        );
    }
    println!();

    if plan.is_empty() {
        println!("All partners are settled. No payments needed.");
        return Ok(());
    }

    println!("Settlement Plan");
    println!("===============");
    for transfer in &plan {
        println!(
            "{} pays {} EGP {:.2}",
            transfer.from, transfer.to, transfer.amount
        );
    }
    println!();
    println!("Greedy netting: few transfers, minimal for two partners.");

    Ok(())
}
