use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use matchsheet::compact::compact_below_anchor;
use matchsheet::config::AppConfig;
use matchsheet::pipeline::PipelineOptions;
use matchsheet::runs::{self, RunContext, RunKind, RunOutcome};
use matchsheet::scheduler::{self, Schedule};
use matchsheet::sheets::{GoogleSheetsClient, MemorySheet, SheetStore};
use matchsheet::webdriver::WebDriverBrowser;

#[derive(Debug, Parser)]
#[command(name = "matchsheet", version, about = "Favorite-odds match sheet updater")]
struct Cli {
    /// Config file (JSON). Defaults to $MATCHSHEET_CONFIG, then config.json.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write to an in-memory sheet and print it instead of touching Google Sheets.
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scrape today's matches and merge them into today's block.
    Morning,
    /// Scrape tomorrow's matches and append them under tomorrow's date.
    Evening,
    /// Remove blank rows below today's date.
    Compact,
    /// Run morning and evening at the configured times, forever.
    Daemon,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cli = Cli::parse();
    let cfg = AppConfig::load(cli.config.as_deref())?;
    matchsheet::logging::init(Some(&cfg.log_file))?;

    match cli.command {
        Command::Morning => execute(&cfg, RunKind::Morning, cli.dry_run),
        Command::Evening => execute(&cfg, RunKind::Evening, cli.dry_run),
        Command::Compact => compact(&cfg),
        Command::Daemon => {
            let schedule = Schedule::from_config(&cfg)?;
            let dry_run = cli.dry_run;
            scheduler::run_forever(schedule, move |kind| {
                if let Err(err) = execute(&cfg, kind, dry_run) {
                    error!(run = %kind, error = %format!("{err:#}"), "run failed to start");
                }
            })
        }
    }
}

fn execute(cfg: &AppConfig, kind: RunKind, dry_run: bool) -> Result<()> {
    let pipeline = PipelineOptions {
        credentials: cfg.credentials(),
        ..PipelineOptions::default()
    };
    let today = Local::now().date_naive();

    if dry_run {
        let browser = connect(cfg)?;
        let ctx = RunContext::new(kind, "dry-run", &cfg.sheet_name, MemorySheet::new(), today, pipeline);
        let outcome = runs::run(&browser, &ctx);
        report(kind, &outcome);
        for row in ctx.store.snapshot() {
            println!("{}", row.join("\t"));
        }
        return Ok(());
    }

    let store = google_sheet(cfg)?;
    let browser = connect(cfg)?;
    let ctx = RunContext::new(kind, &cfg.sheet_id, &cfg.sheet_name, store, today, pipeline);
    let outcome = runs::run(&browser, &ctx);
    report(kind, &outcome);
    Ok(())
}

fn connect(cfg: &AppConfig) -> Result<WebDriverBrowser> {
    WebDriverBrowser::connect(&cfg.webdriver()).context("failed to start browser session")
}

fn compact(cfg: &AppConfig) -> Result<()> {
    let store = google_sheet(cfg)?;
    let today = Local::now().date_naive();
    let summary = compact_below_anchor(&store, &cfg.sheet_name, today)?;
    info!(kept = summary.kept, removed = summary.removed, "compact finished");
    Ok(())
}

fn google_sheet(cfg: &AppConfig) -> Result<impl SheetStore> {
    if cfg.sheet_id.trim().is_empty() {
        bail!("sheet_id is not configured");
    }
    if cfg.sheets_token.trim().is_empty() {
        bail!("sheets_token is not configured (set GOOGLE_SHEETS_TOKEN)");
    }
    GoogleSheetsClient::new(cfg.sheet_id.trim(), cfg.sheets_token.trim())
}

fn report(kind: RunKind, outcome: &RunOutcome) {
    info!(
        run = %kind,
        matches = outcome.matches.len(),
        reconciled = ?outcome.reconciled,
        compacted = ?outcome.compacted,
        appended = outcome.appended,
        "run finished"
    );
}
