//! keepsync - sync Google Keep notes from the command line
//!
//! Every command opens the artifact database, does one thing and exits,
//! except `watch`, which keeps syncing on the configured interval.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use keep::{
    ArtifactStore, CoordinatorError, Credential, KeepConfig, Selection, SqliteStore,
    SyncCoordinator, SyncReport, TokenCache, UreqTransport, get_note, list_notes, list_summaries,
    refresh_due, time_until_refresh,
};
use log::{error, info, warn};

#[derive(Parser)]
#[command(name = "keepsync")]
#[command(about = "Sync Google Keep notes to a local database")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the account credential
    Login {
        /// Account email
        #[arg(long)]
        email: String,
        /// Master token; read from stdin when omitted
        #[arg(long, value_name = "TOKEN")]
        master_token: Option<String>,
    },
    /// Run one sync
    Sync,
    /// Sync now and then every refresh interval
    Watch {
        /// Seconds between syncs (defaults to refresh_interval_secs)
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
    /// List synced notes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one note (the last shown one, or the first, when no id is given)
    Show {
        /// Note ID
        id: Option<String>,
    },
    /// Show account and sync status
    Status,
    /// Remove the credential, token and synced notes
    Logout,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Err(e) = config::init() {
        warn!("Failed to initialize config directory: {}", e);
    }

    let settings = KeepConfig::load()?;
    let db_path = settings.database_path()?;
    let store = SqliteStore::new(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    match cli.command {
        Commands::Login {
            email,
            master_token,
        } => login(&store, &email, master_token),
        Commands::Sync => sync_once(&store, &settings),
        Commands::Watch { interval } => watch(
            &store,
            &settings,
            interval.unwrap_or(settings.refresh_interval_secs),
        ),
        Commands::List { json } => list(&store, json),
        Commands::Show { id } => show(&store, id.as_deref()),
        Commands::Status => status(&store, &settings),
        Commands::Logout => logout(&store),
    }
}

fn login(store: &SqliteStore, email: &str, master_token: Option<String>) -> Result<()> {
    let email = email.trim();
    if email.is_empty() {
        bail!("Email must not be empty");
    }

    let secret = match master_token {
        Some(token) => token,
        None => prompt("Master token: ")?,
    };
    let secret = secret.trim();
    if secret.is_empty() {
        bail!("Master token must not be empty");
    }

    let artifacts = ArtifactStore::new(store);
    artifacts.set_email(email)?;
    artifacts.set_credential_secret(secret)?;
    let device_id = artifacts.ensure_device_id()?;
    artifacts.token_cache().invalidate()?;

    info!("Stored credential for {} (device {})", email, device_id);
    println!("Logged in as {}", email);
    Ok(())
}

fn sync_once(store: &SqliteStore, settings: &KeepConfig) -> Result<()> {
    let credential = Credential::load(&ArtifactStore::new(store))?;
    let transport = Arc::new(UreqTransport::new(settings.timeout()));
    let report = SyncCoordinator::from_config(store, transport, settings).run(&credential)?;

    println!("{}", report_line(&report));
    Ok(())
}

fn report_line(report: &SyncReport) -> String {
    format!(
        "Synced {} notes ({} records, {} pages) in {}ms",
        report.note_count, report.nodes_fetched, report.pages, report.duration_ms
    )
}

/// One line per `watch` iteration, printed whatever the log level
fn outcome_line(result: &Result<SyncReport, CoordinatorError>) -> String {
    match result {
        Ok(report) => report_line(report),
        Err(e) => format!("Sync failed: {}", e),
    }
}

fn watch(store: &SqliteStore, settings: &KeepConfig, interval_secs: u64) -> Result<()> {
    let artifacts = ArtifactStore::new(store);
    let credential = Credential::load(&artifacts)?;
    let transport = Arc::new(UreqTransport::new(settings.timeout()));
    let coordinator = SyncCoordinator::from_config(store, transport, settings);
    let interval = Duration::from_secs(interval_secs.max(1));

    info!("Syncing every {}s", interval.as_secs());
    loop {
        let last_sync_at = artifacts.sync_state()?.map(|state| state.last_sync_at);
        if refresh_due(last_sync_at, interval_secs) {
            // A failed run is retried on the next interval.
            let result = coordinator.run(&credential);
            match outcome_line(&result) {
                line if result.is_ok() => println!("{}", line),
                line => eprintln!("{}", line),
            }
        }

        let last_sync_at = artifacts.sync_state()?.map(|state| state.last_sync_at);
        let wait = match time_until_refresh(last_sync_at, interval_secs) {
            wait if wait.is_zero() => interval,
            wait => wait,
        };
        info!("Next sync in {}s", wait.as_secs());
        std::thread::sleep(wait);
    }
}

fn list(store: &SqliteStore, json: bool) -> Result<()> {
    let summaries = list_summaries(&ArtifactStore::new(store))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }
    if summaries.is_empty() {
        println!("No notes synced yet. Run `keepsync sync`.");
        return Ok(());
    }
    for summary in &summaries {
        if summary.preview.is_empty() {
            println!("{}  {}", summary.id, summary.title);
        } else {
            println!("{}  {}  {}", summary.id, summary.title, summary.preview);
        }
    }
    Ok(())
}

fn show(store: &SqliteStore, id: Option<&str>) -> Result<()> {
    let artifacts = ArtifactStore::new(store);
    let note = match id {
        Some(id) => get_note(&artifacts, id)?.with_context(|| format!("No note with id {}", id))?,
        None => {
            let notes = list_notes(&artifacts)?;
            Selection::load()
                .pick(&notes)
                .cloned()
                .context("No notes synced yet. Run `keepsync sync`.")?
        }
    };

    if let Err(e) = Selection::new(&note.id).save() {
        warn!("Failed to remember selection: {:#}", e);
    }

    println!("{}", note.display_title());
    println!();
    println!("{}", note.body());
    Ok(())
}

fn status(store: &SqliteStore, settings: &KeepConfig) -> Result<()> {
    let artifacts = ArtifactStore::new(store);

    let email = artifacts.email()?;
    match &email {
        Some(email) => println!("Account:    {}", email),
        None => println!("Account:    (not logged in)"),
    }
    println!(
        "Device id:  {}",
        artifacts.device_id()?.unwrap_or_else(|| "(none)".to_string())
    );

    match TokenCache::new(store).load(Utc::now())? {
        Some(token) => match token.expiry {
            Some(expiry) => println!("Token:      cached, expires {}", expiry),
            None => println!("Token:      cached, no expiry"),
        },
        None => println!("Token:      none"),
    }

    match artifacts.sync_state()? {
        Some(state) => {
            println!("Last sync:  {} ({} notes)", state.last_sync_at, state.note_count);
            if let Some(email) = &email
                && !state.is_for(email)
            {
                println!("            synced notes belong to {}", state.account_id);
            }
            let due = refresh_due(Some(state.last_sync_at), settings.refresh_interval_secs);
            println!("Refresh:    {}", if due { "due" } else { "not due" });
        }
        None => println!("Last sync:  never"),
    }
    println!("Database:   {}", settings.database_path()?.display());
    Ok(())
}

fn logout(store: &SqliteStore) -> Result<()> {
    ArtifactStore::new(store).clear_account()?;
    println!("Logged out");
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", label)?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
