//! ResumeVault CLI - run the server and inspect the quota ledger.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use resumevault_common::{Email, SizeMb};
use resumevault_server::ServerConfig;
use resumevault_store::{DocumentStore, IdentityStore, LedgerDrift, SqliteStore};
use resumevault_vault::{QuotaPolicy, DEFAULT_MAX_FILE_SIZE_MB, DEFAULT_QUOTA_LIMIT_MB};

#[derive(Parser)]
#[command(name = "resumevault")]
#[command(about = "ResumeVault - Quota-enforced resume storage")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (configured from the environment).
    Serve,

    /// Recompute quota ledgers from stored resumes.
    Reconcile {
        /// Only this account (default: every account).
        #[arg(short, long)]
        email: Option<String>,

        /// Database file (default: $DATABASE_URL or resumevault.db).
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show an account's storage usage.
    Usage {
        /// Account email.
        #[arg(short, long)]
        email: String,

        /// Database file (default: $DATABASE_URL or resumevault.db).
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Quota in megabytes (default: $QUOTA_LIMIT_MB or 20).
        #[arg(short, long)]
        limit: Option<SizeMb>,
    },

    /// Check whether an account exists.
    CheckUser {
        /// Account email.
        #[arg(short, long)]
        email: String,

        /// Database file (default: $DATABASE_URL or resumevault.db).
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // --verbose wins over RUST_LOG
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Commands::Serve => cmd_serve().await,
        Commands::Reconcile { email, database } => cmd_reconcile(email.as_deref(), database).await,
        Commands::Usage {
            email,
            database,
            limit,
        } => cmd_usage(&email, database, limit).await,
        Commands::CheckUser { email, database } => cmd_check_user(&email, database).await,
    }
}

fn open_store(database: Option<PathBuf>) -> Result<SqliteStore> {
    let path = database
        .or_else(|| std::env::var_os("DATABASE_URL").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("resumevault.db"));

    SqliteStore::open(&path)
        .with_context(|| format!("Failed to open database at {}", path.display()))
}

/// The quota the server runs with: `--limit`, then `$QUOTA_LIMIT_MB`,
/// then the built-in default.
fn quota_limit(limit: Option<SizeMb>) -> Result<SizeMb> {
    resolve_limit(limit, std::env::var("QUOTA_LIMIT_MB").ok())
}

fn resolve_limit(limit: Option<SizeMb>, env: Option<String>) -> Result<SizeMb> {
    if let Some(limit) = limit {
        return Ok(limit);
    }
    match env.filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .parse::<SizeMb>()
            .with_context(|| format!("Invalid QUOTA_LIMIT_MB: {}", raw)),
        None => Ok(SizeMb::from_whole_mb(DEFAULT_QUOTA_LIMIT_MB)),
    }
}

fn parse_email(raw: &str) -> Result<Email> {
    Email::parse(raw).with_context(|| format!("Invalid email: {}", raw))
}

/// Run the HTTP server.
async fn cmd_serve() -> Result<()> {
    let config = ServerConfig::from_env().context("Invalid server configuration")?;
    info!(
        port = config.port,
        backend = config.storage_backend.as_str(),
        google = config.google.is_some(),
        "Starting ResumeVault"
    );

    resumevault_server::serve(config)
        .await
        .context("Server failed")?;
    Ok(())
}

/// Recompute ledgers and report what changed.
async fn cmd_reconcile(email: Option<&str>, database: Option<PathBuf>) -> Result<()> {
    let store = open_store(database)?;

    let drifts = match email {
        Some(raw) => {
            let email = parse_email(raw)?;
            let user = store
                .find_user_by_email(&email)
                .await?
                .with_context(|| format!("No account for {}", email))?;
            vec![store
                .reconcile_user(&user.id)
                .await
                .context("Failed to reconcile ledger")?]
        }
        None => store
            .reconcile_all()
            .await
            .context("Failed to reconcile ledgers")?,
    };

    print_drifts(&drifts);
    Ok(())
}

fn print_drifts(drifts: &[LedgerDrift]) {
    let drifted: Vec<_> = drifts.iter().filter(|d| d.is_drifted()).collect();

    println!("Checked {} account(s).", drifts.len());
    if drifted.is_empty() {
        println!("All ledgers match their resumes.");
        return;
    }

    println!("Corrected {} ledger(s):", drifted.len());
    for drift in drifted {
        println!(
            "  {}  {} MB -> {} MB",
            drift.email, drift.recorded, drift.actual
        );
    }
}

/// Print an account's usage against the quota.
async fn cmd_usage(raw_email: &str, database: Option<PathBuf>, limit: Option<SizeMb>) -> Result<()> {
    let limit = quota_limit(limit)?;
    let store = open_store(database)?;
    let email = parse_email(raw_email)?;

    let user = store
        .find_user_by_email(&email)
        .await?
        .with_context(|| format!("No account for {}", email))?;
    let resumes = store.list_resumes(&user.id).await?;

    let policy = QuotaPolicy::new(limit, SizeMb::from_whole_mb(DEFAULT_MAX_FILE_SIZE_MB).to_bytes());
    let report = policy.usage(user.total_size);

    println!("Account: {} ({})", user.name, user.email);
    println!("  Provider: {}", user.provider.as_str());
    println!("  Resumes: {}", resumes.len());
    println!(
        "  Used: {} MB of {} MB ({:.0}%)",
        report.used_mb, report.limit_mb, report.percent
    );
    println!("  Remaining: {} MB", report.remaining_mb);
    if report.near_limit {
        println!("  Warning: near the storage limit");
    }

    Ok(())
}

/// Report whether an account exists.
async fn cmd_check_user(raw_email: &str, database: Option<PathBuf>) -> Result<()> {
    let store = open_store(database)?;
    let email = parse_email(raw_email)?;

    match store.find_user_by_email(&email).await? {
        Some(user) => println!(
            "{} exists ({} account, created {})",
            user.email,
            user.provider.as_str(),
            user.created_at.format("%Y-%m-%d")
        ),
        None => println!("{} has no account", email),
    }

    Ok(())
}
