use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use feedsync_core::{
    credential_presence, load_feedsync_config, serve, Credentials, CycleOutcome, CycleReport,
    DocumentStore, FeedsyncConfig, GithubContentStore, IntervalScheduler, SyncEngine,
};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] feedsync_core::ConfigError),
    #[error("sync error: {0}")]
    Sync(#[from] feedsync_core::SyncError),
    #[error("server error: {0}")]
    Server(#[from] feedsync_core::ServerError),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("published manifest unavailable: {0}")]
    ManifestUnavailable(feedsync_core::CompareFetchError),
    #[error("one or more health checks failed")]
    HealthCheckFailed,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Feed manifest sync worker control interface", long_about = None)]
pub struct Cli {
    /// Path to feedsync.toml
    #[arg(long, default_value = "configs/feedsync.toml")]
    pub config: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduled sync loop and the HTTP trigger surface
    Serve,
    /// Run one reconciliation cycle and print the report
    Sync,
    /// Print the currently published manifest
    Manifest,
    /// Integrity checks against credentials and the document store
    #[command(subcommand)]
    Health(HealthCommands),
}

#[derive(Subcommand, Debug)]
pub enum HealthCommands {
    /// Check credential presence and document-store connectivity
    Check,
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = load_feedsync_config(&cli.config)?;

    match &cli.command {
        Commands::Serve => {
            let engine = Arc::new(build_engine(&config)?);
            let scheduler =
                IntervalScheduler::new(Duration::from_secs(config.sync.interval_seconds));
            let loop_engine = engine.clone();
            tokio::spawn(async move { scheduler.run(loop_engine).await });
            serve(engine, &config.server.bind).await?;
        }
        Commands::Sync => {
            let engine = build_engine(&config)?;
            let report = engine.run_cycle().await?;
            render(&report, cli.format)?;
        }
        Commands::Manifest => {
            let engine = build_engine(&config)?;
            let urls = engine
                .fetch_published()
                .await
                .map_err(AppError::ManifestUnavailable)?;
            render(&urls, cli.format)?;
        }
        Commands::Health(HealthCommands::Check) => {
            let report = health_check(&config).await?;
            render(&report, cli.format)?;
            if report
                .iter()
                .any(|entry| matches!(entry.status, CheckStatus::Error))
            {
                return Err(AppError::HealthCheckFailed);
            }
        }
    }

    Ok(())
}

fn build_engine(config: &FeedsyncConfig) -> Result<SyncEngine> {
    let credentials = Credentials::from_env()?;
    let client = reqwest::Client::builder()
        .user_agent(&config.sync.user_agent)
        .build()?;
    Ok(SyncEngine::from_config(client, config, credentials))
}

async fn health_check(config: &FeedsyncConfig) -> Result<Vec<HealthEntry>> {
    let mut entries = Vec::new();
    let presence = credential_presence();
    entries.push(presence_entry("DROPBOX_APP_KEY", presence.dropbox_app_key));
    entries.push(presence_entry(
        "DROPBOX_APP_SECRET",
        presence.dropbox_app_secret,
    ));
    entries.push(presence_entry(
        "DROPBOX_REFRESH_TOKEN",
        presence.dropbox_refresh_token,
    ));
    entries.push(presence_entry("GITHUB_TOKEN", presence.github_token));

    match Credentials::from_env() {
        Ok(credentials) => {
            let client = reqwest::Client::builder()
                .user_agent(&config.sync.user_agent)
                .build()?;
            let store = GithubContentStore::new(
                client,
                config.publish.clone(),
                credentials.publish_token,
                &config.sync.user_agent,
            );
            let diagnostics = store.diagnostics().await;
            entries.push(if diagnostics.repo_reachable {
                HealthEntry::ok("document store", "repository reachable")
            } else {
                HealthEntry::error("document store", "repository unreachable")
            });
            entries.push(if diagnostics.write_access {
                HealthEntry::ok("write access", "token can push")
            } else {
                HealthEntry::warn("write access", "token cannot push or permissions unknown")
            });
            entries.push(if diagnostics.document_exists {
                HealthEntry::ok(
                    "manifest document",
                    format!(
                        "present at revision {}",
                        diagnostics.revision.as_deref().unwrap_or("unknown")
                    ),
                )
            } else {
                HealthEntry::warn("manifest document", "absent, the first publish will create it")
            });
        }
        Err(err) => {
            entries.push(HealthEntry::warn(
                "document store",
                format!("connectivity checks skipped: {err}"),
            ));
        }
    }

    Ok(entries)
}

fn presence_entry(name: &str, present: bool) -> HealthEntry {
    if present {
        HealthEntry::ok(name, "set")
    } else {
        HealthEntry::error(name, "not set")
    }
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
            Ok(())
        }
    }
}

trait DisplayFallback {
    fn display(&self) -> String;
}

impl DisplayFallback for CycleReport {
    fn display(&self) -> String {
        match &self.outcome {
            CycleOutcome::Published { revision } => format!(
                "published revision {} ({} urls, {} ms)",
                revision,
                self.urls.len(),
                self.duration_ms
            ),
            CycleOutcome::Skipped => format!(
                "skipped, manifest unchanged ({} urls, {} ms)",
                self.urls.len(),
                self.duration_ms
            ),
        }
    }
}

impl DisplayFallback for Vec<String> {
    fn display(&self) -> String {
        if self.is_empty() {
            return "manifest is empty".to_string();
        }
        self.join("\n")
    }
}

impl DisplayFallback for Vec<HealthEntry> {
    fn display(&self) -> String {
        let mut lines = Vec::new();
        for entry in self {
            lines.push(format!(
                "[{status}] {name}: {detail}",
                status = entry.status,
                name = entry.name,
                detail = entry.detail
            ));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct HealthEntry {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub enum CheckStatus {
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "error")]
    Error,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CheckStatus::Ok => "OK",
            CheckStatus::Warn => "WARN",
            CheckStatus::Error => "ERROR",
        };
        write!(f, "{}", label)
    }
}

impl HealthEntry {
    fn ok(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Ok,
            detail: detail.into(),
        }
    }

    fn warn(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Warn,
            detail: detail.into(),
        }
    }

    fn error(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Error,
            detail: detail.into(),
        }
    }
}
