//! `loclink` -- translation sync worker.
//!
//! Thin CLI over the sync engine. Intended to be invoked periodically by
//! an external scheduler (cron or similar); overlapping runs are not
//! coordinated here.
//!
//! # Environment variables
//!
//! | Variable         | Required | Default     | Description                          |
//! |------------------|----------|-------------|--------------------------------------|
//! | `DATABASE_URL`   | yes      | --          | Postgres connection string           |
//! | `CONTENT_DIR`    | no       | `./content` | Root of the JSON content store       |
//! | `BASE_URL`       | no       | empty       | Prefix for relative edit links       |
//! | `LC_*`           | see docs | --          | LanguageCloud settings (`EngineConfig`) |
//! | `SMTP_*`         | no       | --          | Review notification emails           |
//! | `REVIEW_RECIPIENTS` | no    | empty       | Comma-separated notification addresses |

use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loclink_db::repositories::{PgFileRepository, PgProjectRepository, PgSettingsRepository};
use loclink_engine::{EngineConfig, SyncEngine};
use loclink_events::email::compose_refresh_summary;
use loclink_events::{EmailConfig, EmailDelivery, EventBus, RecipientLookup, ReviewNotifier};
use loclink_languagecloud::client::{ApiClient, LanguageCloud};
use loclink_worker::JsonContentProvider;

#[derive(Parser)]
#[command(name = "loclink")]
#[command(about = "Keep CMS content in sync with LanguageCloud translation projects")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass: import finished translations, export new work
    Sync,

    /// Queue re-translation of sources whose content went stale
    RefreshStale {
        /// Compute what would sync without contacting the remote service
        /// or writing any state
        #[arg(long)]
        dry_run: bool,
    },

    /// List the tenant's project templates
    Templates,
}

/// Resolves notification recipients from `REVIEW_RECIPIENTS`.
struct EnvRecipientLookup {
    recipients: Vec<String>,
}

impl EnvRecipientLookup {
    fn from_env() -> Self {
        let recipients = std::env::var("REVIEW_RECIPIENTS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self { recipients }
    }
}

#[async_trait]
impl RecipientLookup for EnvRecipientLookup {
    async fn review_recipients(&self) -> Vec<String> {
        self.recipients.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "loclink=info",
        1 => "loclink=debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::from_env();
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Refusing to start with incomplete configuration");
        std::process::exit(1);
    }

    match cli.command {
        Commands::Sync => run_sync(config).await,
        Commands::RefreshStale { dry_run } => run_refresh(config, dry_run).await,
        Commands::Templates => run_templates(config).await,
    }
}

/// Build the engine against Postgres, the JSON content store, and the
/// real API client.
async fn build_engine(config: &EngineConfig, bus: Arc<EventBus>) -> anyhow::Result<SyncEngine> {
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
    let pool = loclink_db::create_pool(&database_url).await?;
    loclink_db::run_migrations(&pool).await?;

    let content_dir = std::env::var("CONTENT_DIR").unwrap_or_else(|_| "./content".to_string());
    let provider = Arc::new(JsonContentProvider::new(content_dir));

    let client = Arc::new(ApiClient::new(config.client_config())?);

    Ok(SyncEngine::new(
        config.clone(),
        client,
        Arc::new(PgProjectRepository::new(pool.clone())),
        Arc::new(PgFileRepository::new(pool.clone())),
        Arc::new(PgSettingsRepository::new(pool)),
        provider,
        bus,
    ))
}

async fn run_sync(config: EngineConfig) -> anyhow::Result<()> {
    let bus = Arc::new(EventBus::default());

    // Review notifications are optional; without SMTP settings the
    // events are simply dropped.
    let notifier = EmailConfig::from_env().map(|email_config| {
        let delivery = EmailDelivery::new(email_config);
        let recipients = Arc::new(EnvRecipientLookup::from_env());
        let base_url = std::env::var("BASE_URL").unwrap_or_default();
        let receiver = bus.subscribe();
        tokio::spawn(ReviewNotifier::new(delivery, recipients, base_url).run(receiver))
    });

    let engine = build_engine(&config, bus.clone()).await?;
    if let Err(e) = engine.run().await {
        // Logged errors do not change the exit code; the next scheduled
        // run picks up from the persisted state.
        tracing::error!(error = %e, "Sync aborted");
    }

    // Close the bus so the notifier drains its queue and exits.
    drop(engine);
    drop(bus);
    if let Some(handle) = notifier {
        let _ = handle.await;
    }
    Ok(())
}

async fn run_refresh(config: EngineConfig, dry_run: bool) -> anyhow::Result<()> {
    let bus = Arc::new(EventBus::default());
    let engine = build_engine(&config, bus).await?;

    let report = match engine.refresh_stale(dry_run).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "Refresh aborted");
            return Ok(());
        }
    };

    if !dry_run && report.considered() > 0 {
        if let Some(email_config) = EmailConfig::from_env() {
            let delivery = EmailDelivery::new(email_config);
            let (subject, body) = compose_refresh_summary(&report.refreshed, &report.skipped);
            for recipient in EnvRecipientLookup::from_env().review_recipients().await {
                if let Err(e) = delivery.send(&recipient, &subject, &body).await {
                    tracing::error!(error = %e, to = %recipient, "Failed to send refresh summary");
                }
            }
        }
    }
    Ok(())
}

async fn run_templates(config: EngineConfig) -> anyhow::Result<()> {
    let client = ApiClient::new(config.client_config())?;
    client.authenticate().await?;

    for template in client.get_project_templates().await? {
        let location = template
            .location
            .map(|l| l.name)
            .unwrap_or_else(|| "-".to_string());
        println!("{}\t{}\t{}", template.id, template.name, location);
    }
    Ok(())
}
