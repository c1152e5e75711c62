use anyhow::{Context, Result};
use db_pool::create_pool;
use login_ingest_service::{dump, Config, LoginPipeline, LoginStore, SqsQueueReader};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    info!("Starting login-ingest-service");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(queue = ?config.queue, failure_policy = ?config.failure_policy, "Configuration loaded");
    config.database.log_config();

    let pool = create_pool(config.database.clone())
        .await
        .context("Failed to create database pool")?;
    let store = LoginStore::new(pool);

    // Close the pool on every exit path, including an aborted run
    let result = run(&config, &store).await;
    store.close().await;
    result
}

async fn run(config: &Config, store: &LoginStore) -> Result<()> {
    store
        .widen_app_version_column()
        .await
        .context("Schema fixup failed")?;

    let reader = SqsQueueReader::connect(config.queue.clone())
        .await
        .context("Failed to connect to SQS")?;

    let pipeline = LoginPipeline::new(reader, store.clone(), config.failure_policy);
    let report = pipeline.run().await.context("Login ingest run aborted")?;
    info!(
        received = report.received,
        inserted = report.inserted,
        rejected = report.rejected,
        failed = report.failed,
        "Run complete"
    );

    let rows = store
        .fetch_all()
        .await
        .context("Failed to read back user_logins")?;
    let stdout = std::io::stdout();
    dump::write_table(&mut stdout.lock(), &rows).context("Failed to print user_logins")?;

    Ok(())
}

/// Logs go to stderr so the table dump on stdout stays clean.
/// `LOG_FORMAT=json` switches to structured JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,login_ingest_service=debug".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
