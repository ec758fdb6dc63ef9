use anyhow::Context;
use tracing::info;
use workforce_api::{config, migrator};

/// Applies migrations against the configured database.
///
/// `migration down [steps]` rolls back instead.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(&cfg.log_level, cfg.log_json);

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("down") => {
            let steps = match args.next() {
                Some(raw) => raw.parse().context("steps must be a positive integer")?,
                None => 1,
            };
            migrator::rollback_migration(&cfg.database_url, steps).await?;
        }
        Some("up") | None => {
            migrator::run_migration(&cfg.database_url).await?;
        }
        Some(other) => anyhow::bail!("unknown command '{}', expected 'up' or 'down'", other),
    }

    info!("Migration command finished");
    Ok(())
}
