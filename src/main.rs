use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use harvester::app::AppContext;
use harvester::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("harvester=info")))
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    let mut ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Profile { url, .. } => {
            ctx.check_muxer().await;
            commands::harvest_profile(&ctx, &url).await?;
        }
        Commands::Links { url, .. } => {
            commands::list_links(&ctx, &url).await?;
        }
        Commands::Post { urls, .. } => {
            ctx.check_muxer().await;
            commands::harvest_posts(&ctx, &urls).await?;
        }
    }

    Ok(())
}
