mod cloudflare;
mod seed;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "codstore-cli")]
#[command(about = "Storefront back-office command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Populate demo orders and visits (marked is_seed) for dashboard work.
    Seed(seed::SeedArgs),
    /// Import Cloudflare daily buckets into the analytics mirror.
    CloudflareImport(cloudflare::ImportArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = codstore_core::load_app_config()?;
    let pool = codstore_db::connect_pool(
        &config.database_url,
        codstore_db::PoolConfig::from_app_config(&config),
    )
    .await?;
    codstore_db::run_migrations(&pool).await?;

    match cli.command {
        Commands::Seed(args) => seed::run(&pool, &args).await?,
        Commands::CloudflareImport(args) => cloudflare::run(&pool, &config, &args).await?,
    }

    Ok(())
}
