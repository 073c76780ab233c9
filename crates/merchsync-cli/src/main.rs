use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "merchsync-cli")]
#[command(about = "merchsync command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Rebuild a feed artifact and send the upload notification.
    Regenerate { stream: String },
    /// Rotate a feed's URL secret; the old pull URL stops working.
    RotateSecret { stream: String },
    /// List registered feeds with their pull URLs.
    ListFeeds,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = merchsync_core::load_app_config()?;
    let pool_config = merchsync_db::PoolConfig::from_app_config(&config);
    let pool = merchsync_db::connect_pool(&config.database_url, pool_config).await?;
    merchsync_db::run_migrations(&pool).await?;

    let registry = merchsync_feed::build_registry(pool, &config);

    match cli.command {
        Commands::Regenerate { stream } => {
            let feed = registry.get(&stream)?;
            let report = feed.regenerate().await?;
            println!(
                "regenerated {stream}: {} rows in {}ms -> {}",
                report.rows,
                report.elapsed.as_millis(),
                report.path.display()
            );

            let upload_client = merchsync_feed::UploadClient::new(
                config.graph_api_base.clone(),
                config.meta_access_token.clone(),
                config.http_request_timeout_secs,
            )?;
            feed.send_upload_notification(&upload_client, &config.public_base_url)
                .await;
        }
        Commands::RotateSecret { stream } => {
            let feed = registry.get(&stream)?;
            feed.rotate_secret().await?;
            let url = feed.data_url(&config.public_base_url).await?;
            println!("rotated secret for {stream}; new pull URL: {url}");
        }
        Commands::ListFeeds => {
            for feed in registry.iter() {
                let url = feed.data_url(&config.public_base_url).await?;
                println!(
                    "{} ({}) every {}s -> {}",
                    feed.stream_name(),
                    feed.feed_type(),
                    feed.gen_interval().as_secs(),
                    url
                );
            }
        }
    }

    Ok(())
}
