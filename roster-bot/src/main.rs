use dotenv::dotenv;
use std::sync::Arc;

mod channels;
mod commands;
mod config;
mod extractor;
mod http;
mod ingest;
mod mirror;
mod store;

use config::Config;
use ingest::Ingestor;
use mirror::Mirror;
use mirror::github::GitHubContents;
use store::Store;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };
    log::debug!("Loaded {:?}", config);

    let store = Store::new(config.csv_path.clone());
    log::info!("Initializing player table at {}", store.path().display());
    if let Err(e) = store.ensure_initialized() {
        log::error!("{}", e);
        std::process::exit(1);
    }

    let mut contents = GitHubContents::new(
        config.github_token.clone(),
        config.repo_name.clone(),
        config.mirror_branch.clone(),
        config.mirror_timeout,
    );
    if let Some(api_url) = &config.github_api_url {
        contents = contents.with_api_base(api_url);
    }
    let mirror = Mirror::new(Arc::new(contents), config.mirror_path.clone(), config.mirror_timeout);
    log::info!(
        "Mirroring to {}:{} (branch {})",
        config.repo_name,
        mirror.path(),
        config.mirror_branch.as_deref().unwrap_or("default")
    );

    let ingestor = Arc::new(Ingestor::new(
        config.channel_name.clone(),
        config.pairing,
        store,
        mirror,
    ));

    log::info!("Listening for registrations in #{}", config.channel_name);
    if let Err(e) =
        channels::discord::start_discord_listener(&config.token, config.command_prefix.clone(), ingestor).await
    {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
