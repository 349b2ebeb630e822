mod api;
mod auth;
mod cli;
mod coalescer;
mod config;
mod game;
mod logger;
mod session;

use anyhow::Result;
use api::HttpProgressApi;
use clap::Parser;
use cli::{Cli, Commands};
use logger::Logger;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics go through `log`; RUST_LOG=debug shows every save.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            config::Config::default().save()?;
            Logger::success(format!("Created {}", config::CONFIG_FILE));
        }
        Commands::Sign {
            user_id,
            username,
            bot_token,
        } => {
            println!("{}", auth::sign(&bot_token, user_id, username.as_deref())?);
        }
        Commands::Show => {
            if let Some((api, _)) = connect(cli.api_url, cli.init_data)? {
                game::show(&api).await?;
            }
        }
        Commands::Play => {
            if let Some((api, config)) = connect(cli.api_url, cli.init_data)? {
                game::play(api, &config.save).await?;
            }
        }
        Commands::Tap { count, delay_ms } => {
            if let Some((api, config)) = connect(cli.api_url, cli.init_data)? {
                game::tap(api, &config.save, count, Duration::from_millis(delay_ms)).await?;
            }
        }
    }

    Ok(())
}

/// Loads the config and builds the API client.
///
/// Returns `None` (after telling the user why) when there is no usable init data;
/// without it every request would be rejected anyway.
fn connect(
    api_url: Option<String>,
    init_data: Option<String>,
) -> Result<Option<(HttpProgressApi, config::Config)>> {
    let config = config::Config::load()?;
    let api_url = api_url.unwrap_or_else(|| config.api_url.clone());

    let (init_data, user) = match auth::require_init_data(init_data) {
        Ok(found) => found,
        Err(e) => {
            Logger::error(format!("{:#}", e));
            return Ok(None);
        }
    };
    log::debug!("Playing as user {} against {}", user.id, api_url);

    let api = HttpProgressApi::new(&api_url, init_data, config.save.timeout())?;
    Ok(Some((api, config)))
}
