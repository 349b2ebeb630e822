use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tapgame")]
#[command(about = "Terminal client for the tap game", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the game server URL
    #[arg(long, global = true, env = "TAPGAME_API_URL")]
    pub api_url: Option<String>,

    /// Signed Telegram init data to authenticate with
    #[arg(long, global = true, env = "TAPGAME_INIT_DATA", hide_env_values = true)]
    pub init_data: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default tapgame.toml
    Init,
    /// Print the saved score and level
    Show,
    /// Play interactively (Enter taps, p puts the game in the background, q quits)
    Play,
    /// Tap a fixed number of times, then save and exit
    Tap {
        /// Number of taps
        count: u32,
        /// Pause between taps in milliseconds
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
    },
    /// Build signed init data for playing against a local server
    Sign {
        /// Telegram user id to sign for
        #[arg(long)]
        user_id: i64,
        /// Optional Telegram username
        #[arg(long)]
        username: Option<String>,
        /// Bot token the server verifies with
        #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
        bot_token: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn tap_takes_count_and_delay() {
        let cli = Cli::try_parse_from(["tapgame", "tap", "25", "--delay-ms", "40"]).unwrap();
        match cli.command {
            Commands::Tap { count, delay_ms } => assert_eq!((count, delay_ms), (25, 40)),
            _ => panic!("expected tap"),
        }
    }
}
