use anyhow::{Context, Result, anyhow};
use std::time::{SystemTime, UNIX_EPOCH};
use tapgame_core::{InitData, InitDataVerifier, WebAppUser};

/// Picks up the init data the game was launched with and reads the user out of it.
///
/// The client can't check the signature (that takes the bot token), but a payload
/// without a user can never pass on the server, so we stop before making any request.
pub fn require_init_data(init_data: Option<String>) -> Result<(String, WebAppUser)> {
    let raw = init_data
        .filter(|raw| !raw.trim().is_empty())
        .ok_or_else(|| {
            anyhow!("No init data. Open the game through the Telegram bot, or pass --init-data / TAPGAME_INIT_DATA")
        })?;

    let user = InitData::parse(&raw)
        .and_then(|data| data.user())
        .context("Init data does not identify a Telegram user")?;

    Ok((raw, user))
}

/// Builds init data signed with `bot_token`, the way Telegram would hand it to the game.
///
/// Only meant for running the game against a local server.
pub fn sign(bot_token: &str, user_id: i64, username: Option<&str>) -> Result<String> {
    let verifier = InitDataVerifier::new(bot_token)?;

    let user = WebAppUser {
        id: user_id,
        first_name: None,
        last_name: None,
        username: username.map(str::to_string),
        language_code: None,
    };
    let auth_date = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

    Ok(verifier.sign([
        ("auth_date", auth_date.to_string()),
        ("user", serde_json::to_string(&user)?),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_init_data_passes_server_verification() {
        let raw = sign("123456:TEST-TOKEN", 42, Some("player")).unwrap();

        let verifier = InitDataVerifier::new("123456:TEST-TOKEN").unwrap();
        let user = verifier.authenticate(&raw).unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(user.username.as_deref(), Some("player"));

        let (_, user) = require_init_data(Some(raw)).unwrap();
        assert_eq!(user.id, 42);
    }

    #[test]
    fn missing_init_data_is_refused() {
        assert!(require_init_data(None).is_err());
        assert!(require_init_data(Some("  ".to_string())).is_err());
    }

    #[test]
    fn init_data_without_user_is_refused() {
        assert!(require_init_data(Some("auth_date=1&hash=00".to_string())).is_err());
        assert!(require_init_data(Some("user=%7B%7D&hash=00".to_string())).is_err());
    }

    #[test]
    fn empty_bot_token_cannot_sign() {
        assert!(sign("", 1, None).is_err());
    }
}
