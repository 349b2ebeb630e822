//! Telegram Mini App init data.
//!
//! The host app hands every Mini App an urlencoded bundle of fields plus a `hash`.
//! The hash is an HMAC-SHA256 over the "check string" (every other field formatted as
//! `key=value`, sorted, joined with `\n`), keyed with SHA-256 of the bot token.
//! Only someone holding the bot token can produce it, so a matching hash proves the
//! bundle came from Telegram unchanged.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use url::form_urlencoded;

type HmacSha256 = Hmac<Sha256>;

/// Field holding the hex encoded signature.
pub const HASH_FIELD: &str = "hash";
/// Field holding the JSON encoded user descriptor.
pub const USER_FIELD: &str = "user";

#[derive(Debug, Error)]
pub enum InitDataError {
    #[error("bot token is empty")]
    EmptyBotToken,

    #[error("could not derive signing key")]
    InvalidKey,

    #[error("init data has no `hash` field")]
    MissingHash,

    #[error("init data has more than one `hash` field")]
    DuplicateHash,

    #[error("`hash` is not valid hex: {0}")]
    MalformedHash(#[from] hex::FromHexError),

    #[error("init data signature does not match")]
    SignatureMismatch,

    #[error("init data has no `user` field")]
    MissingUser,

    #[error("`user` is not a valid user descriptor: {0}")]
    InvalidUser(#[from] serde_json::Error),
}

/// The user descriptor Telegram embeds in the `user` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebAppUser {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

/// Parsed, not yet verified, init data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitData {
    fields: Vec<(String, String)>,
    hash: String,
}

impl InitData {
    /// Splits a raw payload into its signed fields and the signature.
    ///
    /// Exactly one `hash` field is allowed. Every other pair, duplicates included,
    /// takes part in the check string.
    pub fn parse(raw: &str) -> Result<Self, InitDataError> {
        let raw = raw.strip_prefix('?').unwrap_or(raw);

        let mut hash = None;
        let mut fields = Vec::new();

        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            if key == HASH_FIELD {
                if hash.replace(value.into_owned()).is_some() {
                    return Err(InitDataError::DuplicateHash);
                }
            } else {
                fields.push((key.into_owned(), value.into_owned()));
            }
        }

        let hash = hash.ok_or(InitDataError::MissingHash)?;
        Ok(Self { fields, hash })
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The canonical MAC input for these fields.
    pub fn check_string(&self) -> String {
        check_string(&self.fields)
    }

    /// Decodes the `user` field.
    pub fn user(&self) -> Result<WebAppUser, InitDataError> {
        let raw = self.get(USER_FIELD).ok_or(InitDataError::MissingUser)?;
        Ok(serde_json::from_str(raw)?)
    }
}

/// Formats every pair as `key=value`, sorts the lines by byte value and joins them
/// with a single newline.
fn check_string(fields: &[(String, String)]) -> String {
    let mut lines: Vec<String> = fields.iter().map(|(k, v)| format!("{k}={v}")).collect();
    lines.sort();
    lines.join("\n")
}

/// Verifies init data against one bot token.
///
/// Built once at startup and shared; the keyed MAC state is cloned per check.
#[derive(Clone)]
pub struct InitDataVerifier {
    mac: HmacSha256,
}

impl InitDataVerifier {
    pub fn new(bot_token: &str) -> Result<Self, InitDataError> {
        if bot_token.trim().is_empty() {
            return Err(InitDataError::EmptyBotToken);
        }

        let secret = Sha256::digest(bot_token.as_bytes());
        let mac = HmacSha256::new_from_slice(&secret).map_err(|_| InitDataError::InvalidKey)?;
        Ok(Self { mac })
    }

    /// Checks the signature of `raw`. Anything unparseable counts as forged.
    pub fn verify(&self, raw: &str) -> bool {
        InitData::parse(raw)
            .and_then(|data| self.check(&data))
            .is_ok()
    }

    /// Verifies `raw` and returns the Telegram user id it was issued for.
    pub fn extract_user_id(&self, raw: &str) -> Result<i64, InitDataError> {
        Ok(self.authenticate(raw)?.id)
    }

    /// Verifies `raw` and decodes the user it was issued for.
    pub fn authenticate(&self, raw: &str) -> Result<WebAppUser, InitDataError> {
        let data = InitData::parse(raw)?;
        self.check(&data)?;
        data.user()
    }

    /// Compares the signature of already parsed init data in constant time.
    ///
    /// The signature must be the lowercase hex digest byte for byte, so uppercase
    /// digits are a mismatch even when they decode to the right bytes.
    pub fn check(&self, data: &InitData) -> Result<(), InitDataError> {
        if data.hash().bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(InitDataError::SignatureMismatch);
        }
        let expected = hex::decode(data.hash())?;

        let mut mac = self.mac.clone();
        mac.update(data.check_string().as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| InitDataError::SignatureMismatch)
    }

    /// Builds a signed, urlencoded payload out of `pairs`.
    ///
    /// Any `hash` among the pairs is dropped and replaced with the real signature.
    pub fn sign<K, V>(&self, pairs: impl IntoIterator<Item = (K, V)>) -> String
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let fields: Vec<(String, String)> = pairs
            .into_iter()
            .filter(|(k, _)| k.as_ref() != HASH_FIELD)
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();

        let mut mac = self.mac.clone();
        mac.update(check_string(&fields).as_bytes());
        let hash = hex::encode(mac.finalize().into_bytes());

        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields.iter())
            .append_pair(HASH_FIELD, &hash)
            .finish()
    }
}

impl fmt::Debug for InitDataVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitDataVerifier").finish_non_exhaustive()
    }
}
