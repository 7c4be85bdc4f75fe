use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{errors::Error, Result};

/// Discord rejects attachment uploads at 25 MiB.
pub const DISCORD_UPLOAD_CEILING: u64 = 25 * 1024 * 1024;

/// A single history fetch returns at most this many messages.
pub const DISCORD_FETCH_CAP: u8 = 100;

/// Typed configuration, loaded from the environment (with optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    pub discord_bot_token: String,

    /// When set, slash commands are registered guild-scoped (instant
    /// propagation); otherwise globally.
    pub guild_id: Option<u64>,

    /// Where export files are written before upload.
    pub temp_dir: PathBuf,

    pub default_export_limit: u8,
    pub max_upload_bytes: u64,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let discord_bot_token = env_str("DISCORD_BOT_TOKEN").unwrap_or_default();
        if discord_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "DISCORD_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let guild_id = env_u64("DISCORD_GUILD_ID");

        let temp_dir = PathBuf::from(env_str("TEMP_DIR").unwrap_or("/tmp/dcx".to_string()));
        fs::create_dir_all(&temp_dir)?;

        let default_export_limit = env_u64("DEFAULT_EXPORT_LIMIT")
            .unwrap_or(u64::from(DISCORD_FETCH_CAP))
            .clamp(1, u64::from(DISCORD_FETCH_CAP)) as u8;
        let max_upload_bytes = env_u64("MAX_UPLOAD_BYTES").unwrap_or(DISCORD_UPLOAD_CEILING);

        Ok(Self {
            discord_bot_token,
            guild_id,
            temp_dir,
            default_export_limit,
            max_upload_bytes,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Keys are unique per test so parallel test threads cannot race on them.

    #[test]
    fn dotenv_never_overrides_existing_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "# comment\nDCX_TEST_FRESH=from file\nDCX_TEST_TAKEN=from file\nnot-a-pair\n",
        )
        .unwrap();

        env::set_var("DCX_TEST_TAKEN", "from env");
        load_dotenv_if_present(&path);

        assert_eq!(env::var("DCX_TEST_FRESH").unwrap(), "from file");
        assert_eq!(env::var("DCX_TEST_TAKEN").unwrap(), "from env");

        env::remove_var("DCX_TEST_FRESH");
        env::remove_var("DCX_TEST_TAKEN");
    }

    #[test]
    fn dotenv_strips_surrounding_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "DCX_TEST_DQ=\"spaced value\"\nDCX_TEST_SQ='single'\nDCX_TEST_BARE=plain\n",
        )
        .unwrap();

        load_dotenv_if_present(&path);

        assert_eq!(env::var("DCX_TEST_DQ").unwrap(), "spaced value");
        assert_eq!(env::var("DCX_TEST_SQ").unwrap(), "single");
        assert_eq!(env::var("DCX_TEST_BARE").unwrap(), "plain");

        env::remove_var("DCX_TEST_DQ");
        env::remove_var("DCX_TEST_SQ");
        env::remove_var("DCX_TEST_BARE");
    }

    #[test]
    fn dotenv_missing_file_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        load_dotenv_if_present(&dir.path().join("absent.env"));
        assert!(env::var("DCX_TEST_ABSENT").is_err());
    }
}
