use std::{env, fs, path::Path};

use crate::{errors::Error, Result};

/// Typed process configuration, loaded from the environment (plus an
/// optional `.env` file that never overrides real env vars).
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,

    /// Per-chat defaults applied when a chat is seen for the first time.
    pub default_whitelist: Vec<String>,
    pub auto_delete_enabled: bool,
    pub auto_delete_seconds: u32,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let default_whitelist = parse_csv(env_str("DEFAULT_WHITELIST")).unwrap_or_else(|| {
            vec!["@gif".to_string(), "@vid".to_string(), "@music".to_string()]
        });
        let auto_delete_enabled = env_bool("AUTO_DELETE_ENABLED").unwrap_or(true);
        let auto_delete_seconds = env_u32("AUTO_DELETE_SECONDS").unwrap_or(30);

        Ok(Self {
            telegram_bot_token,
            default_whitelist,
            auto_delete_enabled,
            auto_delete_seconds,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn parse_csv(v: Option<String>) -> Option<Vec<String>> {
    let v = v?;
    let out = v
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect::<Vec<_>>();
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
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

    #[test]
    fn parse_csv_trims_and_drops_empties() {
        let got = parse_csv(Some(" @gif, @vid ,, @music ".to_string())).unwrap();
        assert_eq!(got, vec!["@gif", "@vid", "@music"]);
        assert!(parse_csv(Some("  ,  ".to_string())).is_none());
        assert!(parse_csv(None).is_none());
    }

    #[test]
    fn env_bool_accepts_common_truthy_values() {
        env::set_var("SWEEP_TEST_BOOL", "Yes");
        assert_eq!(env_bool("SWEEP_TEST_BOOL"), Some(true));
        env::set_var("SWEEP_TEST_BOOL", "0");
        assert_eq!(env_bool("SWEEP_TEST_BOOL"), Some(false));
        env::remove_var("SWEEP_TEST_BOOL");
        assert_eq!(env_bool("SWEEP_TEST_BOOL"), None);
    }

    #[test]
    fn dotenv_does_not_override_existing_env() {
        let path = std::env::temp_dir().join(format!("sweep-dotenv-{}.env", std::process::id()));
        fs::write(&path, "SWEEP_TEST_KEEP=from_file\nSWEEP_TEST_NEW='quoted'\n").unwrap();

        env::set_var("SWEEP_TEST_KEEP", "from_env");
        load_dotenv_if_present(&path);

        assert_eq!(env::var("SWEEP_TEST_KEEP").unwrap(), "from_env");
        assert_eq!(env::var("SWEEP_TEST_NEW").unwrap(), "quoted");

        env::remove_var("SWEEP_TEST_KEEP");
        env::remove_var("SWEEP_TEST_NEW");
        let _ = fs::remove_file(&path);
    }
}
